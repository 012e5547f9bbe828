// ============================================================================
// STROKE ACCUMULATION & BRUSH PAINTER
// ============================================================================
//
// Every pixel touched during a stroke gets one `AccumRec`. The record keeps
// the pre-stroke value and the highest alpha applied so far; a later stamp on
// the same pixel only lands if it is stronger. Results are always recomputed
// from the pre-stroke value, so overlapping stamps never build up past the
// strongest single stamp.

use std::collections::HashMap;

use tracing::debug;

use crate::brush::BrushMode;
use crate::color;
use crate::context::StrokeContext;
use crate::error::PaintError;
use crate::history::PixelChangeResult;
use crate::surface::PixelSurface;

/// Per-pixel record for the lifetime of one stroke.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccumRec {
    pub before: u32,
    pub after: u32,
    pub max_alpha: u8,
}

/// Per-stroke map from byte index to [`AccumRec`].
#[derive(Debug, Default)]
pub struct StrokeAccumulator {
    recs: HashMap<usize, AccumRec>,
}

impl StrokeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.recs.clear();
    }

    pub fn get(&self, idx: usize) -> Option<&AccumRec> {
        self.recs.get(&idx)
    }

    pub fn contains(&self, idx: usize) -> bool {
        self.recs.contains_key(&idx)
    }

    /// Record for `idx`, creating it with `before` on first touch.
    pub fn touch(&mut self, idx: usize, before: impl FnOnce() -> u32) -> &mut AccumRec {
        self.recs.entry(idx).or_insert_with(|| {
            let before = before();
            AccumRec {
                before,
                after: before,
                max_alpha: 0,
            }
        })
    }

    pub fn len(&self) -> usize {
        self.recs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recs.is_empty()
    }
}

/// Pre-stroke value at `idx`: from the snapshot when one of the right size is
/// given, otherwise from the live surface.
pub(crate) fn pre_stroke_value(surface: &PixelSurface, snapshot: Option<&[u8]>, idx: usize) -> u32 {
    match snapshot {
        Some(snap) if snap.len() == surface.pixels().len() => color::from_bgra_bytes(&snap[idx..idx + 4]),
        _ => surface.read_at(idx),
    }
}

pub(crate) fn check_context(surface: &PixelSurface, ctx: &StrokeContext<'_>) -> Result<(), PaintError> {
    if ctx.surface != surface.id() {
        return Err(PaintError::SurfaceMismatch {
            expected: surface.id(),
            actual: ctx.surface,
        });
    }
    Ok(())
}

/// Paints (or erases) stamps onto one surface for the duration of a stroke.
///
/// `begin` → any number of `stamp_at` → `end`, which yields the change record.
pub struct BrushPainter<'s> {
    surface: &'s mut PixelSurface,
    snapshot: Option<&'s [u8]>,
    accum: StrokeAccumulator,
    result: PixelChangeResult,
}

impl<'s> BrushPainter<'s> {
    pub fn begin(surface: &'s mut PixelSurface, snapshot: Option<&'s [u8]>) -> Self {
        debug!(surface = %surface.id(), "stroke begin");
        let result = PixelChangeResult::new(surface.id());
        Self {
            surface,
            snapshot,
            accum: StrokeAccumulator::new(),
            result,
        }
    }

    pub fn accumulator(&self) -> &StrokeAccumulator {
        &self.accum
    }

    pub fn surface(&self) -> &PixelSurface {
        self.surface
    }

    /// Apply one stamp of the context's footprint centered at `(cx, cy)`.
    pub fn stamp_at(&mut self, cx: i32, cy: i32, ctx: &StrokeContext<'_>) -> Result<(), PaintError> {
        check_context(self.surface, ctx)?;
        let hard_opaque = ctx.is_hard_opaque();
        let rgb = color::rgb(ctx.foreground);
        let snapshot = self.snapshot.or(ctx.snapshot);
        let mut wrote = false;

        for &(dx, dy) in &ctx.offsets {
            let eff = ctx.alpha_at(dx, dy);
            if eff == 0 {
                continue;
            }
            let (Some(x), Some(y)) = (cx.checked_add(dx), cy.checked_add(dy)) else {
                continue;
            };
            let Some(idx) = self.surface.checked_index(x, y) else {
                continue;
            };
            if !ctx.is_selected(x, y) {
                continue;
            }
            if hard_opaque && self.accum.contains(idx) {
                continue;
            }

            let surface = &*self.surface;
            let rec = self.accum.touch(idx, || pre_stroke_value(surface, snapshot, idx));
            if eff <= rec.max_alpha {
                continue;
            }
            rec.max_alpha = eff;
            rec.after = match ctx.settings.mode {
                BrushMode::Paint => color::blend_over(rec.before, rgb | ((eff as u32) << 24)),
                BrushMode::Erase => erase(rec.before, eff),
            };
            let (before, after) = (rec.before, rec.after);

            self.surface.write_at(idx, after);
            self.result.add(idx, before, after);
            wrote = true;
        }

        if wrote {
            self.surface.notify_changed();
        }
        Ok(())
    }

    /// Finish the stroke and hand back its change record.
    pub fn end(self) -> PixelChangeResult {
        debug!(
            surface = %self.surface.id(),
            touched = self.accum.len(),
            changes = self.result.len(),
            "stroke end"
        );
        self.result
    }
}

/// Reduce alpha by `strength` (0..255), keeping RGB.
fn erase(before: u32, strength: u8) -> u32 {
    let a = color::unit(color::alpha(before)) * (1.0 - color::unit(strength));
    color::with_alpha(before, color::to_byte(a))
}

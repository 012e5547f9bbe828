// ============================================================================
// GRADIENT-CYCLE PAINTER — step matching palette colors to their successor
// ============================================================================

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::color;
use crate::context::StrokeContext;
use crate::error::PaintError;
use crate::history::PixelChangeResult;
use crate::stroke::{StrokeAccumulator, check_context, pre_stroke_value};
use crate::surface::PixelSurface;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleSettings {
    /// Color sequence; only RGB is used for matching.
    pub colors: Vec<u32>,
    /// Map the last color back to the first.
    pub wrap: bool,
    /// Only recolor fully opaque pixels.
    pub opaque_only: bool,
    /// Match the pre-stroke snapshot instead of the live pixel.
    pub match_snapshot: bool,
}

/// RGB -> successor RGB lookup built once per stroke.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleTable {
    next: HashMap<u32, u32>,
}

impl CycleTable {
    pub fn new(colors: &[u32], wrap: bool) -> Self {
        let mut next = HashMap::with_capacity(colors.len());
        for pair in colors.windows(2) {
            next.entry(color::rgb(pair[0])).or_insert(color::rgb(pair[1]));
        }
        if wrap && colors.len() > 1 {
            let (first, last) = (colors[0], colors[colors.len() - 1]);
            next.entry(color::rgb(last)).or_insert(color::rgb(first));
        }
        Self { next }
    }

    pub fn next(&self, rgb: u32) -> Option<u32> {
        self.next.get(&color::rgb(rgb)).copied()
    }

    pub fn len(&self) -> usize {
        self.next.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next.is_empty()
    }
}

/// Stroke painter that recolors pixels whose current RGB is in the cycle
/// table; everything else under the brush is left alone.
pub struct GradientCyclePainter<'s> {
    surface: &'s mut PixelSurface,
    snapshot: Option<&'s [u8]>,
    table: CycleTable,
    opaque_only: bool,
    match_snapshot: bool,
    accum: StrokeAccumulator,
    result: PixelChangeResult,
}

impl<'s> GradientCyclePainter<'s> {
    pub fn begin(
        surface: &'s mut PixelSurface,
        settings: &CycleSettings,
        snapshot: Option<&'s [u8]>,
    ) -> Self {
        let table = CycleTable::new(&settings.colors, settings.wrap);
        debug!(surface = %surface.id(), entries = table.len(), "gradient cycle begin");
        let result = PixelChangeResult::with_description(surface.id(), "Gradient Cycle");
        Self {
            surface,
            snapshot,
            table,
            opaque_only: settings.opaque_only,
            match_snapshot: settings.match_snapshot,
            accum: StrokeAccumulator::new(),
            result,
        }
    }

    pub fn table(&self) -> &CycleTable {
        &self.table
    }

    pub fn stamp_at(&mut self, cx: i32, cy: i32, ctx: &StrokeContext<'_>) -> Result<(), PaintError> {
        check_context(self.surface, ctx)?;
        let hard_opaque = ctx.is_hard_opaque();
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
            let live = surface.read_at(idx);
            let rec = self.accum.touch(idx, || pre_stroke_value(surface, snapshot, idx));
            if eff <= rec.max_alpha {
                continue;
            }
            rec.max_alpha = eff;

            let source = if self.match_snapshot { rec.before } else { live };
            let Some(next_rgb) = self.table.next(source) else {
                continue;
            };
            let source_alpha = color::alpha(source);
            if self.opaque_only && source_alpha != 255 {
                continue;
            }
            // Mix toward the successor by the stamp alpha, keep the pixel's own alpha.
            let mixed = color::blend_over(
                color::with_alpha(source, 255),
                next_rgb | ((eff as u32) << 24),
            );
            rec.after = color::with_alpha(mixed, source_alpha);
            let after = rec.after;

            self.surface.write_at(idx, after);
            self.result.add(idx, live, after);
            wrote = true;
        }

        if wrote {
            self.surface.notify_changed();
        }
        Ok(())
    }

    pub fn end(self) -> PixelChangeResult {
        debug!(
            surface = %self.surface.id(),
            changes = self.result.len(),
            "gradient cycle end"
        );
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brush::{BrushSettings, BrushShape};

    const RED: u32 = 0xFFFF_0000;
    const GREEN: u32 = 0xFF00_FF00;
    const BLUE: u32 = 0xFF00_00FF;

    #[test]
    fn test_table_open_chain() {
        let t = CycleTable::new(&[RED, GREEN, BLUE], false);
        assert_eq!(t.next(RED), Some(0x00FF00));
        assert_eq!(t.next(GREEN), Some(0x0000FF));
        assert_eq!(t.next(BLUE), None);
    }

    #[test]
    fn test_table_wraps() {
        let t = CycleTable::new(&[RED, GREEN, BLUE], true);
        assert_eq!(t.next(BLUE), Some(0xFF0000));
        assert!(CycleTable::new(&[RED], true).is_empty());
    }

    fn paint(surface: &mut PixelSurface, settings: &CycleSettings) -> PixelChangeResult {
        let ctx = StrokeContext::new(
            surface,
            0,
            BrushSettings {
                size: 3,
                shape: BrushShape::Square,
                ..Default::default()
            },
        );
        let mut p = GradientCyclePainter::begin(surface, settings, None);
        p.stamp_at(1, 0, &ctx).unwrap();
        p.stamp_at(1, 0, &ctx).unwrap();
        p.end()
    }

    #[test]
    fn test_only_table_colors_are_recolored() {
        let mut s = PixelSurface::new(3, 1).unwrap();
        s.write_bgra(0, 0, RED);
        s.write_bgra(1, 0, 0xFF12_3456);
        s.write_bgra(2, 0, GREEN);
        let settings = CycleSettings {
            colors: vec![RED, GREEN, BLUE],
            ..Default::default()
        };
        let result = paint(&mut s, &settings);
        assert_eq!(s.read_bgra(0, 0), GREEN);
        assert_eq!(s.read_bgra(1, 0), 0xFF12_3456);
        assert_eq!(s.read_bgra(2, 0), BLUE);
        // Stamping twice in one stroke advances each pixel only once.
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_opaque_only_skips_translucent_pixels() {
        let mut s = PixelSurface::new(3, 1).unwrap();
        s.write_bgra(0, 0, 0x80FF_0000);
        s.write_bgra(1, 0, RED);
        let settings = CycleSettings {
            colors: vec![RED, GREEN],
            wrap: false,
            opaque_only: true,
            ..Default::default()
        };
        paint(&mut s, &settings);
        assert_eq!(s.read_bgra(0, 0), 0x80FF_0000);
        assert_eq!(s.read_bgra(1, 0), GREEN);

        let mut s = PixelSurface::new(1, 1).unwrap();
        s.write_bgra(0, 0, 0x80FF_0000);
        let settings = CycleSettings {
            opaque_only: false,
            ..settings
        };
        let ctx = StrokeContext::new(&s, 0, BrushSettings::default());
        let mut p = GradientCyclePainter::begin(&mut s, &settings, None);
        p.stamp_at(0, 0, &ctx).unwrap();
        p.end();
        assert_eq!(s.read_bgra(0, 0), 0x8000_FF00);
    }

    #[test]
    fn test_live_pixel_is_matched_not_snapshot() {
        let mut s = PixelSurface::new(2, 1).unwrap();
        s.write_bgra(0, 0, RED);
        s.write_bgra(1, 0, BLUE);
        let mut snapshot = s.snapshot();
        snapshot[0..4].copy_from_slice(&BLUE.to_le_bytes());
        snapshot[4..8].copy_from_slice(&RED.to_le_bytes());
        let settings = CycleSettings {
            colors: vec![RED, GREEN],
            ..Default::default()
        };

        let ctx = StrokeContext::new(&s, 0, BrushSettings::default());
        let mut p = GradientCyclePainter::begin(&mut s, &settings, Some(&snapshot));
        p.stamp_at(0, 0, &ctx).unwrap();
        p.stamp_at(1, 0, &ctx).unwrap();
        let result = p.end();
        assert_eq!(s.read_bgra(0, 0), GREEN);
        assert_eq!(s.read_bgra(1, 0), BLUE);
        assert_eq!(result.len(), 1);
        assert_eq!(result.changes()[0].before, RED);
    }

    #[test]
    fn test_match_snapshot_keys_on_pre_stroke_value() {
        let mut s = PixelSurface::new(1, 1).unwrap();
        s.write_bgra(0, 0, BLUE);
        let mut snapshot = s.snapshot();
        snapshot[0..4].copy_from_slice(&RED.to_le_bytes());
        let settings = CycleSettings {
            colors: vec![RED, GREEN],
            match_snapshot: true,
            ..Default::default()
        };

        let ctx = StrokeContext::new(&s, 0, BrushSettings::default());
        let mut p = GradientCyclePainter::begin(&mut s, &settings, Some(&snapshot));
        p.stamp_at(0, 0, &ctx).unwrap();
        let result = p.end();
        assert_eq!(s.read_bgra(0, 0), GREEN);
        assert_eq!(result.changes()[0].before, BLUE);
    }
}

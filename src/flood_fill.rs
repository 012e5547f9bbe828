// ============================================================================
// FLOOD FILL — contiguous (stack with queue overflow) and global modes
// ============================================================================
//
// Contiguous fill is a 4-neighbour DFS. The explicit stack is capped; once it
// holds `STACK_CEILING` entries further pushes spill into a FIFO queue, and
// the loop drains the stack before touching the queue. Memory stays bounded
// per structure and small fills keep DFS locality.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::color;
use crate::history::PixelChangeResult;
use crate::mask::{self, Selection};
use crate::surface::PixelSurface;

/// Stack size at which neighbour pushes overflow into the queue.
pub const STACK_CEILING: usize = 100_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMode {
    #[default]
    Contiguous,
    Global,
}

impl FillMode {
    pub fn description(&self) -> &'static str {
        match self {
            FillMode::Contiguous => "Flood Fill",
            FillMode::Global => "Global Fill",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillSettings {
    /// Max Chebyshev distance from the seed color, in byte units.
    pub tolerance: u8,
    pub mode: FillMode,
}

/// Reusable fill state. Keeping one around avoids reallocating the seen
/// bitmap and work lists for every fill on a large canvas.
#[derive(Debug)]
pub struct FloodFiller {
    seen: Vec<u64>,
    stack: Vec<usize>,
    queue: VecDeque<usize>,
    stack_ceiling: usize,
    overflowed: usize,
}

impl Default for FloodFiller {
    fn default() -> Self {
        Self::new()
    }
}

impl FloodFiller {
    pub fn new() -> Self {
        Self::with_stack_ceiling(STACK_CEILING)
    }

    pub fn with_stack_ceiling(stack_ceiling: usize) -> Self {
        Self {
            seen: Vec::new(),
            stack: Vec::with_capacity(4096),
            queue: VecDeque::new(),
            stack_ceiling: stack_ceiling.max(1),
            overflowed: 0,
        }
    }

    /// Pushes that went to the overflow queue during the last fill.
    pub fn overflow_count(&self) -> usize {
        self.overflowed
    }

    /// Fill from seed `(x, y)` with `color`.
    ///
    /// Returns `None` without touching the surface when the seed is out of
    /// bounds or unselected, or when tolerance is 0 and the seed already has
    /// the fill color.
    pub fn fill(
        &mut self,
        surface: &mut PixelSurface,
        x: i32,
        y: i32,
        color: u32,
        settings: &FillSettings,
        selection: Option<&dyn Selection>,
    ) -> Option<PixelChangeResult> {
        let seed_idx = surface.checked_index(x, y)?;
        if !mask::selected(selection, x, y) {
            return None;
        }
        let seed = surface.read_at(seed_idx);
        if settings.tolerance == 0 && seed == color {
            return None;
        }

        let mut result = PixelChangeResult::with_description(surface.id(), settings.mode.description());
        self.overflowed = 0;
        match settings.mode {
            FillMode::Contiguous => {
                self.fill_contiguous(surface, x, y, seed, color, settings.tolerance, selection, &mut result)
            }
            FillMode::Global => fill_global(surface, seed, color, settings.tolerance, selection, &mut result),
        }

        if result.has_changes() {
            surface.notify_changed();
        }
        if self.overflowed > 0 {
            info!(overflowed = self.overflowed, "flood fill spilled into queue");
        }
        debug!(
            surface = %surface.id(),
            mode = ?settings.mode,
            tolerance = settings.tolerance,
            filled = result.len(),
            "fill finished"
        );
        Some(result)
    }

    fn fill_contiguous(
        &mut self,
        surface: &mut PixelSurface,
        x: i32,
        y: i32,
        seed: u32,
        color: u32,
        tolerance: u8,
        selection: Option<&dyn Selection>,
        result: &mut PixelChangeResult,
    ) {
        let w = surface.width() as usize;
        let h = surface.height() as usize;
        self.reset(w * h);

        let start = y as usize * w + x as usize;
        self.mark(start);
        self.stack.push(start);

        while let Some(p) = self.pop() {
            let (px, py) = (p % w, p / w);
            // A pixel can be seen without ever being recolored.
            if !mask::selected(selection, px as i32, py as i32) {
                continue;
            }
            let idx = p * 4;
            let current = surface.read_at(idx);
            if !color::similar_rgba(current, seed, tolerance) {
                continue;
            }
            surface.write_at(idx, color);
            result.add(idx, current, color);

            if px > 0 {
                self.visit(p - 1);
            }
            if px + 1 < w {
                self.visit(p + 1);
            }
            if py > 0 {
                self.visit(p - w);
            }
            if py + 1 < h {
                self.visit(p + w);
            }
        }
    }

    fn reset(&mut self, pixels: usize) {
        let words = pixels.div_ceil(64);
        self.seen.clear();
        self.seen.resize(words, 0);
        self.stack.clear();
        self.queue.clear();
    }

    /// Mark `p` seen; false if it already was.
    #[inline]
    fn mark(&mut self, p: usize) -> bool {
        let (word, bit) = (p / 64, 1u64 << (p % 64));
        let fresh = self.seen[word] & bit == 0;
        self.seen[word] |= bit;
        fresh
    }

    #[inline]
    fn visit(&mut self, p: usize) {
        if !self.mark(p) {
            return;
        }
        if self.stack.len() < self.stack_ceiling {
            self.stack.push(p);
        } else {
            self.queue.push_back(p);
            self.overflowed += 1;
        }
    }

    #[inline]
    fn pop(&mut self) -> Option<usize> {
        self.stack.pop().or_else(|| self.queue.pop_front())
    }
}

fn fill_global(
    surface: &mut PixelSurface,
    seed: u32,
    color: u32,
    tolerance: u8,
    selection: Option<&dyn Selection>,
    result: &mut PixelChangeResult,
) {
    for y in 0..surface.height() {
        for x in 0..surface.width() {
            if !mask::selected(selection, x, y) {
                continue;
            }
            let idx = surface.index_of(x, y);
            let current = surface.read_at(idx);
            if color::similar_rgba(current, seed, tolerance) {
                surface.write_at(idx, color);
                result.add(idx, current, color);
            }
        }
    }
}

/// One-shot fill with fresh buffers.
pub fn flood_fill(
    surface: &mut PixelSurface,
    x: i32,
    y: i32,
    color: u32,
    settings: &FillSettings,
    selection: Option<&dyn Selection>,
) -> Option<PixelChangeResult> {
    FloodFiller::new().fill(surface, x, y, color, settings, selection)
}

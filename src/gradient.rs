// ============================================================================
// GRADIENT FILL — shapes, stops, LUT sampling and dithered rendering
// ============================================================================

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::color;
use crate::dither::{self, DitherStyle};
use crate::history::SnapshotDiff;
use crate::mask::Selection;
use crate::surface::PixelSurface;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientShape {
    #[default]
    Linear,
    Radial,
    Angular,
    Diamond,
}

impl GradientShape {
    pub fn all() -> &'static [GradientShape] {
        &[
            GradientShape::Linear,
            GradientShape::Radial,
            GradientShape::Angular,
            GradientShape::Diamond,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            GradientShape::Linear => "Linear",
            GradientShape::Radial => "Radial",
            GradientShape::Angular => "Angular",
            GradientShape::Diamond => "Diamond",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    /// 0.0 ..= 1.0
    pub position: f32,
    pub color: u32,
}

impl ColorStop {
    pub fn new(position: f32, color: u32) -> Self {
        Self { position, color }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientSettings {
    pub shape: GradientShape,
    /// Empty means white to black.
    pub stops: Vec<ColorStop>,
    pub dither: DitherStyle,
    pub reverse: bool,
    pub opacity: u8,
}

impl Default for GradientSettings {
    fn default() -> Self {
        Self {
            shape: GradientShape::Linear,
            stops: Vec::new(),
            dither: DitherStyle::None,
            reverse: false,
            opacity: 255,
        }
    }
}

/// Sorted stop list plus a 256-entry interpolation table.
#[derive(Clone, Debug)]
pub struct Gradient {
    positions: Vec<f32>,
    colors: Vec<u32>,
    lut: Vec<u32>,
}

impl Gradient {
    pub fn new(stops: &[ColorStop]) -> Self {
        let mut sorted: Vec<ColorStop> = match stops.len() {
            0 => vec![ColorStop::new(0.0, 0xFFFF_FFFF), ColorStop::new(1.0, 0xFF00_0000)],
            1 => vec![ColorStop::new(0.0, stops[0].color), ColorStop::new(1.0, stops[0].color)],
            _ => stops.to_vec(),
        };
        for s in &mut sorted {
            s.position = s.position.clamp(0.0, 1.0);
        }
        sorted.sort_by(|a, b| a.position.total_cmp(&b.position));

        let positions: Vec<f32> = sorted.iter().map(|s| s.position).collect();
        let colors: Vec<u32> = sorted.iter().map(|s| s.color).collect();
        let mut gradient = Self {
            positions,
            colors,
            lut: Vec::new(),
        };
        gradient.rebuild_lut();
        gradient
    }

    fn rebuild_lut(&mut self) {
        self.lut = (0..256)
            .map(|i| self.interpolate(i as f32 / 255.0))
            .collect();
    }

    fn interpolate(&self, t: f32) -> u32 {
        let (i, f) = dither::segment(&self.positions, t);
        lerp_color(self.colors[i], self.colors[i + 1], f)
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn stop_color(&self, index: usize) -> u32 {
        self.colors[index.min(self.colors.len() - 1)]
    }

    /// Smooth color at `t` via the LUT.
    pub fn sample(&self, t: f32) -> u32 {
        let idx = (t.clamp(0.0, 1.0) * 255.0 + 0.5) as usize;
        self.lut[idx.min(255)]
    }

    /// Color at `(x, y, t)` for non-diffusion styles. Ordered styles snap to
    /// one of the two surrounding stops by comparing the in-segment fraction
    /// against the threshold matrix.
    pub fn sample_dithered(&self, x: i32, y: i32, t: f32, style: DitherStyle) -> u32 {
        match style.threshold(x, y) {
            None => self.sample(t),
            Some(threshold) => {
                let (i, f) = dither::segment(&self.positions, t);
                if f > threshold {
                    self.colors[i + 1]
                } else {
                    self.colors[i]
                }
            }
        }
    }
}

fn lerp_color(a: u32, b: u32, f: f32) -> u32 {
    let (ab, ag, ar, aa) = color::unpack(a);
    let (bb, bg, br, ba) = color::unpack(b);
    let mix = |x: u8, y: u8| color::to_byte(color::unit(x) + (color::unit(y) - color::unit(x)) * f);
    color::pack(mix(ab, bb), mix(ag, bg), mix(ar, br), mix(aa, ba))
}

/// Gradient parameter of pixel `(x, y)` sampled at its center. A degenerate
/// start/end pair yields 0 everywhere.
pub fn parameter(shape: GradientShape, start: (f32, f32), end: (f32, f32), x: i32, y: i32) -> f32 {
    let (dx, dy) = (end.0 - start.0, end.1 - start.1);
    let len_sq = dx * dx + dy * dy;
    if len_sq < 1e-6 {
        return 0.0;
    }
    let len = len_sq.sqrt();
    let rx = x as f32 + 0.5 - start.0;
    let ry = y as f32 + 0.5 - start.1;

    match shape {
        GradientShape::Linear => ((rx * dx + ry * dy) / len_sq).clamp(0.0, 1.0),
        GradientShape::Radial => ((rx * rx + ry * ry).sqrt() / len).clamp(0.0, 1.0),
        GradientShape::Angular => ((ry.atan2(rx) - dy.atan2(dx)) / TAU).rem_euclid(1.0),
        GradientShape::Diamond => {
            let (ux, uy) = (dx / len, dy / len);
            let proj = (rx * ux + ry * uy).abs() / len;
            let perp = (-rx * uy + ry * ux).abs() / len;
            (proj + perp).clamp(0.0, 1.0)
        }
    }
}

/// Render a gradient from `start` to `end` over the whole surface, blended
/// over existing pixels, and return the full-canvas before/after diff.
pub fn render_gradient(
    surface: &mut PixelSurface,
    start: (f32, f32),
    end: (f32, f32),
    settings: &GradientSettings,
    selection: Option<&dyn Selection>,
) -> SnapshotDiff {
    debug!(
        surface = %surface.id(),
        shape = settings.shape.name(),
        dither = ?settings.dither,
        "gradient fill"
    );
    let before = surface.snapshot();
    let gradient = Gradient::new(&settings.stops);
    let (w, h) = (surface.width(), surface.height());
    let t_at = |x: i32, y: i32| {
        let t = parameter(settings.shape, start, end, x, y);
        if settings.reverse { 1.0 - t } else { t }
    };
    let coverage = |x: i32, y: i32| selection.map_or(255, |s| s.coverage(x, y));

    if settings.dither.is_error_diffusion() {
        let mut t_buf = Vec::with_capacity(surface.pixel_count());
        for y in 0..h {
            for x in 0..w {
                t_buf.push(t_at(x, y));
            }
        }
        let stops = dither::diffuse(
            &t_buf,
            w as usize,
            h as usize,
            gradient.positions(),
            settings.dither,
        );
        for y in 0..h {
            for x in 0..w {
                let cov = coverage(x, y);
                if cov == 0 {
                    continue;
                }
                let i = (y * w + x) as usize;
                let c = gradient.stop_color(stops[i] as usize);
                put(surface, x, y, c, settings.opacity, cov);
            }
        }
    } else {
        for y in 0..h {
            for x in 0..w {
                let cov = coverage(x, y);
                if cov == 0 {
                    continue;
                }
                let c = gradient.sample_dithered(x, y, t_at(x, y), settings.dither);
                put(surface, x, y, c, settings.opacity, cov);
            }
        }
    }

    surface.notify_changed();
    SnapshotDiff::new(surface.id(), before, surface.snapshot(), "Gradient Fill")
}

fn put(surface: &mut PixelSurface, x: i32, y: i32, c: u32, opacity: u8, coverage: u8) {
    let a = color::unit(color::alpha(c)) * color::unit(opacity) * color::unit(coverage);
    let a = color::to_byte(a);
    if a == 0 {
        return;
    }
    let idx = surface.index_of(x, y);
    let dst = surface.read_at(idx);
    surface.write_at(idx, color::blend_over(dst, color::with_alpha(c, a)));
}

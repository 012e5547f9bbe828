// ============================================================================
// BRUSH GEOMETRY — footprints, per-offset alpha, custom tips
// ============================================================================

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::color;
use crate::error::SurfaceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrushShape {
    #[default]
    Circle,
    Square,
}

/// Whether a stroke deposits color or removes alpha.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrushMode {
    #[default]
    Paint,
    Erase,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushSettings {
    /// Diameter in pixels (>= 1).
    pub size: u32,
    pub shape: BrushShape,
    /// Per-stamp strength, 0..255.
    pub density: u8,
    /// Stroke opacity, 0..255.
    pub opacity: u8,
    /// Fraction of the radius painted at full strength (1.0 = hard edge).
    pub hardness: f32,
    /// Exponent of the soft-edge falloff.
    pub falloff_gamma: f32,
    pub mode: BrushMode,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            size: 1,
            shape: BrushShape::Circle,
            density: 255,
            opacity: 255,
            hardness: 1.0,
            falloff_gamma: 1.0,
            mode: BrushMode::Paint,
        }
    }
}

impl BrushSettings {
    /// Density and opacity both at full strength.
    pub fn is_hard_opaque(&self) -> bool {
        self.density == 255 && self.opacity == 255
    }

    /// Offsets covered by a stamp centered on (0, 0).
    pub fn footprint(&self) -> Vec<(i32, i32)> {
        footprint(self.size, self.shape)
    }

    /// Falloff weight (0..1) of an offset from the stamp center.
    pub fn weight(&self, dx: i32, dy: i32) -> f32 {
        let radius = self.size.max(1) as f32 / 2.0;
        let (cx, cy) = center_offset(self.size);
        let dist = match self.shape {
            BrushShape::Circle => ((dx as f32 - cx).powi(2) + (dy as f32 - cy).powi(2)).sqrt(),
            BrushShape::Square => (dx as f32 - cx).abs().max((dy as f32 - cy).abs()),
        };
        let hardness = self.hardness.clamp(0.0, 1.0);
        let solid = radius * hardness;
        if dist <= solid {
            return 1.0;
        }
        color::radial_falloff(dist - solid, radius - solid, self.falloff_gamma)
    }

    /// Effective alpha of an offset: falloff x density x opacity.
    pub fn alpha_at(&self, dx: i32, dy: i32) -> u8 {
        scale_alpha(self.weight(dx, dy), self.density, self.opacity)
    }
}

fn scale_alpha(weight: f32, density: u8, opacity: u8) -> u8 {
    color::to_byte(weight * color::unit(density) * color::unit(opacity))
}

/// Sub-pixel center of an even/odd sized footprint relative to offset (0, 0).
fn center_offset(size: u32) -> (f32, f32) {
    let size = size.max(1) as i32;
    let start = -(size / 2);
    let end = start + size - 1;
    let c = (start + end) as f32 / 2.0;
    (c, c)
}

/// Stamp offsets for a brush of diameter `size`.
pub fn footprint(size: u32, shape: BrushShape) -> Vec<(i32, i32)> {
    let n = size.max(1) as i32;
    let start = -(n / 2);
    let end = start + n - 1;
    let (cx, cy) = center_offset(size);
    let limit = n as f32 / 2.0 - 0.1;

    let mut offsets = Vec::with_capacity((n * n) as usize);
    for dy in start..=end {
        for dx in start..=end {
            let keep = match shape {
                BrushShape::Square => true,
                BrushShape::Circle => {
                    let fx = dx as f32 - cx;
                    let fy = dy as f32 - cy;
                    (fx * fx + fy * fy).sqrt() <= limit.max(0.0)
                }
            };
            if keep {
                offsets.push((dx, dy));
            }
        }
    }
    offsets
}

// ============================================================================
// CUSTOM BRUSH TIPS
// ============================================================================

/// Image-based brush tip: a grayscale alpha plane centered on the stamp point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomBrush {
    id: Uuid,
    name: String,
    width: i32,
    height: i32,
    alpha: Vec<u8>,
}

impl CustomBrush {
    pub fn new(name: &str, width: i32, height: i32, alpha: Vec<u8>) -> Result<Self, SurfaceError> {
        if name.is_empty() {
            return Err(SurfaceError::NullArgument("name"));
        }
        if width <= 0 || height <= 0 {
            return Err(SurfaceError::InvalidDimension {
                width: width as i64,
                height: height as i64,
            });
        }
        let expected = width as usize * height as usize;
        if alpha.len() != expected {
            return Err(SurfaceError::SizeMismatch {
                expected,
                actual: alpha.len(),
            });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            width,
            height,
            alpha,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn origin(&self) -> (i32, i32) {
        (self.width / 2, self.height / 2)
    }

    /// Offsets of every non-transparent tip pixel.
    pub fn offsets(&self) -> Vec<(i32, i32)> {
        let (ox, oy) = self.origin();
        let mut out = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                if self.alpha[(y * self.width + x) as usize] > 0 {
                    out.push((x - ox, y - oy));
                }
            }
        }
        out
    }

    /// Tip alpha at an offset; 0 outside the tip.
    pub fn tip_alpha(&self, dx: i32, dy: i32) -> u8 {
        let (ox, oy) = self.origin();
        let (x, y) = (dx + ox, dy + oy);
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return 0;
        }
        self.alpha[(y * self.width + x) as usize]
    }

    pub fn alpha_at(&self, dx: i32, dy: i32, density: u8, opacity: u8) -> u8 {
        scale_alpha(color::unit(self.tip_alpha(dx, dy)), density, opacity)
    }
}

// ============================================================================
// LAYER EFFECTS — in-place transforms on packed 0xAARRGGBB buffers
// ============================================================================

use std::fmt;

use crate::color;

/// A non-destructive per-layer effect run by the compositor on a scratch copy.
pub trait Effect: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Transform `pixels` (row-major, `width * height` entries) in place.
    fn apply(&self, pixels: &mut [u32], width: usize, height: usize);
}

/// Run `transform` over every pixel in 0..255 float space, rounding back.
fn map_pixels<F>(pixels: &mut [u32], transform: F)
where
    F: Fn(f32, f32, f32, f32) -> (f32, f32, f32, f32),
{
    let byte = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    for p in pixels.iter_mut() {
        let (b, g, r, a) = color::unpack(*p);
        let (nr, ng, nb, na) = transform(r as f32, g as f32, b as f32, a as f32);
        *p = color::pack(byte(nb), byte(ng), byte(nr), byte(na));
    }
}

// ============================================================================
// BUILT-IN EFFECTS
// ============================================================================

/// Invert RGB, keep alpha.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Invert;

impl Effect for Invert {
    fn name(&self) -> &str {
        "Invert"
    }

    fn apply(&self, pixels: &mut [u32], _width: usize, _height: usize) {
        for p in pixels.iter_mut() {
            *p ^= 0x00FF_FFFF;
        }
    }
}

/// Pull RGB toward `color` by `amount` (0..1).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tint {
    pub color: u32,
    pub amount: f32,
}

impl Effect for Tint {
    fn name(&self) -> &str {
        "Tint"
    }

    fn apply(&self, pixels: &mut [u32], _width: usize, _height: usize) {
        let (tb, tg, tr, _) = color::unpack(self.color);
        let k = self.amount.clamp(0.0, 1.0);
        map_pixels(pixels, |r, g, b, a| {
            (
                r + (tr as f32 - r) * k,
                g + (tg as f32 - g) * k,
                b + (tb as f32 - b) * k,
                a,
            )
        });
    }
}

/// Rec. 601 luma.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Grayscale;

impl Effect for Grayscale {
    fn name(&self) -> &str {
        "Grayscale"
    }

    fn apply(&self, pixels: &mut [u32], _width: usize, _height: usize) {
        map_pixels(pixels, |r, g, b, a| {
            let l = 0.299 * r + 0.587 * g + 0.114 * b;
            (l, l, l, a)
        });
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Sepia;

impl Effect for Sepia {
    fn name(&self) -> &str {
        "Sepia"
    }

    fn apply(&self, pixels: &mut [u32], _width: usize, _height: usize) {
        map_pixels(pixels, |r, g, b, a| {
            let sr = 0.393 * r + 0.769 * g + 0.189 * b;
            let sg = 0.349 * r + 0.686 * g + 0.168 * b;
            let sb = 0.272 * r + 0.534 * g + 0.131 * b;
            (sr, sg, sb, a)
        });
    }
}

/// `brightness`: -100..100 additive offset.
/// `contrast`: -100..100, scales around the midpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BrightnessContrast {
    pub brightness: f32,
    pub contrast: f32,
}

impl Effect for BrightnessContrast {
    fn name(&self) -> &str {
        "Brightness/Contrast"
    }

    fn apply(&self, pixels: &mut [u32], _width: usize, _height: usize) {
        let contrast = self.contrast.clamp(-100.0, 100.0);
        let brightness = self.brightness;
        let factor = (259.0 * (contrast + 255.0)) / (255.0 * (259.0 - contrast));
        map_pixels(pixels, move |r, g, b, a| {
            (
                factor * (r + brightness - 128.0) + 128.0,
                factor * (g + brightness - 128.0) + 128.0,
                factor * (b + brightness - 128.0) + 128.0,
                a,
            )
        });
    }
}

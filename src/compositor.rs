// ============================================================================
// COMPOSITOR — flatten an ordered layer list into one destination surface
// ============================================================================
//
// The compositor owns its scratch buffer, so the single-writer rule is a
// borrow-checker fact: composing needs `&mut Compositor`. Use one compositor
// per thread if several destinations are flattened concurrently.

use tracing::debug;

use crate::blend::BlendMode;
use crate::color;
use crate::layer::Layer;
use crate::mask::Mask;
use crate::surface::PixelSurface;

/// Canvas-sized packed-color buffer effects run on.
#[derive(Debug, Default)]
pub struct Scratch {
    pixels: Vec<u32>,
    width: usize,
    height: usize,
}

impl Scratch {
    fn ensure(&mut self, width: usize, height: usize) {
        if self.width != width || self.height != height {
            self.pixels = vec![0; width * height];
            self.width = width;
            self.height = height;
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Packed `0xAARRGGBB` view.
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Byte view. Only BGRA-ordered while the words are in little-endian form.
    fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.pixels)
    }

    /// Zero-extend `src` into the buffer, clipping to the overlap.
    fn load(&mut self, src: &PixelSurface) {
        let (w, h) = (self.width, self.height);
        let (sw, sh) = (src.width() as usize, src.height() as usize);
        let bytes = self.as_bytes_mut();
        bytes.fill(0);
        let copy_w = w.min(sw) * 4;
        for y in 0..h.min(sh) {
            let s = y * sw * 4;
            let d = y * w * 4;
            bytes[d..d + copy_w].copy_from_slice(&src.pixels()[s..s + copy_w]);
        }
        // bytes -> logical packed values (no-op on little-endian hosts)
        for p in self.pixels.iter_mut() {
            *p = u32::from_le(*p);
        }
    }

    fn store_order(&mut self) {
        for p in self.pixels.iter_mut() {
            *p = p.to_le();
        }
    }
}

#[derive(Debug, Default)]
pub struct Compositor {
    scratch: Scratch,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scratch(&self) -> &Scratch {
        &self.scratch
    }

    /// Clear `dest` and draw `layers` into it bottom to top.
    ///
    /// Each layer's enabled effects are snapshotted and applied in reverse of
    /// their list order on a scratch copy; the layer's own pixels are never
    /// modified.
    pub fn composite_linear(&mut self, layers: &[Layer], dest: &mut PixelSurface) {
        dest.pixels_mut().fill(0);
        let (dw, dh) = (dest.width() as usize, dest.height() as usize);
        let mut drawn = 0usize;
        let mut effects_run = 0usize;

        for layer in layers {
            if !layer.is_drawable() {
                continue;
            }
            let mut effects = layer.effects.snapshot_enabled();
            effects.reverse();

            if effects.is_empty() {
                let src = &layer.surface;
                blit(
                    src.pixels(),
                    src.width() as usize,
                    src.height() as usize,
                    dest,
                    layer.opacity,
                    layer.blend_mode,
                    layer.mask.as_ref(),
                );
            } else {
                self.scratch.ensure(dw, dh);
                self.scratch.load(&layer.surface);
                for effect in &effects {
                    effect.apply(&mut self.scratch.pixels, dw, dh);
                }
                self.scratch.store_order();
                blit(
                    self.scratch.as_bytes(),
                    dw,
                    dh,
                    dest,
                    layer.opacity,
                    layer.blend_mode,
                    layer.mask.as_ref(),
                );
                effects_run += effects.len();
            }
            drawn += 1;
        }

        dest.notify_changed();
        debug!(
            layers = layers.len(),
            drawn,
            effects = effects_run,
            "composite"
        );
    }
}

/// Blend `src` (BGRA, `sw x sh`) into `dst` over their overlap.
fn blit(
    src: &[u8],
    sw: usize,
    sh: usize,
    dst: &mut PixelSurface,
    opacity: u8,
    mode: BlendMode,
    mask: Option<&Mask>,
) {
    let dw = dst.width() as usize;
    let w = sw.min(dw);
    let h = sh.min(dst.height() as usize);
    let op = color::unit(opacity);
    let out = dst.pixels_mut();

    for y in 0..h {
        for x in 0..w {
            let si = (y * sw + x) * 4;
            let sa = src[si + 3];
            if sa == 0 {
                continue;
            }
            let mut a = color::unit(sa) * op;
            if let Some(m) = mask {
                a *= color::unit(m.value(x as i32, y as i32));
            }
            if a <= 0.0 {
                continue;
            }
            let di = (y * dw + x) * 4;
            let s = &src[si..si + 4];
            let d = &mut out[di..di + 4];
            if mode == BlendMode::Normal {
                blend_normal(s, d, a);
            } else {
                blend_mode(s, d, a, mode);
            }
        }
    }
}

#[inline]
fn blend_normal(s: &[u8], d: &mut [u8], a: f32) {
    if a >= 1.0 {
        d.copy_from_slice(s);
        return;
    }
    let da = color::unit(d[3]) * (1.0 - a);
    let out_a = a + da;
    for c in 0..3 {
        let v = (color::unit(s[c]) * a + color::unit(d[c]) * da) / out_a;
        d[c] = color::to_byte(v);
    }
    d[3] = color::to_byte(out_a);
}

#[inline]
fn blend_mode(s: &[u8], d: &mut [u8], a: f32, mode: BlendMode) {
    let base_a = color::unit(d[3]);
    let out_a = a + base_a * (1.0 - a);
    if out_a <= 0.0 {
        d.fill(0);
        return;
    }
    for c in 0..3 {
        let base = color::unit(d[c]);
        let top = color::unit(s[c]);
        let blended = mode.channel(base, top);
        let v = (blended * a + base * base_a * (1.0 - a)) / out_a;
        d[c] = color::to_byte(v);
    }
    d[3] = color::to_byte(out_a);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{Invert, Tint};
    use crate::layer::LayerEffect;

    fn solid(w: i32, h: i32, c: u32) -> PixelSurface {
        let mut s = PixelSurface::new(w, h).unwrap();
        s.clear(c);
        s
    }

    #[test]
    fn test_single_opaque_layer_is_copied_exactly() {
        let mut src = PixelSurface::new(4, 3).unwrap();
        for y in 0..3 {
            for x in 0..4 {
                src.write_bgra(x, y, 0xFF00_0000 | (x as u32 * 40) << 16 | (y as u32 * 70));
            }
        }
        let expected = src.snapshot();
        let layers = [Layer::new("base", src)];
        let mut dest = solid(4, 3, 0xFFAB_CDEF);
        Compositor::new().composite_linear(&layers, &mut dest);
        assert_eq!(dest.pixels(), &expected[..]);
    }

    #[test]
    fn test_effects_apply_in_reverse_list_order() {
        let layer = Layer::new("fx", solid(2, 2, 0xFF12_3456));
        layer.effects.push(LayerEffect::new(Tint {
            color: 0xFFFF_0000,
            amount: 1.0,
        }));
        layer.effects.push(LayerEffect::new(Invert));
        let original = layer.surface.snapshot();

        let mut dest = PixelSurface::new(2, 2).unwrap();
        let layers = [layer];
        Compositor::new().composite_linear(&layers, &mut dest);
        // Invert first, then tint: pure red. The list order would give cyan.
        assert_eq!(dest.read_bgra(0, 0), 0xFFFF_0000);
        assert_eq!(layers[0].surface.pixels(), &original[..]);
    }

    #[test]
    fn test_hidden_and_zero_opacity_layers_are_skipped() {
        let mut hidden = Layer::new("hidden", solid(2, 2, 0xFFFF_0000));
        hidden.visible = false;
        let mut clear = Layer::new("clear", solid(2, 2, 0xFF00_FF00));
        clear.opacity = 0;
        let mut dest = solid(2, 2, 0xFFFF_FFFF);
        Compositor::new().composite_linear(&[hidden, clear], &mut dest);
        assert!(dest.pixels().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_opacity_and_mask_scale_alpha() {
        let mut top = Layer::new("top", solid(2, 1, 0xFFFF_0000));
        top.opacity = 128;
        let mut mask = Mask::new(2, 1).unwrap();
        mask.set(0, 0, 255);
        top.mask = Some(mask);
        let layers = [Layer::new("bottom", solid(2, 1, 0xFF00_00FF)), top];

        let mut dest = PixelSurface::new(2, 1).unwrap();
        Compositor::new().composite_linear(&layers, &mut dest);
        let (b, _, r, a) = color::unpack(dest.read_bgra(0, 0));
        assert_eq!(a, 255);
        assert!((r as i32 - 128).abs() <= 1 && (b as i32 - 127).abs() <= 1);
        // masked out: bottom shows through untouched
        assert_eq!(dest.read_bgra(1, 0), 0xFF00_00FF);
    }

    #[test]
    fn test_multiply_mode() {
        let mut top = Layer::new("top", solid(1, 1, 0xFF80_8080));
        top.blend_mode = BlendMode::Multiply;
        let layers = [Layer::new("bottom", solid(1, 1, 0xFFFF_FFFF)), top];
        let mut dest = PixelSurface::new(1, 1).unwrap();
        Compositor::new().composite_linear(&layers, &mut dest);
        assert_eq!(dest.read_bgra(0, 0), 0xFF80_8080);
    }

    #[test]
    fn test_smaller_layer_is_zero_extended() {
        let layer = Layer::new("small", solid(1, 1, 0xFF00_FF00));
        layer.effects.push(LayerEffect::new(Invert));
        let mut dest = PixelSurface::new(3, 2).unwrap();
        let mut comp = Compositor::new();
        comp.composite_linear(&[layer], &mut dest);
        assert_eq!(dest.read_bgra(0, 0), 0xFFFF_00FF);
        // Zero-extended area inverts to transparent white and stays invisible.
        assert_eq!(dest.read_bgra(2, 1), 0);
        assert_eq!((comp.scratch().width(), comp.scratch().height()), (3, 2));
    }
}

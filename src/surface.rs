// ============================================================================
// PIXEL SURFACE — flat BGRA buffer for one layer / canvas
// ============================================================================
//
// Layout: row-major, 4 bytes per pixel in B,G,R,A order, no padding.
// `index_of` is plain arithmetic; `read_bgra` / `write_bgra` are the
// bounds-safe forms (out-of-range reads give 0, writes are dropped).

use std::fmt;

use image::{Rgba, RgbaImage};
use uuid::Uuid;

use crate::color;
use crate::error::SurfaceError;

/// Stable identity of a surface, used by change records to find their target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(Uuid);

impl SurfaceId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle returned by [`PixelSurface::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut()>;

pub struct PixelSurface {
    id: SurfaceId,
    width: i32,
    height: i32,
    pixels: Vec<u8>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

fn byte_len(width: i32, height: i32) -> Result<usize, SurfaceError> {
    if width <= 0 || height <= 0 {
        return Err(SurfaceError::InvalidDimension {
            width: width as i64,
            height: height as i64,
        });
    }
    Ok(width as usize * height as usize * 4)
}

impl PixelSurface {
    /// Allocate a zero-filled (fully transparent) surface.
    pub fn new(width: i32, height: i32) -> Result<Self, SurfaceError> {
        let len = byte_len(width, height)?;
        Ok(Self {
            id: SurfaceId::new(),
            width,
            height,
            pixels: vec![0; len],
            listeners: Vec::new(),
            next_listener: 0,
        })
    }

    /// Wrap an externally allocated BGRA buffer. Its length must be exactly `w*h*4`.
    pub fn from_bgra(width: i32, height: i32, pixels: Vec<u8>) -> Result<Self, SurfaceError> {
        let len = byte_len(width, height)?;
        if pixels.len() != len {
            return Err(SurfaceError::SizeMismatch {
                expected: len,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            id: SurfaceId::new(),
            width,
            height,
            pixels,
            listeners: Vec::new(),
            next_listener: 0,
        })
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Raw BGRA bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Raw BGRA bytes for bulk writers. Does not notify; call
    /// [`notify_changed`](Self::notify_changed) once the batch is done.
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Byte index of `(x, y)`: `(y*W + x)*4`. Unchecked arithmetic; call
    /// [`is_in_bounds`](Self::is_in_bounds) first when the coordinate may be outside.
    #[inline]
    pub fn index_of(&self, x: i32, y: i32) -> usize {
        debug_assert!(self.is_in_bounds(x, y), "index_of({x}, {y}) outside surface");
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Byte index of `(x, y)`, or `None` when the coordinate is outside the surface.
    #[inline]
    pub fn checked_index(&self, x: i32, y: i32) -> Option<usize> {
        self.is_in_bounds(x, y).then(|| self.index_of(x, y))
    }

    #[inline]
    pub fn is_in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height
    }

    /// Packed `0xAARRGGBB` at `(x, y)`; 0 when out of bounds.
    #[inline]
    pub fn read_bgra(&self, x: i32, y: i32) -> u32 {
        if !self.is_in_bounds(x, y) {
            return 0;
        }
        self.read_at(self.index_of(x, y))
    }

    /// Store packed `0xAARRGGBB` at `(x, y)` and notify listeners. Out-of-bounds
    /// writes are dropped silently and do not notify.
    pub fn write_bgra(&mut self, x: i32, y: i32, color: u32) {
        if !self.is_in_bounds(x, y) {
            return;
        }
        let idx = self.index_of(x, y);
        self.write_at(idx, color);
        self.notify_changed();
    }

    /// Packed color at a byte index known to be valid.
    #[inline]
    pub fn read_at(&self, idx: usize) -> u32 {
        color::from_bgra_bytes(&self.pixels[idx..idx + 4])
    }

    /// Store a packed color at a byte index known to be valid, without notifying.
    #[inline]
    pub fn write_at(&mut self, idx: usize, color: u32) {
        self.pixels[idx..idx + 4].copy_from_slice(&color::to_bgra_bytes(color));
    }

    /// Fill every pixel with `color`; notifies once.
    pub fn clear(&mut self, color: u32) {
        let bytes = color::to_bgra_bytes(color);
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&bytes);
        }
        self.notify_changed();
    }

    /// Replace the buffer with a new `new_w x new_h` one. Old content is not
    /// preserved. A supplied buffer must be exactly `new_w*new_h*4` bytes;
    /// on mismatch the surface is left untouched.
    pub fn resize(
        &mut self,
        new_w: i32,
        new_h: i32,
        buffer: Option<Vec<u8>>,
    ) -> Result<(), SurfaceError> {
        let len = byte_len(new_w, new_h)?;
        let pixels = match buffer {
            Some(buf) if buf.len() != len => {
                return Err(SurfaceError::SizeMismatch {
                    expected: len,
                    actual: buf.len(),
                });
            }
            Some(buf) => buf,
            None => vec![0; len],
        };
        self.width = new_w;
        self.height = new_h;
        self.pixels = pixels;
        self.notify_changed();
        Ok(())
    }

    /// Copy of the current BGRA bytes, e.g. a pre-stroke snapshot.
    pub fn snapshot(&self) -> Vec<u8> {
        self.pixels.clone()
    }

    // ------------------------------------------------------------------------
    // Change notification
    // ------------------------------------------------------------------------

    /// Register a listener. Listeners fire synchronously in registration order.
    pub fn subscribe(&mut self, listener: impl FnMut() + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub fn notify_changed(&mut self) {
        for (_, listener) in self.listeners.iter_mut() {
            listener();
        }
    }

    // ------------------------------------------------------------------------
    // image crate interop (RGBA <-> BGRA)
    // ------------------------------------------------------------------------

    pub fn from_rgba_image(img: &RgbaImage) -> Result<Self, SurfaceError> {
        let mut surface = Self::new(img.width() as i32, img.height() as i32)?;
        for (dst, src) in surface.pixels.chunks_exact_mut(4).zip(img.pixels()) {
            let [r, g, b, a] = src.0;
            dst.copy_from_slice(&[b, g, r, a]);
        }
        Ok(surface)
    }

    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let c = self.read_bgra(x as i32, y as i32);
            let (b, g, r, a) = color::unpack(c);
            Rgba([r, g, b, a])
        })
    }
}

impl fmt::Debug for PixelSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelSurface")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_buffer_length_matches_dimensions() {
        for (w, h) in [(1, 1), (3, 7), (64, 2)] {
            let s = PixelSurface::new(w, h).unwrap();
            assert_eq!(s.pixels().len(), (w * h * 4) as usize);
        }
    }

    #[test]
    fn test_invalid_dimensions_rejected() {
        for (w, h) in [(0, 1), (1, 0), (-3, 4), (5, -1)] {
            assert!(matches!(
                PixelSurface::new(w, h),
                Err(SurfaceError::InvalidDimension { .. })
            ));
        }
    }

    #[test]
    fn test_index_of() {
        let s = PixelSurface::new(10, 10).unwrap();
        assert_eq!(s.index_of(5, 5), 220);
        assert_eq!(s.index_of(0, 0), 0);
        assert_eq!(s.checked_index(10, 0), None);
        assert_eq!(s.checked_index(9, 9), Some(396));
    }

    #[test]
    fn test_read_write_round_trip() {
        let mut s = PixelSurface::new(4, 4).unwrap();
        for c in [0x0000_0000, 0xFFFF_FFFF, 0x80FF_0000, 0x1234_5678] {
            s.write_bgra(2, 3, c);
            assert_eq!(s.read_bgra(2, 3), c);
        }
    }

    #[test]
    fn test_memory_order_is_bgra() {
        let mut s = PixelSurface::new(1, 1).unwrap();
        s.write_bgra(0, 0, 0xAA11_2233);
        assert_eq!(s.pixels(), &[0x33, 0x22, 0x11, 0xAA]);
    }

    #[test]
    fn test_out_of_bounds_is_silent() {
        let mut s = PixelSurface::new(3, 3).unwrap();
        s.clear(0xFF00_00FF);
        let before = s.snapshot();
        for (x, y) in [(-1, 0), (0, -1), (3, 0), (0, 3), (i32::MAX, i32::MIN)] {
            assert_eq!(s.read_bgra(x, y), 0);
            s.write_bgra(x, y, 0xFFFF_FFFF);
        }
        assert_eq!(s.pixels(), before.as_slice());
    }

    #[test]
    fn test_resize_replaces_buffer() {
        let mut s = PixelSurface::new(2, 2).unwrap();
        s.clear(0xFFFF_FFFF);
        let fired = Rc::new(RefCell::new(0));
        let counter = fired.clone();
        s.subscribe(move || *counter.borrow_mut() += 1);

        s.resize(3, 1, None).unwrap();
        assert_eq!((s.width(), s.height()), (3, 1));
        assert!(s.pixels().iter().all(|&b| b == 0));
        assert_eq!(*fired.borrow(), 1);

        assert!(matches!(
            s.resize(0, 5, None),
            Err(SurfaceError::InvalidDimension { .. })
        ));
        assert!(s.resize(2, 2, Some(vec![0; 3])).is_err());
        assert_eq!(*fired.borrow(), 1);
    }

    #[test]
    fn test_resize_with_wrong_buffer_length_is_rejected() {
        let mut s = PixelSurface::new(2, 2).unwrap();
        let err = s.resize(2, 2, Some(vec![0; 15])).unwrap_err();
        assert_eq!(err, SurfaceError::SizeMismatch { expected: 16, actual: 15 });
        assert_eq!((s.width(), s.height()), (2, 2));

        s.resize(1, 2, Some(vec![7; 8])).unwrap();
        assert_eq!(s.read_bgra(0, 1), 0x0707_0707);
    }

    #[test]
    fn test_listeners_fire_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut s = PixelSurface::new(2, 2).unwrap();
        let l1 = log.clone();
        let first = s.subscribe(move || l1.borrow_mut().push(1));
        let l2 = log.clone();
        s.subscribe(move || l2.borrow_mut().push(2));

        s.write_bgra(0, 0, 1);
        s.write_bgra(9, 9, 1); // out of bounds: no notification
        s.clear(0);
        assert_eq!(*log.borrow(), vec![1, 2, 1, 2]);

        assert!(s.unsubscribe(first));
        s.notify_changed();
        assert_eq!(*log.borrow(), vec![1, 2, 1, 2, 2]);
    }

    #[test]
    fn test_rgba_image_interop() {
        let img = RgbaImage::from_pixel(2, 1, Rgba([10, 20, 30, 40]));
        let s = PixelSurface::from_rgba_image(&img).unwrap();
        assert_eq!(s.read_bgra(1, 0), 0x280A_141E);
        assert_eq!(s.to_rgba_image(), img);
    }
}

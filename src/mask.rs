// ============================================================================
// MASKS & SELECTION
// ============================================================================
//
// `Mask` is a per-pixel 0..255 intensity plane. It serves both as a selection
// mask for painters and as a layer mask for the compositor. Painters only see
// the `Selection` trait, so a plain closure works as a selection too.

use crate::error::SurfaceError;

/// Membership test used by painters to restrict which pixels they touch.
pub trait Selection {
    fn contains(&self, x: i32, y: i32) -> bool;

    /// Coverage in 0..255; selections without partial coverage are 0 or 255.
    fn coverage(&self, x: i32, y: i32) -> u8 {
        if self.contains(x, y) { 255 } else { 0 }
    }
}

impl<F> Selection for F
where
    F: Fn(i32, i32) -> bool,
{
    fn contains(&self, x: i32, y: i32) -> bool {
        self(x, y)
    }
}

/// `contains` for an optional selection: no selection means everything is selected.
#[inline]
pub fn selected(selection: Option<&dyn Selection>, x: i32, y: i32) -> bool {
    selection.is_none_or(|s| s.contains(x, y))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    width: i32,
    height: i32,
    data: Vec<u8>,
}

impl Mask {
    /// Empty (fully deselected / fully hidden) mask.
    pub fn new(width: i32, height: i32) -> Result<Self, SurfaceError> {
        Self::filled(width, height, 0)
    }

    pub fn filled(width: i32, height: i32, value: u8) -> Result<Self, SurfaceError> {
        if width <= 0 || height <= 0 {
            return Err(SurfaceError::InvalidDimension {
                width: width as i64,
                height: height as i64,
            });
        }
        Ok(Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        })
    }

    /// Wrap one byte per pixel, row-major.
    pub fn from_raw(width: i32, height: i32, data: Vec<u8>) -> Result<Self, SurfaceError> {
        let mut mask = Self::new(width, height)?;
        if data.len() != mask.data.len() {
            return Err(SurfaceError::SizeMismatch {
                expected: mask.data.len(),
                actual: data.len(),
            });
        }
        mask.data = data;
        Ok(mask)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Intensity at `(x, y)`; 0 outside the mask.
    #[inline]
    pub fn value(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return 0;
        }
        self.data[y as usize * self.width as usize + x as usize]
    }

    pub fn set(&mut self, x: i32, y: i32, value: u8) {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return;
        }
        self.data[y as usize * self.width as usize + x as usize] = value;
    }

    /// Set every pixel of the rectangle (clipped to the mask) to `value`.
    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, value: u8) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = x.saturating_add(w).min(self.width);
        let y1 = y.saturating_add(h).min(self.height);
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        for py in y0..y1 {
            let row = py as usize * self.width as usize;
            self.data[row + x0 as usize..row + x1 as usize].fill(value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|&v| v == 0)
    }
}

impl Selection for Mask {
    fn contains(&self, x: i32, y: i32) -> bool {
        self.value(x, y) > 0
    }

    fn coverage(&self, x: i32, y: i32) -> u8 {
        self.value(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_bounds() {
        let mut m = Mask::new(4, 3).unwrap();
        m.set(3, 2, 200);
        m.set(4, 2, 200);
        assert_eq!(m.value(3, 2), 200);
        assert_eq!(m.value(-1, 0), 0);
        assert_eq!(m.value(4, 2), 0);
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut m = Mask::new(4, 4).unwrap();
        m.fill_rect(2, 2, 10, 10, 255);
        assert!(m.contains(3, 3));
        assert!(m.contains(2, 2));
        assert!(!m.contains(1, 2));
        m.fill_rect(-5, -5, 2, 2, 255);
        assert!(!m.contains(0, 0));
    }

    #[test]
    fn test_fill_rect_outside_mask_is_ignored() {
        let mut m = Mask::new(4, 4).unwrap();
        m.fill_rect(10, 3, 1, 1, 255);
        m.fill_rect(0, 10, 4, 4, 255);
        m.fill_rect(1, 1, 0, 3, 255);
        m.fill_rect(i32::MAX, i32::MAX, i32::MAX, i32::MAX, 255);
        assert!(m.is_empty());
    }

    #[test]
    fn test_closure_selection() {
        let left_half = |x: i32, _y: i32| x < 2;
        assert!(selected(Some(&left_half), 1, 0));
        assert!(!selected(Some(&left_half), 2, 0));
        assert!(selected(None, 99, 99));
        assert_eq!(left_half.coverage(0, 0), 255);
    }

    #[test]
    fn test_from_raw_length_checked() {
        assert!(Mask::from_raw(2, 2, vec![0; 3]).is_err());
        assert!(Mask::from_raw(2, 2, vec![0; 4]).is_ok());
    }
}

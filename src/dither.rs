// ============================================================================
// DITHERING — ordered thresholds and multi-color error diffusion over `t`
// ============================================================================
//
// Dithering here works on the gradient parameter, not on RGB: the output of
// every style is a choice between gradient stops, which is what pixel-art
// gradients want (no colors outside the palette of stops).

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DitherStyle {
    /// Smooth interpolation between stops.
    #[default]
    None,
    Bayer2,
    Bayer4,
    Bayer8,
    FloydSteinberg,
    Atkinson,
    Riemersma,
}

impl DitherStyle {
    pub fn is_error_diffusion(self) -> bool {
        matches!(
            self,
            DitherStyle::FloydSteinberg | DitherStyle::Atkinson | DitherStyle::Riemersma
        )
    }

    fn bayer_levels(self) -> Option<u32> {
        match self {
            DitherStyle::Bayer2 => Some(1),
            DitherStyle::Bayer4 => Some(2),
            DitherStyle::Bayer8 => Some(3),
            _ => None,
        }
    }

    /// Ordered-dither threshold in (0, 1) for `(x, y)`; `None` for styles
    /// without a threshold matrix.
    pub fn threshold(self, x: i32, y: i32) -> Option<f32> {
        let levels = self.bayer_levels()?;
        let n = 1u32 << (2 * levels);
        Some((bayer_index(levels, x as u32, y as u32) as f32 + 0.5) / n as f32)
    }
}

/// Entry of the `2^levels` square Bayer matrix at `(x, y)`.
fn bayer_index(levels: u32, x: u32, y: u32) -> u32 {
    let mut v = 0;
    for i in 0..levels {
        let xb = (x >> i) & 1;
        let yb = (y >> i) & 1;
        v = (v << 2) | (((xb ^ yb) << 1) | yb);
    }
    v
}

/// Index of the segment containing `t` and the fraction within it.
/// `positions` must be sorted and hold at least two entries.
pub fn segment(positions: &[f32], t: f32) -> (usize, f32) {
    let last = positions.len() - 1;
    if t <= positions[0] {
        return (0, 0.0);
    }
    if t >= positions[last] {
        return (last - 1, 1.0);
    }
    let i = positions
        .windows(2)
        .position(|w| t >= w[0] && t <= w[1])
        .unwrap_or(last - 1);
    let span = positions[i + 1] - positions[i];
    let f = if span > f32::EPSILON {
        (t - positions[i]) / span
    } else {
        1.0
    };
    (i, f)
}

/// Stop index closest to `v`.
pub fn nearest(positions: &[f32], v: f32) -> usize {
    let mut best = 0;
    let mut best_d = f32::INFINITY;
    for (i, &p) in positions.iter().enumerate() {
        let d = (p - v).abs();
        if d < best_d {
            best = i;
            best_d = d;
        }
    }
    best
}

// ============================================================================
// ERROR DIFFUSION
// ============================================================================

const FLOYD_STEINBERG: &[(i32, i32, f32)] = &[
    (1, 0, 7.0 / 16.0),
    (-1, 1, 3.0 / 16.0),
    (0, 1, 5.0 / 16.0),
    (1, 1, 1.0 / 16.0),
];

// Atkinson deliberately propagates only 6/8 of the error.
const ATKINSON: &[(i32, i32, f32)] = &[
    (1, 0, 1.0 / 8.0),
    (2, 0, 1.0 / 8.0),
    (-1, 1, 1.0 / 8.0),
    (0, 1, 1.0 / 8.0),
    (1, 1, 1.0 / 8.0),
    (0, 2, 1.0 / 8.0),
];

const RIEMERSMA_HISTORY: usize = 16;

/// Quantize a full `w x h` buffer of gradient parameters to stop indices.
///
/// The pass runs over the whole buffer in an unbroken order; callers apply
/// selection masks afterwards.
pub fn diffuse(t: &[f32], width: usize, height: usize, positions: &[f32], style: DitherStyle) -> Vec<u16> {
    match style {
        DitherStyle::FloydSteinberg => diffuse_kernel(t, width, height, positions, FLOYD_STEINBERG),
        DitherStyle::Atkinson => diffuse_kernel(t, width, height, positions, ATKINSON),
        DitherStyle::Riemersma => diffuse_riemersma(t, width, height, positions),
        _ => t.iter().map(|&v| nearest(positions, v) as u16).collect(),
    }
}

fn diffuse_kernel(
    t: &[f32],
    width: usize,
    height: usize,
    positions: &[f32],
    kernel: &[(i32, i32, f32)],
) -> Vec<u16> {
    let mut work = t.to_vec();
    let mut out = vec![0u16; t.len()];
    for y in 0..height {
        for x in 0..width {
            let i = y * width + x;
            let v = work[i];
            let k = nearest(positions, v);
            out[i] = k as u16;
            let err = v - positions[k];
            if err == 0.0 {
                continue;
            }
            for &(dx, dy, w) in kernel {
                let nx = x as i64 + dx as i64;
                let ny = y as i64 + dy as i64;
                if nx < 0 || nx >= width as i64 || ny >= height as i64 {
                    continue;
                }
                work[ny as usize * width + nx as usize] += err * w;
            }
        }
    }
    out
}

fn riemersma_weights() -> [f32; RIEMERSMA_HISTORY] {
    // Exponential falloff: newest error weighs 16x the oldest.
    let ratio = (1.0f32 / 16.0).ln() / (RIEMERSMA_HISTORY as f32 - 1.0);
    let mut w = [0.0; RIEMERSMA_HISTORY];
    for (i, v) in w.iter_mut().enumerate() {
        *v = (ratio * (RIEMERSMA_HISTORY - 1 - i) as f32).exp();
    }
    let sum: f32 = w.iter().sum();
    w.iter_mut().for_each(|v| *v /= sum);
    w
}

fn diffuse_riemersma(t: &[f32], width: usize, height: usize, positions: &[f32]) -> Vec<u16> {
    let weights = riemersma_weights();
    let mut history: VecDeque<f32> = VecDeque::from(vec![0.0; RIEMERSMA_HISTORY]);
    let mut out = vec![0u16; t.len()];

    let side = width.max(height).next_power_of_two();
    for d in 0..side * side {
        let (x, y) = hilbert_d2xy(side, d);
        if x >= width || y >= height {
            continue;
        }
        let i = y * width + x;
        // history[0] is the oldest entry, weights[0] the smallest weight.
        let carried: f32 = history.iter().zip(weights.iter()).map(|(e, w)| e * w).sum();
        let v = t[i] + carried;
        let k = nearest(positions, v);
        out[i] = k as u16;
        history.pop_front();
        history.push_back(v - positions[k]);
    }
    out
}

/// Hilbert curve index -> `(x, y)` on an `n x n` grid (`n` a power of two).
fn hilbert_d2xy(n: usize, d: usize) -> (usize, usize) {
    let (mut x, mut y) = (0usize, 0usize);
    let mut t = d;
    let mut s = 1;
    while s < n {
        let rx = 1 & (t / 2);
        let ry = 1 & (t ^ rx);
        if ry == 0 {
            if rx == 1 {
                x = s - 1 - x;
                y = s - 1 - y;
            }
            std::mem::swap(&mut x, &mut y);
        }
        x += s * rx;
        y += s * ry;
        t /= 4;
        s *= 2;
    }
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_bayer2_matrix() {
        let m: Vec<u32> = [(0, 0), (1, 0), (0, 1), (1, 1)]
            .iter()
            .map(|&(x, y)| bayer_index(1, x, y))
            .collect();
        assert_eq!(m, vec![0, 2, 3, 1]);
    }

    #[test]
    fn test_bayer8_is_a_permutation() {
        let mut seen = HashSet::new();
        for y in 0..8 {
            for x in 0..8 {
                seen.insert(bayer_index(3, x, y));
            }
        }
        assert_eq!(seen.len(), 64);
        assert!(seen.iter().all(|&v| v < 64));
    }

    #[test]
    fn test_threshold_range() {
        for y in 0..4 {
            for x in 0..4 {
                let t = DitherStyle::Bayer4.threshold(x, y).unwrap();
                assert!(t > 0.0 && t < 1.0);
            }
        }
        assert_eq!(DitherStyle::None.threshold(0, 0), None);
        assert_eq!(DitherStyle::Atkinson.threshold(0, 0), None);
    }

    #[test]
    fn test_segment_lookup() {
        let p = [0.0, 0.5, 1.0];
        assert_eq!(segment(&p, -1.0), (0, 0.0));
        assert_eq!(segment(&p, 2.0), (1, 1.0));
        let (i, f) = segment(&p, 0.75);
        assert_eq!(i, 1);
        assert!((f - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_hilbert_visits_every_cell_once() {
        let n = 8;
        let cells: HashSet<_> = (0..n * n).map(|d| hilbert_d2xy(n, d)).collect();
        assert_eq!(cells.len(), n * n);
        // consecutive cells are 4-neighbours
        for d in 1..n * n {
            let (ax, ay) = hilbert_d2xy(n, d - 1);
            let (bx, by) = hilbert_d2xy(n, d);
            assert_eq!(ax.abs_diff(bx) + ay.abs_diff(by), 1);
        }
    }

    #[test]
    fn test_error_diffusion_preserves_average() {
        let (w, h) = (32, 32);
        let t = vec![0.25f32; w * h];
        let positions = [0.0, 1.0];
        for style in [DitherStyle::FloydSteinberg, DitherStyle::Riemersma] {
            let out = diffuse(&t, w, h, &positions, style);
            let ones = out.iter().filter(|&&k| k == 1).count() as f32;
            let ratio = ones / (w * h) as f32;
            assert!((ratio - 0.25).abs() < 0.05, "{style:?} gave {ratio}");
        }
    }

    #[test]
    fn test_exact_stops_need_no_diffusion() {
        let t = vec![0.0, 1.0, 0.0, 1.0];
        let out = diffuse(&t, 2, 2, &[0.0, 1.0], DitherStyle::Atkinson);
        assert_eq!(out, vec![0, 1, 0, 1]);
    }
}

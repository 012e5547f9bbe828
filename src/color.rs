// ============================================================================
// COLOR MATH — packing, "over" compositing, fill tolerance, falloff
// ============================================================================
//
// Logical packed form is 0xAARRGGBB; in memory that is B,G,R,A (little-endian
// bytes of the packed value). All alpha here is straight, never premultiplied.

use std::sync::LazyLock;

/// Alpha at or below this counts as "empty" for fill tolerance purposes.
pub const EMPTY_ALPHA: u8 = 8;

/// Byte -> 0..1 float table shared by every blit and blend.
pub static BYTE_TO_UNIT: LazyLock<[f32; 256]> = LazyLock::new(|| {
    let mut lut = [0.0f32; 256];
    for (i, v) in lut.iter_mut().enumerate() {
        *v = i as f32 / 255.0;
    }
    lut
});

#[inline]
pub fn unit(b: u8) -> f32 {
    BYTE_TO_UNIT[b as usize]
}

#[inline]
pub fn to_byte(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[inline]
pub fn pack(b: u8, g: u8, r: u8, a: u8) -> u32 {
    u32::from_le_bytes([b, g, r, a])
}

/// Split a packed color into `(b, g, r, a)`.
#[inline]
pub fn unpack(c: u32) -> (u8, u8, u8, u8) {
    let [b, g, r, a] = c.to_le_bytes();
    (b, g, r, a)
}

#[inline]
pub fn alpha(c: u32) -> u8 {
    (c >> 24) as u8
}

#[inline]
pub fn rgb(c: u32) -> u32 {
    c & 0x00FF_FFFF
}

#[inline]
pub fn with_alpha(c: u32, a: u8) -> u32 {
    rgb(c) | ((a as u32) << 24)
}

#[inline]
pub fn from_bgra_bytes(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[inline]
pub fn to_bgra_bytes(c: u32) -> [u8; 4] {
    c.to_le_bytes()
}

/// Porter-Duff `src over dst`, straight alpha.
pub fn blend_over(dst: u32, src: u32) -> u32 {
    let (sb, sg, sr, sa) = unpack(src);
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return src;
    }
    let (db, dg, dr, da) = unpack(dst);

    let sa_f = unit(sa);
    let da_f = unit(da) * (1.0 - sa_f);
    let out_a = sa_f + da_f;
    if out_a <= 0.0 {
        return 0;
    }
    let mix = |s: u8, d: u8| -> u8 {
        let v = (s as f32 * sa_f + d as f32 * da_f) / out_a;
        v.round().clamp(0.0, 255.0) as u8
    };
    pack(mix(sb, db), mix(sg, dg), mix(sr, dr), to_byte(out_a))
}

/// True when both colors are on the same side of the empty-alpha threshold.
#[inline]
pub fn same_empty_side(a: u32, b: u32) -> bool {
    (alpha(a) <= EMPTY_ALPHA) == (alpha(b) <= EMPTY_ALPHA)
}

/// Fill-tolerance test: Chebyshev distance over B,G,R,A in byte units.
/// Colors straddling the empty-alpha boundary never match.
pub fn similar_rgba(c: u32, seed: u32, tolerance: u8) -> bool {
    if !same_empty_side(c, seed) {
        return false;
    }
    let a = c.to_le_bytes();
    let b = seed.to_le_bytes();
    let dist = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| x.abs_diff(y))
        .max()
        .unwrap_or(0);
    dist <= tolerance
}

/// `clamp(1 - d/r, 0, 1) ^ max(gamma, 0.05)`; 1 at the center, 0 at or beyond `radius`.
pub fn radial_falloff(distance: f32, radius: f32, gamma: f32) -> f32 {
    if radius <= 0.0 {
        return if distance <= 0.0 { 1.0 } else { 0.0 };
    }
    let base = (1.0 - distance / radius).clamp(0.0, 1.0);
    base.powf(gamma.max(0.05))
}

/// Parse `RRGGBB` / `AARRGGBB` hex (optional leading `#`) into packed form.
pub fn parse_hex(s: &str) -> Option<u32> {
    let s = s.trim_start_matches('#');
    let v = u32::from_str_radix(s, 16).ok()?;
    match s.len() {
        6 => Some(0xFF00_0000 | v),
        8 => Some(v),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_round_trip() {
        let c = pack(0x11, 0x22, 0x33, 0x44);
        assert_eq!(c, 0x4433_2211);
        assert_eq!(unpack(c), (0x11, 0x22, 0x33, 0x44));
        assert_eq!(from_bgra_bytes(&to_bgra_bytes(c)), c);
        assert_eq!(to_bgra_bytes(c), [0x11, 0x22, 0x33, 0x44]);
    }

    #[test]
    fn test_blend_over_fast_exits() {
        let dst = 0xFF12_3456;
        assert_eq!(blend_over(dst, 0x00FF_FFFF), dst);
        assert_eq!(blend_over(dst, 0xFFAB_CDEF), 0xFFAB_CDEF);
    }

    #[test]
    fn test_blend_over_transparent_destination_keeps_source_rgb() {
        for src in [0x80FF_0000u32, 0x0100_FF00, 0xFE12_3456, 0x3300_00FF] {
            let out = blend_over(0x00AB_CDEF, src);
            assert_eq!(alpha(out), alpha(src));
            assert_eq!(rgb(out), rgb(src));
        }
    }

    #[test]
    fn test_blend_over_half_red_on_opaque_blue() {
        let out = blend_over(0xFF00_00FF, 0x80FF_0000);
        let (b, g, r, a) = unpack(out);
        assert_eq!(a, 255);
        assert_eq!(g, 0);
        assert!((127..=129).contains(&r));
        assert!((126..=128).contains(&b));
    }

    #[test]
    fn test_similar_rgba_tolerance() {
        assert!(similar_rgba(0xFF10_1010, 0xFF10_1010, 0));
        assert!(similar_rgba(0xFF10_1015, 0xFF10_1010, 5));
        assert!(!similar_rgba(0xFF10_1016, 0xFF10_1010, 5));
        assert!(!similar_rgba(0xF010_1010, 0xFF10_1010, 10));
    }

    #[test]
    fn test_similar_rgba_never_crosses_empty_boundary() {
        // Same RGB, one empty, one visible: never similar, even at max tolerance.
        assert!(!similar_rgba(0x0800_0000, 0x0900_0000, 255));
        assert!(!similar_rgba(0xFF00_0000, 0x0000_0000, 255));
        // Both empty: still measured by distance.
        assert!(similar_rgba(0x0000_0000, 0x0000_0000, 0));
        assert!(!similar_rgba(0x08FF_0000, 0x0000_0000, 0));
        assert!(similar_rgba(0x0805_0000, 0x0000_0000, 8));
    }

    #[test]
    fn test_radial_falloff() {
        assert_eq!(radial_falloff(0.0, 4.0, 1.0), 1.0);
        assert_eq!(radial_falloff(4.0, 4.0, 1.0), 0.0);
        assert_eq!(radial_falloff(6.0, 4.0, 2.0), 0.0);
        assert!((radial_falloff(2.0, 4.0, 1.0) - 0.5).abs() < 1e-6);
        assert!((radial_falloff(2.0, 4.0, 2.0) - 0.25).abs() < 1e-6);
        // gamma floor
        assert_eq!(radial_falloff(2.0, 4.0, 0.0), radial_falloff(2.0, 4.0, 0.05));
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#FF0000"), Some(0xFFFF_0000));
        assert_eq!(parse_hex("80112233"), Some(0x8011_2233));
        assert_eq!(parse_hex("xyz"), None);
    }
}

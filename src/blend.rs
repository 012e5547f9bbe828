use serde::{Deserialize, Serialize};

/// Per-channel formula used when compositing a layer over what is below it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Add,
    Subtract,
    Difference,
    Darken,
    Lighten,
    Screen,
    Overlay,
    HardLight,
    Invert,
}

impl BlendMode {
    /// Returns all blend modes in display order
    pub fn all() -> &'static [BlendMode] {
        &[
            BlendMode::Normal,
            BlendMode::Multiply,
            BlendMode::Add,
            BlendMode::Subtract,
            BlendMode::Difference,
            BlendMode::Darken,
            BlendMode::Lighten,
            BlendMode::Screen,
            BlendMode::Overlay,
            BlendMode::HardLight,
            BlendMode::Invert,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlendMode::Normal => "Normal",
            BlendMode::Multiply => "Multiply",
            BlendMode::Add => "Add",
            BlendMode::Subtract => "Subtract",
            BlendMode::Difference => "Difference",
            BlendMode::Darken => "Darken",
            BlendMode::Lighten => "Lighten",
            BlendMode::Screen => "Screen",
            BlendMode::Overlay => "Overlay",
            BlendMode::HardLight => "Hard Light",
            BlendMode::Invert => "Invert",
        }
    }

    /// Stable u8 for compact storage
    pub fn to_u8(&self) -> u8 {
        match self {
            BlendMode::Normal => 0,
            BlendMode::Multiply => 1,
            BlendMode::Add => 2,
            BlendMode::Subtract => 3,
            BlendMode::Difference => 4,
            BlendMode::Darken => 5,
            BlendMode::Lighten => 6,
            BlendMode::Screen => 7,
            BlendMode::Overlay => 8,
            BlendMode::HardLight => 9,
            BlendMode::Invert => 10,
        }
    }

    /// Reconstruct from a u8 (defaults to Normal for unknown values)
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => BlendMode::Multiply,
            2 => BlendMode::Add,
            3 => BlendMode::Subtract,
            4 => BlendMode::Difference,
            5 => BlendMode::Darken,
            6 => BlendMode::Lighten,
            7 => BlendMode::Screen,
            8 => BlendMode::Overlay,
            9 => BlendMode::HardLight,
            10 => BlendMode::Invert,
            _ => BlendMode::Normal,
        }
    }

    /// Blended channel value in 0..1 space. `base` is the destination,
    /// `top` the source; alpha is handled by the caller.
    #[inline]
    pub fn channel(self, base: f32, top: f32) -> f32 {
        match self {
            BlendMode::Normal => top,
            BlendMode::Multiply => base * top,
            BlendMode::Add => (base + top).min(1.0),
            BlendMode::Subtract => (base - top).max(0.0),
            BlendMode::Difference => (base - top).abs(),
            BlendMode::Darken => base.min(top),
            BlendMode::Lighten => base.max(top),
            BlendMode::Screen => 1.0 - (1.0 - base) * (1.0 - top),
            BlendMode::Overlay => overlay_channel(base, top),
            BlendMode::HardLight => overlay_channel(top, base),
            BlendMode::Invert => 1.0 - base,
        }
    }
}

fn overlay_channel(base: f32, top: f32) -> f32 {
    if base < 0.5 {
        2.0 * base * top
    } else {
        1.0 - 2.0 * (1.0 - base) * (1.0 - top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_u8_round_trip() {
        for &mode in BlendMode::all() {
            assert_eq!(BlendMode::from_u8(mode.to_u8()), mode);
        }
        assert_eq!(BlendMode::from_u8(200), BlendMode::Normal);
    }

    #[test]
    fn test_channel_formulas() {
        assert!(approx_eq(BlendMode::Normal.channel(0.2, 0.7), 0.7));
        assert!(approx_eq(BlendMode::Multiply.channel(0.5, 0.5), 0.25));
        assert!(approx_eq(BlendMode::Add.channel(0.8, 0.5), 1.0));
        assert!(approx_eq(BlendMode::Subtract.channel(0.3, 0.5), 0.0));
        assert!(approx_eq(BlendMode::Difference.channel(0.3, 0.5), 0.2));
        assert!(approx_eq(BlendMode::Darken.channel(0.3, 0.5), 0.3));
        assert!(approx_eq(BlendMode::Lighten.channel(0.3, 0.5), 0.5));
        assert!(approx_eq(BlendMode::Screen.channel(0.5, 0.5), 0.75));
        assert!(approx_eq(BlendMode::Invert.channel(0.25, 0.9), 0.75));
    }

    #[test]
    fn test_overlay_and_hard_light_are_mirrored() {
        assert!(approx_eq(BlendMode::Overlay.channel(0.25, 0.5), 0.25));
        assert!(approx_eq(BlendMode::HardLight.channel(0.5, 0.25), 0.25));
        assert!(approx_eq(BlendMode::Overlay.channel(0.75, 0.5), 0.75));
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&BlendMode::HardLight).unwrap();
        assert_eq!(json, "\"hard_light\"");
    }
}

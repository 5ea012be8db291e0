//! HSL Colour
//!
//! Cell colours are kept in HSL so a round can vary lightness alone
//! while hue and saturation stay identical across the grid.

use std::fmt;
use serde::{Serialize, Deserialize};

/// Colour in HSL space.
///
/// Hue is in degrees `[0, 360)`, saturation and lightness are percentages
/// `[0, 100]`.
#[derive(Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Hsl {
    /// Hue in degrees
    pub hue: f64,
    /// Saturation percentage
    pub saturation: f64,
    /// Lightness percentage
    pub lightness: f64,
}

impl Hsl {
    /// Create a colour from raw components.
    #[inline]
    pub const fn new(hue: f64, saturation: f64, lightness: f64) -> Self {
        Self { hue, saturation, lightness }
    }

    /// Same hue and saturation, lightness shifted down by `delta`.
    ///
    /// Not clamped: callers rely on the colour-delta table keeping the
    /// result inside `[0, 100]`.
    #[inline]
    pub fn darkened(self, delta: f64) -> Self {
        Self {
            lightness: self.lightness - delta,
            ..self
        }
    }

    /// True if both colours share hue and saturation exactly.
    #[inline]
    pub fn same_chroma(&self, other: &Self) -> bool {
        self.hue == other.hue && self.saturation == other.saturation
    }

    /// Whether every component lies in its nominal range.
    pub fn is_valid(&self) -> bool {
        (0.0..360.0).contains(&self.hue)
            && (0.0..=100.0).contains(&self.saturation)
            && (0.0..=100.0).contains(&self.lightness)
    }

    /// Convert to 8-bit RGB.
    pub fn to_rgb(self) -> [u8; 3] {
        let s = (self.saturation / 100.0).clamp(0.0, 1.0);
        let l = (self.lightness / 100.0).clamp(0.0, 1.0);
        let h = self.hue.rem_euclid(360.0) / 60.0;

        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let m = l - c / 2.0;

        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };

        [to_channel(r + m), to_channel(g + m), to_channel(b + m)]
    }

    /// `#rrggbb` form for UI layers.
    pub fn to_hex(self) -> String {
        format!("#{}", hex::encode(self.to_rgb()))
    }
}

#[inline]
fn to_channel(v: f64) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

impl fmt::Debug for Hsl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hsl({:.1}, {:.1}%, {:.1}%)", self.hue, self.saturation, self.lightness)
    }
}

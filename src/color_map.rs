//! Scalar-to-color mapping shared by plot markers and box overlays.
//!
//! A z value is normalized against the current z domain and looked up on a
//! fixed perceptually-ordered scale (viridis). Using the same table for the
//! plot and the image overlay makes a given z value look identical in both.

use serde::{Deserialize, Serialize};

/// An RGBA color with channels in 0.0-1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color from 8-bit channels.
    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0)
    }

    pub const fn from_array(rgba: [f32; 4]) -> Self {
        Self::new(rgba[0], rgba[1], rgba[2], rgba[3])
    }

    /// Convert to 8-bit RGBA.
    pub fn to_rgba8(self) -> [u8; 4] {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [channel(self.r), channel(self.g), channel(self.b), channel(self.a)]
    }

    /// `#rrggbb` notation, as used by plotting front ends.
    pub fn to_hex(self) -> String {
        let [r, g, b, _] = self.to_rgba8();
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    fn lerp(self, other: Color, t: f32) -> Color {
        Color::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
            self.a + (other.a - self.a) * t,
        )
    }
}

/// A control point of the color scale.
#[derive(Debug, Clone, Copy)]
pub struct ColorStop {
    pub position: f32,
    pub color: Color,
}

const fn stop(position: f32, r: u8, g: u8, b: u8) -> ColorStop {
    ColorStop {
        position,
        color: Color::from_rgb8(r, g, b),
    }
}

/// Viridis control points, ordered by position.
pub const VIRIDIS: [ColorStop; 10] = [
    stop(0.0, 68, 1, 84),
    stop(1.0 / 9.0, 72, 40, 120),
    stop(2.0 / 9.0, 62, 73, 137),
    stop(3.0 / 9.0, 49, 104, 142),
    stop(4.0 / 9.0, 38, 130, 142),
    stop(5.0 / 9.0, 31, 158, 137),
    stop(6.0 / 9.0, 53, 183, 121),
    stop(7.0 / 9.0, 110, 206, 88),
    stop(8.0 / 9.0, 181, 222, 43),
    stop(1.0, 253, 231, 37),
];

/// Normalized position of `z` on the scale, or `None` when it can't be placed.
pub fn scale_position(z: Option<f64>, z_min: f64, z_max: f64) -> Option<f32> {
    let z = z.filter(|z| z.is_finite())?;
    if z_min == z_max || !z_min.is_finite() || !z_max.is_finite() {
        return None;
    }
    Some(((z - z_min) / (z_max - z_min)).clamp(0.0, 1.0) as f32)
}

/// Color at position `t` (0-1), interpolated between the two nearest stops.
pub fn sample(t: f32) -> Color {
    let t = t.clamp(0.0, 1.0);
    for pair in VIRIDIS.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if t <= hi.position {
            let span = hi.position - lo.position;
            let local = if span > 0.0 { (t - lo.position) / span } else { 0.0 };
            return lo.color.lerp(hi.color, local);
        }
    }
    VIRIDIS[VIRIDIS.len() - 1].color
}

/// Map `z` onto the scale, returning `fallback` when `z` is absent or the
/// domain is degenerate.
pub fn color(z: Option<f64>, z_min: f64, z_max: f64, fallback: Color) -> Color {
    match scale_position(z, z_min, z_max) {
        Some(t) => sample(t),
        None => fallback,
    }
}

/// The z range of the currently visible z-bearing entities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZDomain {
    pub min: f64,
    pub max: f64,
}

impl ZDomain {
    /// Min/max over the present, finite values. `None` if there are none.
    pub fn from_values(values: impl IntoIterator<Item = Option<f64>>) -> Option<Self> {
        values
            .into_iter()
            .flatten()
            .filter(|z| z.is_finite())
            .fold(None, |domain: Option<ZDomain>, z| {
                Some(match domain {
                    Some(d) => ZDomain {
                        min: d.min.min(z),
                        max: d.max.max(z),
                    },
                    None => ZDomain { min: z, max: z },
                })
            })
    }

    pub fn color(&self, z: Option<f64>, fallback: Color) -> Color {
        color(z, self.min, self.max, fallback)
    }
}

/// Color `z` in an optional domain; no domain means everything falls back.
pub fn color_in(domain: Option<ZDomain>, z: Option<f64>, fallback: Color) -> Color {
    domain.map_or(fallback, |d| d.color(z, fallback))
}

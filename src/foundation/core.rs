pub use kurbo::{Affine, BezPath, Point, Rect, Size, Vec2};

use crate::foundation::math::lerp_f32;

/// Straight-alpha RGBA color with `f32` channels in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Color {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    pub a: f32,
}

impl Color {
    /// Opaque white; the neutral tint.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    /// Opaque black.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Build from straight-alpha channels.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Build from straight RGBA8.
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            f32::from(a) / 255.0,
        )
    }

    /// Quantize to straight RGBA8. Non-finite channels map to 0.
    pub fn to_rgba8(self) -> [u8; 4] {
        fn q(c: f32) -> u8 {
            if !c.is_finite() {
                return 0;
            }
            (c.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    /// Per-channel blend from `a` to `b`.
    pub fn lerp(a: Self, b: Self, t: f32) -> Self {
        Self::new(
            lerp_f32(a.r, b.r, t),
            lerp_f32(a.g, b.g, t),
            lerp_f32(a.b, b.b, t),
            lerp_f32(a.a, b.a, t),
        )
    }

    /// Multiply the color channels (not alpha) by `k`.
    pub fn scale_rgb(self, k: f32) -> Self {
        Self::new(self.r * k, self.g * k, self.b * k, self.a)
    }

    /// True when the color quantizes to opaque white, i.e. tinting with it is a no-op.
    pub fn is_white(self) -> bool {
        self.to_rgba8() == [255, 255, 255, 255]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// A rect is empty when it has no area or is not finite.
pub fn rect_is_empty(r: Rect) -> bool {
    !(r.x0.is_finite() && r.y0.is_finite() && r.x1.is_finite() && r.y1.is_finite())
        || r.width() <= 0.0
        || r.height() <= 0.0
}

/// Union that ignores empty rects on either side.
pub fn union_bounds(acc: Option<Rect>, r: Rect) -> Option<Rect> {
    if rect_is_empty(r) {
        return acc;
    }
    Some(match acc {
        Some(a) => a.union(r),
        None => r,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;

//! 8-bit RGBA colour shared by palettes, meshes and framebuffers.

use serde::{Deserialize, Serialize};

/// Straight (non-premultiplied) 8-bit RGBA colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::opaque(0, 0, 0);
    pub const WHITE: Rgba = Rgba::opaque(255, 255, 255);
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Uniform grey
    pub const fn grey(value: u8) -> Self {
        Self::opaque(value, value, value)
    }

    /// Linear interpolation, `t` clamped to [0, 1]
    pub fn lerp(self, other: Rgba, t: f32) -> Rgba {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (f32::from(a) * (1.0 - t) + f32::from(b) * t).round() as u8;
        Rgba::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }

    /// Add `delta` to each colour channel, saturating. Alpha is kept.
    pub fn shade(self, delta: i16) -> Rgba {
        let apply = |c: u8| (i16::from(c) + delta).clamp(0, 255) as u8;
        Rgba::new(apply(self.r), apply(self.g), apply(self.b), self.a)
    }

    /// Component-wise multiply by a float tint in [0, 1]
    pub fn tinted(self, tint: [f32; 4]) -> Rgba {
        let apply = |c: u8, t: f32| (f32::from(c) * t.clamp(0.0, 1.0)).round() as u8;
        Rgba::new(
            apply(self.r, tint[0]),
            apply(self.g, tint[1]),
            apply(self.b, tint[2]),
            apply(self.a, tint[3]),
        )
    }

    /// Normalised `[r, g, b, a]` for GPU uploads
    pub fn to_f32(self) -> [f32; 4] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
            f32::from(self.a) / 255.0,
        ]
    }

    /// Source-over blend of `self` onto `dst`
    pub fn blend_over(self, dst: Rgba) -> Rgba {
        let alpha = u16::from(self.a);
        let channel = |src: u8, dst: u8| {
            let value = u16::from(src) * alpha + u16::from(dst) * (255 - alpha);
            ((value + 1 + (value >> 8)) >> 8) as u8
        };
        Rgba::new(
            channel(self.r, dst.r),
            channel(self.g, dst.g),
            channel(self.b, dst.b),
            self.a.max(dst.a),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_endpoints() {
        let red = Rgba::opaque(180, 30, 0);
        let ash = Rgba::grey(50);
        assert_eq!(red.lerp(ash, 0.0), red);
        assert_eq!(red.lerp(ash, 1.0), ash);
        assert_eq!(red.lerp(ash, 7.0), ash);
    }

    #[test]
    fn test_blend_opaque_and_transparent() {
        let dst = Rgba::opaque(10, 20, 30);
        assert_eq!(Rgba::opaque(200, 100, 50).blend_over(dst), Rgba::opaque(200, 100, 50));
        assert_eq!(Rgba::TRANSPARENT.blend_over(dst), dst);
    }

    #[test]
    fn test_shade_saturates() {
        let c = Rgba::opaque(250, 3, 100).shade(10);
        assert_eq!(c, Rgba::opaque(255, 13, 110));
        assert_eq!(Rgba::opaque(2, 2, 2).shade(-5), Rgba::opaque(0, 0, 0));
    }
}

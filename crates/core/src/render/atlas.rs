//! Procedural sprite atlas.
//!
//! No image assets ship with the core, so every atlas slot is drawn from a
//! small shape function of the texture coordinate. `v` runs from 0 at the
//! base of the quad to 1 at the top. Both backends sample the same shapes:
//! the software backend calls [`sprite_texel`] per pixel and the GPU backend
//! bakes [`build_atlas`] into a texture once.

use crate::core_types::Rgba;
use crate::projection::ATLAS_FRAMES;

const TRUNK: Rgba = Rgba::opaque(92, 60, 30);
const CANOPY: Rgba = Rgba::opaque(30, 110, 40);
const CHAR: Rgba = Rgba::opaque(38, 32, 28);
const GRASS: Rgba = Rgba::opaque(70, 150, 40);
const WALL: Rgba = Rgba::opaque(200, 180, 140);
const ROOF: Rgba = Rgba::opaque(140, 40, 25);
const FLAME_CORE: Rgba = Rgba::opaque(255, 220, 90);
const FLAME_EDGE: Rgba = Rgba::new(220, 60, 10, 200);
const ASH: Rgba = Rgba::new(60, 58, 55, 210);

/// Pixel width and height of one slot in the baked atlas
pub const ATLAS_FRAME_PIXELS: u32 = 32;

fn tree(u: f32, v: f32, canopy: Option<Rgba>, canopy_scale: f32) -> Rgba {
    let du = (u - 0.5).abs();
    if v < 0.3 && du < 0.06 {
        return TRUNK;
    }
    if let Some(color) = canopy {
        let top = 0.25 + 0.75 * canopy_scale;
        if (0.25..=top).contains(&v) && du < (top - v) / (top - 0.25) * 0.45 * canopy_scale {
            return color;
        }
    }
    Rgba::TRANSPARENT
}

fn burning_tree(u: f32, v: f32, frame: u16) -> Rgba {
    let heat = f32::from(frame) / 2.0;
    let canopy = FLAME_CORE.lerp(FLAME_EDGE, heat);
    let flicker = ((u * 17.0 + f32::from(frame) * 2.3).sin() * 0.5 + 0.5) * 0.15;
    match tree(u, v, Some(canopy), 1.0 - heat * 0.35 - flicker) {
        color if color == TRUNK => TRUNK.lerp(CHAR, heat),
        color => color,
    }
}

fn burnt_tree(u: f32, v: f32) -> Rgba {
    let du = (u - 0.5).abs();
    let branch = v > 0.45 && v < 0.75 && (du - (v - 0.45)).abs() < 0.04;
    if (v < 0.8 && du < 0.05) || branch {
        CHAR
    } else {
        Rgba::TRANSPARENT
    }
}

fn grass(u: f32, v: f32) -> Rgba {
    let blade = (u * 5.0).fract();
    let height = 0.6 + 0.4 * ((u * 5.0).floor() * 1.7).sin().abs();
    if (blade - 0.5).abs() < 0.18 * (1.0 - v / height) && v < height {
        GRASS
    } else {
        Rgba::TRANSPARENT
    }
}

fn house(u: f32, v: f32, burnt: bool) -> Rgba {
    let wall = (0.15..0.85).contains(&u) && v < 0.6;
    if burnt {
        // broken wall line, no roof
        let ragged = 0.35 + 0.2 * (u * 23.0).sin().abs();
        return if wall && v < ragged { CHAR } else { Rgba::TRANSPARENT };
    }
    if wall {
        let door = (0.42..0.58).contains(&u) && v < 0.3;
        return if door { TRUNK } else { WALL };
    }
    if v >= 0.6 && (u - 0.5).abs() < (1.0 - v) / 0.4 * 0.45 {
        return ROOF;
    }
    Rgba::TRANSPARENT
}

fn flame(u: f32, v: f32, frame: u16) -> Rgba {
    let phase = f32::from(frame) * std::f32::consts::FRAC_PI_2;
    let sway = (v * 6.0 + phase).sin() * 0.06 * v;
    let du = (u - 0.5 - sway).abs();
    let width = 0.42 * (1.0 - v).max(0.0).sqrt() * (1.0 - 0.1 * (phase + u * 9.0).cos());
    if v >= 1.0 || du >= width {
        return Rgba::TRANSPARENT;
    }
    FLAME_CORE.lerp(FLAME_EDGE, (du / width).max(v))
}

fn ash(u: f32, v: f32) -> Rgba {
    let dx = (u - 0.5) / 0.5;
    let dy = (v - 0.3) / 0.3;
    if dx * dx + dy * dy <= 1.0 {
        ASH
    } else {
        Rgba::TRANSPARENT
    }
}

/// Colour of atlas slot `index` at texture coordinate `(u, v)`.
///
/// Coordinates outside the unit square and unknown slots are transparent.
pub fn sprite_texel(index: u16, u: f32, v: f32) -> Rgba {
    if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
        return Rgba::TRANSPARENT;
    }
    match index {
        0 => tree(u, v, Some(CANOPY), 1.0),
        1..=3 => burning_tree(u, v, index - 1),
        4 => burnt_tree(u, v),
        5 => grass(u, v),
        6 => house(u, v, false),
        7 => house(u, v, true),
        8..=11 => flame(u, v, index - 8),
        12 => ash(u, v),
        _ => Rgba::TRANSPARENT,
    }
}

/// Bake every slot into one horizontal strip, rows top to bottom.
///
/// # Returns
/// `(width, height, pixels)` with `ATLAS_FRAMES * frame_pixels` columns.
pub fn build_atlas(frame_pixels: u32) -> (u32, u32, Vec<Rgba>) {
    let frame_pixels = frame_pixels.max(1);
    let width = u32::from(ATLAS_FRAMES) * frame_pixels;
    let height = frame_pixels;
    let mut pixels = Vec::with_capacity((width * height) as usize);
    for row in 0..height {
        let v = 1.0 - (row as f32 + 0.5) / height as f32;
        for column in 0..width {
            let frame = (column / frame_pixels) as u16;
            let u = ((column % frame_pixels) as f32 + 0.5) / frame_pixels as f32;
            pixels.push(sprite_texel(frame, u, v));
        }
    }
    (width, height, pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_slot_draws_something() {
        for index in 0..ATLAS_FRAMES {
            let opaque = (0..16)
                .flat_map(|i| (0..16).map(move |j| (i, j)))
                .filter(|&(i, j)| {
                    let texel = sprite_texel(index, (i as f32 + 0.5) / 16.0, (j as f32 + 0.5) / 16.0);
                    texel.a > 0
                })
                .count();
            assert!(opaque > 0, "slot {index} is empty");
        }
        assert_eq!(sprite_texel(ATLAS_FRAMES, 0.5, 0.5), Rgba::TRANSPARENT);
    }

    #[test]
    fn test_tree_trunk_at_base() {
        assert_eq!(sprite_texel(0, 0.5, 0.1), TRUNK);
        assert_eq!(sprite_texel(0, 0.02, 0.1), Rgba::TRANSPARENT);
        assert_eq!(sprite_texel(0, 0.5, 0.5), CANOPY);
    }

    #[test]
    fn test_fire_frames_differ() {
        let (width, height, pixels) = build_atlas(8);
        assert_eq!(width, u32::from(ATLAS_FRAMES) * 8);
        assert_eq!(pixels.len(), (width * height) as usize);
        let column = |frame: usize| -> Vec<Rgba> {
            (0..8usize)
                .flat_map(|row| (0..8usize).map(move |c| (row, c)))
                .map(|(row, c)| pixels[row * width as usize + frame * 8 + c])
                .collect()
        };
        assert_ne!(column(8), column(9));
    }
}

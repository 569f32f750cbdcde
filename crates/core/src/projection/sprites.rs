//! Sprite kinds and the atlas lookup table.
//!
//! Atlas layout (one frame per slot):
//!
//! | slots | content |
//! |-------|---------|
//! | 0     | tree |
//! | 1-3   | tree burning |
//! | 4     | burnt tree |
//! | 5     | grass tuft |
//! | 6     | house |
//! | 7     | burnt house |
//! | 8-11  | fire (looping) |
//! | 12    | ash patch |

use crate::config::SpriteConfig;
use crate::core_types::{CombustionState, TerrainClass};
use serde::{Deserialize, Serialize};

/// Number of frames in the sprite atlas
pub const ATLAS_FRAMES: u16 = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpriteKind {
    Tree,
    Grass,
    House,
    FireParticle,
    Ash,
}

/// How a quad turns towards the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FacingMode {
    /// Full rotation, the quad normal points straight at the camera
    Spherical,
    /// Rotation about world Y only, the quad stays upright
    Cylindrical,
}

/// Static description of a sprite kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteInfo {
    pub kind: SpriteKind,
    pub facing: FacingMode,
    /// Quad width and height in cells
    pub size: [f32; 2],
    pub base_frame: u16,
    pub frame_count: u16,
    /// Loop the frames while burning instead of holding the last one
    pub looping: bool,
}

/// One entry per [`SpriteKind`], in declaration order
pub static SPRITE_TABLE: [SpriteInfo; 5] = [
    SpriteInfo {
        kind: SpriteKind::Tree,
        facing: FacingMode::Cylindrical,
        size: [2.5, 3.5],
        base_frame: 0,
        frame_count: 5,
        looping: false,
    },
    SpriteInfo {
        kind: SpriteKind::Grass,
        facing: FacingMode::Cylindrical,
        size: [0.8, 0.8],
        base_frame: 5,
        frame_count: 1,
        looping: false,
    },
    SpriteInfo {
        kind: SpriteKind::House,
        facing: FacingMode::Cylindrical,
        size: [1.8, 1.8],
        base_frame: 6,
        frame_count: 2,
        looping: false,
    },
    SpriteInfo {
        kind: SpriteKind::FireParticle,
        facing: FacingMode::Spherical,
        size: [1.0, 1.2],
        base_frame: 8,
        frame_count: 4,
        looping: true,
    },
    SpriteInfo {
        kind: SpriteKind::Ash,
        facing: FacingMode::Cylindrical,
        size: [0.9, 0.3],
        base_frame: 12,
        frame_count: 1,
        looping: false,
    },
];

impl SpriteKind {
    #[inline]
    pub fn info(self) -> &'static SpriteInfo {
        &SPRITE_TABLE[self as usize]
    }
}

/// Sprite drawn for a cell, if any.
///
/// Grass and field cells lose their ash patch once it is older than
/// `config.ash_visible_ticks`. Water never has a sprite.
pub fn sprite_for(
    class: TerrainClass,
    state: CombustionState,
    age: u64,
    config: &SpriteConfig,
) -> Option<SpriteKind> {
    use CombustionState::{Ash, Burning, Igniting, Unburnt};
    match (class, state) {
        (TerrainClass::Water, _) => None,
        (TerrainClass::Forest, _) => Some(SpriteKind::Tree),
        (TerrainClass::House, Burning)
        | (TerrainClass::Grassland | TerrainClass::Field, Igniting | Burning) => {
            Some(SpriteKind::FireParticle)
        }
        (TerrainClass::House, Unburnt | Igniting | Ash) => Some(SpriteKind::House),
        (TerrainClass::Grassland | TerrainClass::Field, Unburnt) => Some(SpriteKind::Grass),
        (TerrainClass::Grassland | TerrainClass::Field, Ash) => {
            (age < config.ash_visible_ticks).then_some(SpriteKind::Ash)
        }
    }
}

/// Atlas slot for a sprite in a given state and age.
///
/// Pure function of its arguments. Burning trees step through their burning
/// frames and hold the last one, fire loops, ash is static.
pub fn atlas_index(kind: SpriteKind, state: CombustionState, age: u64, ticks_per_frame: u32) -> u16 {
    let info = kind.info();
    let step = age / u64::from(ticks_per_frame.max(1));
    match kind {
        SpriteKind::Tree => match state {
            CombustionState::Unburnt => info.base_frame,
            CombustionState::Igniting => info.base_frame + 1,
            CombustionState::Burning => info.base_frame + 1 + step.min(2) as u16,
            CombustionState::Ash => info.base_frame + info.frame_count - 1,
        },
        SpriteKind::House => match state {
            CombustionState::Ash => info.base_frame + 1,
            _ => info.base_frame,
        },
        SpriteKind::FireParticle => {
            let frame = if info.looping {
                step % u64::from(info.frame_count)
            } else {
                step.min(u64::from(info.frame_count - 1))
            };
            info.base_frame + frame as u16
        }
        SpriteKind::Grass | SpriteKind::Ash => info.base_frame,
    }
}

//! Math type aliases for world positions, orientations and transforms.

use nalgebra::{Matrix4, UnitQuaternion, Vector3};

/// 3D vector type for positions, directions and sizes.
///
/// This is a simple alias for `nalgebra::Vector3<f32>`, used throughout
/// the crate for world positions, camera vectors and billboard corners.
/// The world is Y-up: the terrain lies in the XZ plane.
pub type Vec3 = Vector3<f32>;

/// Rotation applied to billboard quads.
pub type Quat = UnitQuaternion<f32>;

/// Homogeneous 4x4 transform (view, projection, view-projection).
pub type Mat4 = Matrix4<f32>;

//! Camera pose consumed by the projector and the renderer, plus the default
//! orbit controller driven by drag and scroll input.

use crate::core_types::{Mat4, Vec3};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// A perspective camera in world space (Y up)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraPose {
    fn default() -> Self {
        OrbitCamera::default().pose()
    }
}

impl CameraPose {
    /// Camera looking from `eye` at `target` with the default lens
    pub fn looking_at(eye: Vec3, target: Vec3) -> Self {
        Self {
            eye,
            target,
            up: Vec3::y(),
            fov_y: 45f32.to_radians(),
            near: 0.1,
            far: 500.0,
        }
    }

    /// Unit view direction, falls back to -Z for a degenerate pose
    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| -Vec3::z())
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(
            &Point3::from(self.eye),
            &Point3::from(self.target),
            &self.up,
        )
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::new_perspective(aspect.max(f32::EPSILON), self.fov_y, self.near, self.far)
    }

    /// Clip-from-world transform for a viewport of the given aspect ratio
    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection(aspect) * self.view()
    }

    /// World-space ray through the centre of screen pixel `pixel`.
    ///
    /// # Returns
    /// `(origin, unit direction)`, or `None` for a degenerate viewport or pose.
    pub fn ray_through(&self, viewport: (u32, u32), pixel: (f32, f32)) -> Option<(Vec3, Vec3)> {
        let (width, height) = viewport;
        if width == 0 || height == 0 {
            return None;
        }
        let aspect = width as f32 / height as f32;
        let inverse = self.view_projection(aspect).try_inverse()?;

        let ndc_x = (pixel.0 + 0.5) / width as f32 * 2.0 - 1.0;
        let ndc_y = 1.0 - (pixel.1 + 0.5) / height as f32 * 2.0;
        let near = inverse.transform_point(&Point3::new(ndc_x, ndc_y, -1.0));
        let far = inverse.transform_point(&Point3::new(ndc_x, ndc_y, 1.0));
        let direction = (far - near).try_normalize(f32::EPSILON)?;
        Some((near.coords, direction))
    }
}

/// Orbit controller around a target point.
///
/// Angles are in degrees to keep config files readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub yaw_degrees: f32,
    /// Positive pitch looks down on the map
    pub pitch_degrees: f32,
    pub distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Degrees per pixel of drag
    pub drag_sensitivity: f32,
    /// Distance change per scroll step
    pub zoom_step: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::zeros(),
            yaw_degrees: 45.0,
            pitch_degrees: 30.0,
            distance: 150.0,
            min_distance: 20.0,
            max_distance: 400.0,
            drag_sensitivity: 0.2,
            zoom_step: 10.0,
        }
    }
}

impl OrbitCamera {
    pub fn apply_drag(&mut self, delta: (f32, f32)) {
        self.yaw_degrees = (self.yaw_degrees + delta.0 * self.drag_sensitivity).rem_euclid(360.0);
        self.pitch_degrees = (self.pitch_degrees + delta.1 * self.drag_sensitivity).clamp(5.0, 89.0);
    }

    /// Positive scroll zooms in
    pub fn apply_scroll(&mut self, delta: f32) {
        self.distance =
            (self.distance - delta * self.zoom_step).clamp(self.min_distance, self.max_distance);
    }

    pub fn pose(&self) -> CameraPose {
        let yaw = self.yaw_degrees.to_radians();
        let pitch = self.pitch_degrees.to_radians();
        let offset = Vec3::new(
            -self.distance * pitch.cos() * yaw.sin(),
            self.distance * pitch.sin(),
            self.distance * pitch.cos() * yaw.cos(),
        );
        CameraPose::looking_at(self.target + offset, self.target)
    }
}

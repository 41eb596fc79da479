//! Orbit camera around the particle field.

use glam::{Mat4, Vec2, Vec3};

use crate::driver::DriverState;
use crate::render::ViewProjection;

/// Idle auto-rotation in radians per second (one turn every two minutes).
pub const AUTO_ROTATE_SPEED: f32 = std::f32::consts::TAU / 120.0;

const MIN_DISTANCE: f32 = 5.0;
const MAX_DISTANCE: f32 = 20.0;
const PITCH_LIMIT: f32 = 1.5;

/// Orbit camera for viewing the particle field.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Horizontal rotation angle in radians.
    pub yaw: f32,
    /// Vertical rotation angle in radians.
    pub pitch: f32,
    /// Distance from the target point, kept in `[5, 20]`.
    pub distance: f32,
    /// Point the camera orbits around.
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub fov_y: f32,
}

impl Camera {
    /// Camera on the +Z axis, 12 units out, facing the field.
    pub fn new() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            distance: 12.0,
            target: Vec3::ZERO,
            fov_y: 50.0,
        }
    }

    /// Calculate the camera's world position.
    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        self.target + Vec3::new(x, y, z)
    }

    /// Calculate the view matrix for rendering.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y.to_radians(), aspect, 0.1, 100.0)
    }

    /// Matrices for a render target of `width`×`height` pixels.
    pub fn view_projection(&self, width: u32, height: u32) -> ViewProjection {
        let viewport = Vec2::new(width.max(1) as f32, height.max(1) as f32);
        ViewProjection {
            view: self.view_matrix(),
            proj: self.projection_matrix(viewport.x / viewport.y),
            viewport,
        }
    }

    /// Rotate by a mouse drag, in radians.
    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw += delta_yaw;
        self.pitch = (self.pitch + delta_pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Move closer (positive) or further away (negative).
    pub fn zoom(&mut self, amount: f32) {
        self.distance = (self.distance - amount).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    /// Advance idle motion: the camera turns slowly until a field source attaches.
    pub fn update(&mut self, dt: f32, state: DriverState) {
        if state == DriverState::Idle {
            self.yaw += AUTO_ROTATE_SPEED * dt;
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

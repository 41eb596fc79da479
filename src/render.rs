//! Render pass model: point placement, sizing, colouring and sprite shape.
//!
//! The WGSL render shader implements exactly these functions. Keeping them on
//! the host as well lets the headless backend produce the same point list the
//! GPU would rasterize.
//!
//! - size: `base_size * distance_scale / -view_z` pixels
//! - colour: `mix(far, near, smoothstep(z_min, z_max, z))`
//! - opacity: `floor + (1 - floor) * smoothstep(z_min, z_max, z)`
//! - sprite: fragments further than 0.5 from the centre are discarded, the
//!   rest fade with `(1 - 2 * dist)²`
//!
//! Points are composited additively without depth writes, so overlap
//! brightens instead of occluding.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::config::AppearanceConfig;

/// Radius, in normalized sprite coordinates, beyond which fragments are discarded.
pub const SPRITE_RADIUS: f32 = 0.5;

/// GLSL/WGSL `smoothstep`.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Sprite size in pixels for a point at view-space depth `view_z` (negative in front).
#[inline]
pub fn point_size(view_z: f32, appearance: &AppearanceConfig) -> f32 {
    appearance.base_size * (appearance.distance_scale / -view_z)
}

/// Colour and opacity for a particle at field depth `z`.
pub fn depth_shade(z: f32, appearance: &AppearanceConfig) -> (Vec3, f32) {
    let [z_min, z_max] = appearance.z_range;
    let t = smoothstep(z_min, z_max, z);
    let color = appearance.far_color().lerp(appearance.near_color(), t);
    let floor = appearance.opacity_floor;
    (color, floor + (1.0 - floor) * t)
}

/// Alpha multiplier at `offset` from the sprite centre, or `None` if discarded.
///
/// Distance exactly 0.5 is kept (with zero strength).
#[inline]
pub fn sprite_strength(offset: Vec2) -> Option<f32> {
    let dist = offset.length();
    if dist > SPRITE_RADIUS {
        return None;
    }
    let falloff = 1.0 - dist * 2.0;
    Some(falloff * falloff)
}

/// A particle ready for rasterization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointSprite {
    /// Clip-space position of the sprite centre.
    pub clip: Vec4,
    /// Side length in pixels.
    pub size: f32,
    pub color: Vec3,
    pub alpha: f32,
}

/// Camera matrices handed in by the display collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewProjection {
    pub view: Mat4,
    pub proj: Mat4,
    /// Render target size in pixels.
    pub viewport: Vec2,
}

impl ViewProjection {
    /// Place a particle. Returns `None` for points at or behind the eye.
    pub fn project(&self, position: Vec3, appearance: &AppearanceConfig) -> Option<PointSprite> {
        let view_pos = self.view * position.extend(1.0);
        if view_pos.z >= 0.0 {
            return None;
        }
        let (color, alpha) = depth_shade(position.z, appearance);
        Some(PointSprite {
            clip: self.proj * view_pos,
            size: point_size(view_pos.z, appearance),
            color,
            alpha,
        })
    }
}

/// Uniform block for the render pass. Layout matches `RenderUniforms` in WGSL.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct RenderUniforms {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub far_color: [f32; 4],
    pub near_color: [f32; 4],
    pub viewport: [f32; 2],
    pub base_size: f32,
    pub distance_scale: f32,
    pub z_range: [f32; 2],
    pub opacity_floor: f32,
    pub _padding: f32,
}

impl RenderUniforms {
    pub fn new(camera: &ViewProjection, appearance: &AppearanceConfig) -> Self {
        Self {
            view: camera.view.to_cols_array_2d(),
            proj: camera.proj.to_cols_array_2d(),
            far_color: appearance.far_color().extend(1.0).to_array(),
            near_color: appearance.near_color().extend(1.0).to_array(),
            viewport: camera.viewport.to_array(),
            base_size: appearance.base_size,
            distance_scale: appearance.distance_scale,
            z_range: appearance.z_range,
            opacity_floor: appearance.opacity_floor,
            _padding: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sprite_discard_boundary() {
        assert_eq!(sprite_strength(Vec2::ZERO), Some(1.0));
        assert!(sprite_strength(Vec2::new(0.5, 0.0)).is_some());
        assert!(sprite_strength(Vec2::new(0.0, -0.5)).is_some());
        assert_eq!(sprite_strength(Vec2::new(0.5001, 0.0)), None);
        assert_eq!(sprite_strength(Vec2::new(0.4, 0.4)), None);
    }

    #[test]
    fn test_sprite_falloff_is_squared() {
        let s = sprite_strength(Vec2::new(0.25, 0.0)).unwrap();
        assert!((s - 0.25).abs() < 1e-6);
        let edge = sprite_strength(Vec2::new(0.5, 0.0)).unwrap();
        assert_eq!(edge, 0.0);
    }

    #[test]
    fn test_point_size_inverse_depth() {
        let appearance = AppearanceConfig::default();
        assert!((point_size(-10.0, &appearance) - 4.0).abs() < 1e-6);
        assert!((point_size(-5.0, &appearance) - 8.0).abs() < 1e-6);
        assert!(point_size(-5.0, &appearance) > point_size(-20.0, &appearance));
    }

    #[test]
    fn test_depth_shade_endpoints() {
        let appearance = AppearanceConfig::default();
        let (far, far_alpha) = depth_shade(0.0, &appearance);
        assert!((far - appearance.far_color()).length() < 1e-6);
        assert!((far_alpha - 0.6).abs() < 1e-6);

        let (near, near_alpha) = depth_shade(4.0, &appearance);
        assert!((near - appearance.near_color()).length() < 1e-6);
        assert!((near_alpha - 1.0).abs() < 1e-6);

        let (_, below) = depth_shade(-3.0, &appearance);
        assert!((below - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_project_culls_behind_camera() {
        let camera = ViewProjection {
            view: Mat4::look_at_rh(Vec3::new(0.0, 0.0, 12.0), Vec3::ZERO, Vec3::Y),
            proj: Mat4::perspective_rh(50f32.to_radians(), 16.0 / 9.0, 0.1, 100.0),
            viewport: Vec2::new(1280.0, 720.0),
        };
        let appearance = AppearanceConfig::default();
        let front = camera.project(Vec3::ZERO, &appearance).unwrap();
        assert!((front.size - 4.0 * 10.0 / 12.0).abs() < 1e-4);
        assert!(camera.project(Vec3::new(0.0, 0.0, 13.0), &appearance).is_none());
    }

    #[test]
    fn test_uniform_layout_size() {
        assert_eq!(std::mem::size_of::<RenderUniforms>(), 192);
    }
}

//! Configuration surface for the particle field.
//!
//! Every value has a default, so an empty JSON object is a complete config.
//! Motion and smoothing constants were tuned for the default extents and
//! time scale; they do not automatically carry over to other grid sizes.
//!
//! # Example
//!
//! ```ignore
//! use quantum_echo::EchoConfig;
//!
//! let config = EchoConfig::new()
//!     .with_resolution(128)
//!     .with_noise_amplitude(0.02)
//!     .with_z_scale(3.0);
//! config.save("echo.json")?;
//! ```

use std::path::Path;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Largest accepted grid resolution. Matches the common 2D texture limit and
/// keeps `N²` well inside `usize` on every target.
pub const MAX_RESOLUTION: u32 = 16_384;

/// Complete configuration: grid layout, motion model and appearance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoConfig {
    pub grid: GridConfig,
    pub motion: MotionConfig,
    pub appearance: AppearanceConfig,
}

/// Particle grid layout.
///
/// Changing `resolution` means reallocating both state textures, so it is
/// only read at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Grid side length N; the simulation holds N² particles.
    pub resolution: u32,
    /// World-space width and height (Wx, Wy) covered by the resting grid.
    pub extent: [f32; 2],
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            resolution: 256,
            extent: [10.0, 8.0],
        }
    }
}

impl GridConfig {
    pub fn extent(&self) -> Vec2 {
        Vec2::from(self.extent)
    }
}

/// Per-frame force model parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Scale applied to the noise vector before it is added to the position.
    pub noise_amplitude: f32,
    /// Spatial frequency `k` of the noise lookup.
    pub noise_scale: f32,
    /// Temporal frequency `k_t` of the noise lookup.
    pub noise_time_scale: f32,
    /// Depth reached by a particle sitting on full-white video.
    pub z_scale: f32,
    /// Exponential smoothing factor pulling z toward its target.
    pub z_smoothing: f32,
    /// Exponential smoothing factor pulling x/y back toward home.
    pub xy_smoothing: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            noise_amplitude: 0.01,
            noise_scale: 1.0,
            noise_time_scale: 0.1,
            z_scale: 4.0,
            z_smoothing: 0.15,
            xy_smoothing: 0.05,
        }
    }
}

/// Point sprite sizing and depth-based colouring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppearanceConfig {
    /// Sprite size in pixels at `distance_scale` units from the camera.
    pub base_size: f32,
    pub distance_scale: f32,
    /// Colour of particles at the low end of `z_range`.
    pub far_color: [f32; 3],
    /// Colour of particles at the high end of `z_range`.
    pub near_color: [f32; 3],
    /// Depth interval over which colour and opacity ramp.
    pub z_range: [f32; 2],
    /// Opacity at the low end of `z_range`; ramps to 1.0 at the high end.
    pub opacity_floor: f32,
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        Self {
            base_size: 4.0,
            distance_scale: 10.0,
            far_color: [0.1, 0.3, 0.8],
            near_color: [0.5, 0.9, 1.0],
            z_range: [0.0, 4.0],
            opacity_floor: 0.6,
        }
    }
}

impl AppearanceConfig {
    pub fn far_color(&self) -> Vec3 {
        Vec3::from(self.far_color)
    }

    pub fn near_color(&self) -> Vec3 {
        Vec3::from(self.near_color)
    }
}

impl EchoConfig {
    /// Create a configuration with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the grid side length N (N² particles).
    pub fn with_resolution(mut self, resolution: u32) -> Self {
        self.grid.resolution = resolution;
        self
    }

    /// Set the world extents covered by the resting grid.
    pub fn with_extent(mut self, width: f32, height: f32) -> Self {
        self.grid.extent = [width, height];
        self
    }

    /// Set the noise amplitude. Zero disables idle motion entirely.
    pub fn with_noise_amplitude(mut self, amplitude: f32) -> Self {
        self.motion.noise_amplitude = amplitude.max(0.0);
        self
    }

    /// Set spatial and temporal noise frequencies.
    pub fn with_noise_frequency(mut self, scale: f32, time_scale: f32) -> Self {
        self.motion.noise_scale = scale;
        self.motion.noise_time_scale = time_scale;
        self
    }

    /// Set the depth reached on full-brightness video.
    pub fn with_z_scale(mut self, z_scale: f32) -> Self {
        self.motion.z_scale = z_scale;
        self
    }

    /// Set the z and x/y smoothing factors. Both must lie in `(0, 1]`;
    /// [`validate`](Self::validate) reports anything else.
    pub fn with_smoothing(mut self, z: f32, xy: f32) -> Self {
        self.motion.z_smoothing = z;
        self.motion.xy_smoothing = xy;
        self
    }

    /// Set sprite base size and distance scale.
    pub fn with_point_size(mut self, base_size: f32, distance_scale: f32) -> Self {
        self.appearance.base_size = base_size;
        self.appearance.distance_scale = distance_scale;
        self
    }

    /// Set the far and near colour stops.
    pub fn with_colors(mut self, far: [f32; 3], near: [f32; 3]) -> Self {
        self.appearance.far_color = far;
        self.appearance.near_color = near;
        self
    }

    /// Set the opacity at the far end of the depth ramp (clamped to `[0, 1]`).
    pub fn with_opacity_floor(mut self, floor: f32) -> Self {
        self.appearance.opacity_floor = floor.clamp(0.0, 1.0);
        self
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.resolution == 0 {
            return Err(ConfigError::Invalid("grid resolution must be at least 1".into()));
        }
        if self.grid.resolution > MAX_RESOLUTION {
            return Err(ConfigError::Invalid(format!(
                "grid resolution must be at most {}, got {}",
                MAX_RESOLUTION, self.grid.resolution
            )));
        }
        let [wx, wy] = self.grid.extent;
        if !(wx > 0.0 && wy > 0.0 && wx.is_finite() && wy.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "grid extent must be positive and finite, got ({}, {})",
                wx, wy
            )));
        }
        for (name, value) in [
            ("z_smoothing", self.motion.z_smoothing),
            ("xy_smoothing", self.motion.xy_smoothing),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }
        let [z_min, z_max] = self.appearance.z_range;
        if !(z_max > z_min) {
            return Err(ConfigError::Invalid(format!(
                "z_range must be increasing, got [{}, {}]",
                z_min, z_max
            )));
        }
        if !(0.0..=1.0).contains(&self.appearance.opacity_floor) {
            return Err(ConfigError::Invalid(format!(
                "opacity_floor must be in [0, 1], got {}",
                self.appearance.opacity_floor
            )));
        }
        Ok(())
    }

    /// Number of particles (N²).
    pub fn particle_count(&self) -> u64 {
        u64::from(self.grid.resolution) * u64::from(self.grid.resolution)
    }

    /// Save configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load and validate configuration from JSON. Missing fields take defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_tuned_values() {
        let config = EchoConfig::new();
        assert_eq!(config.grid.resolution, 256);
        assert_eq!(config.grid.extent, [10.0, 8.0]);
        assert!((config.motion.noise_amplitude - 0.01).abs() < 1e-6);
        assert!((config.motion.z_scale - 4.0).abs() < 1e-6);
        assert!((config.motion.z_smoothing - 0.15).abs() < 1e-6);
        assert!((config.motion.xy_smoothing - 0.05).abs() < 1e-6);
        assert!((config.appearance.opacity_floor - 0.6).abs() < 1e-6);
        assert_eq!(config.particle_count(), 65_536);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_clamps() {
        let config = EchoConfig::new()
            .with_opacity_floor(2.0)
            .with_noise_amplitude(-1.0);
        assert_eq!(config.appearance.opacity_floor, 1.0);
        assert_eq!(config.motion.noise_amplitude, 0.0);
    }

    #[test]
    fn test_smoothing_out_of_range_reported_by_name() {
        let config = EchoConfig::new().with_smoothing(0.15, -0.1);
        assert_eq!(config.motion.xy_smoothing, -0.1);
        match config.validate() {
            Err(ConfigError::Invalid(msg)) => assert!(msg.contains("xy_smoothing"), "{}", msg),
            other => panic!("expected Invalid, got {:?}", other),
        }

        let config = EchoConfig::new().with_smoothing(1.5, 0.05);
        assert!(config.validate().is_err());
        assert!(EchoConfig::new().with_smoothing(1.0, 1.0).validate().is_ok());
    }

    #[test]
    fn test_resolution_upper_bound() {
        let config = EchoConfig::new().with_resolution(65_536);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        assert_eq!(config.particle_count(), 1 << 32);

        let config = EchoConfig::new().with_resolution(MAX_RESOLUTION);
        assert!(config.validate().is_ok());
        assert_eq!(config.particle_count(), 268_435_456);
    }

    #[test]
    fn test_validate_rejects_zero_resolution() {
        let config = EchoConfig::new().with_resolution(0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_bad_extent() {
        let config = EchoConfig::new().with_extent(0.0, 8.0);
        assert!(config.validate().is_err());
        let config = EchoConfig::new().with_extent(10.0, f32::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_smoothing() {
        let config = EchoConfig::new().with_smoothing(0.15, 0.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_z_range() {
        let mut config = EchoConfig::new();
        config.appearance.z_range = [4.0, 4.0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: EchoConfig =
            serde_json::from_str(r#"{ "grid": { "resolution": 64 } }"#).unwrap();
        assert_eq!(config.grid.resolution, 64);
        assert_eq!(config.grid.extent, [10.0, 8.0]);
        assert_eq!(config.motion, MotionConfig::default());
    }
}

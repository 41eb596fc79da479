//! Host execution of both passes.
//!
//! The simulation step runs as a rayon parallel map over grid rows; the render
//! pass produces the [`PointSprite`] list the GPU would rasterize. No window or
//! device is needed, which makes this the backend for tests, benchmarks and
//! headless runs.

use std::convert::Infallible;

use crate::clock::FrameClock;
use crate::config::{AppearanceConfig, EchoConfig, MotionConfig};
use crate::driver::{FrameBackend, FrameDriver, FrameInput};
use crate::error::ConfigError;
use crate::field::{FieldSampler, FieldSlot};
use crate::grid::ParticleGrid;
use crate::render::{PointSprite, ViewProjection};
use crate::state::{initial_state, PingPong, StateTexture};
use crate::step;

/// Fixed step used by headless drivers.
pub const HEADLESS_STEP: f32 = 1.0 / 60.0;

/// Runs the simulation and render model on the CPU.
#[derive(Debug, Clone)]
pub struct CpuBackend {
    grid: ParticleGrid,
    motion: MotionConfig,
    sampler: FieldSampler,
    appearance: AppearanceConfig,
    camera: Option<ViewProjection>,
    points: Vec<PointSprite>,
}

impl CpuBackend {
    /// Build from a configuration. The configuration is assumed valid.
    pub fn new(config: &EchoConfig) -> Self {
        let grid = ParticleGrid::from_config(&config.grid);
        Self {
            sampler: FieldSampler::new(grid.extent()),
            grid,
            motion: config.motion.clone(),
            appearance: config.appearance.clone(),
            camera: None,
            points: Vec::new(),
        }
    }

    /// Attach a camera so the render pass produces point sprites.
    pub fn with_camera(mut self, camera: ViewProjection) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn set_camera(&mut self, camera: Option<ViewProjection>) {
        self.camera = camera;
    }

    pub fn grid(&self) -> &ParticleGrid {
        &self.grid
    }

    pub fn sampler(&self) -> &FieldSampler {
        &self.sampler
    }

    /// Sprites from the last render, in texel order. Points behind the camera
    /// are omitted. Empty while no camera is attached.
    pub fn points(&self) -> &[PointSprite] {
        &self.points
    }

    /// A fresh pair of state buffers for this backend's grid.
    pub fn initial_buffers(&self) -> PingPong<StateTexture> {
        initial_state(&self.grid)
    }
}

impl FrameBackend for CpuBackend {
    type Buffer = StateTexture;
    type Error = Infallible;

    fn simulate(&mut self, read: &StateTexture, write: &mut StateTexture, input: &FrameInput<'_>) {
        step::advance(
            read,
            write,
            &self.grid,
            &self.motion,
            &self.sampler,
            input.field,
            input.time,
        );
    }

    fn render(&mut self, latest: &StateTexture, _input: &FrameInput<'_>) -> Result<(), Infallible> {
        self.points.clear();
        if let Some(camera) = &self.camera {
            let appearance = &self.appearance;
            self.points
                .extend(latest.positions().filter_map(|p| camera.project(p, appearance)));
        }
        Ok(())
    }
}

impl FrameDriver<CpuBackend> {
    /// A CPU driver with a fixed-step clock, for deterministic runs.
    pub fn headless(config: &EchoConfig, field: FieldSlot) -> Result<Self, ConfigError> {
        config.validate()?;
        let backend = CpuBackend::new(config);
        let buffers = backend.initial_buffers();
        log::info!(
            "Headless driver: {}x{} grid ({} particles)",
            config.grid.resolution,
            config.grid.resolution,
            config.particle_count()
        );
        Ok(Self::new(backend, buffers, field).with_clock(FrameClock::fixed(HEADLESS_STEP)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec2, Vec3};

    fn small() -> EchoConfig {
        EchoConfig::default().with_resolution(8)
    }

    #[test]
    fn test_headless_rejects_invalid_config() {
        let config = EchoConfig::default().with_resolution(0);
        assert!(FrameDriver::headless(&config, FieldSlot::new()).is_err());

        // N² would overflow a u32 texel count.
        let config = EchoConfig::default().with_resolution(65_536);
        assert!(FrameDriver::headless(&config, FieldSlot::new()).is_err());
    }

    #[test]
    fn test_render_without_camera_is_empty() {
        let mut driver = FrameDriver::headless(&small(), FieldSlot::new()).unwrap();
        driver.frame().unwrap();
        assert!(driver.backend().points().is_empty());
    }

    #[test]
    fn test_render_projects_every_particle() {
        let camera = ViewProjection {
            view: Mat4::look_at_rh(Vec3::new(0.0, 0.0, 12.0), Vec3::ZERO, Vec3::Y),
            proj: Mat4::perspective_rh(50f32.to_radians(), 1.0, 0.1, 100.0),
            viewport: Vec2::new(800.0, 800.0),
        };
        let config = small();
        let backend = CpuBackend::new(&config).with_camera(camera);
        let buffers = backend.initial_buffers();
        let mut driver = FrameDriver::new(backend, buffers, FieldSlot::new());
        driver.frame_at(0.0).unwrap();

        let points = driver.backend().points();
        assert_eq!(points.len(), 64);
        for point in points {
            assert!(point.size > 0.0);
            assert!(point.alpha >= 0.6 && point.alpha <= 1.0);
        }
    }

    #[test]
    fn test_rendered_points_come_from_fresh_state() {
        let camera = ViewProjection {
            view: Mat4::look_at_rh(Vec3::new(0.0, 0.0, 12.0), Vec3::ZERO, Vec3::Y),
            proj: Mat4::perspective_rh(50f32.to_radians(), 1.0, 0.1, 100.0),
            viewport: Vec2::new(800.0, 800.0),
        };
        let config = small().with_noise_amplitude(0.0);
        let backend = CpuBackend::new(&config).with_camera(camera);
        let buffers = backend.initial_buffers();
        let mut driver = FrameDriver::new(backend, buffers, FieldSlot::new());
        driver
            .field()
            .publish(crate::field::VideoFrame::solid(4, 4, [255, 255, 255]));
        driver.frame_at(0.0).unwrap();

        // After one white frame every particle sits at z = 0.6, above the far colour.
        let far_alpha = 0.6;
        for point in driver.backend().points() {
            assert!(point.alpha > far_alpha);
        }
    }
}

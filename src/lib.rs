//! # Quantum Echo - video-driven GPGPU particle field
//!
//! An N×N grid of point particles whose positions live in a pair of
//! floating-point state textures. Every frame a simulation step reads one
//! texture and writes the other, pulling each particle towards a depth taken
//! from the brightness of a live video frame, and a render pass draws the
//! freshly written positions as soft additive sprites.
//!
//! ## Quick Start
//!
//! ```ignore
//! use quantum_echo::prelude::*;
//!
//! fn main() -> Result<(), SimulationError> {
//!     let field = FieldSlot::new();
//!     field.publish(VideoFrame::open("face.png").unwrap());
//!     quantum_echo::window::run(EchoConfig::default(), field)
//! }
//! ```
//!
//! ## Headless
//!
//! The same driver runs on the CPU without a window or GPU:
//!
//! ```ignore
//! use quantum_echo::prelude::*;
//!
//! let field = FieldSlot::new();
//! let mut driver = FrameDriver::headless(&EchoConfig::default(), field.clone())?;
//! field.publish(VideoFrame::solid(64, 48, [255, 255, 255]));
//! for _ in 0..100 {
//!     driver.frame()?;
//! }
//! let z = driver.latest().position(128, 128).z; // close to 4.0
//! ```
//!
//! ## Core Concepts
//!
//! ### Grid
//!
//! Particle identity is its grid cell `(i, j)`. [`ParticleGrid`] maps a cell to
//! its texture coordinate `(i/N, j/N)` and its home position
//! `((i/N - 0.5) * Wx, (j/N - 0.5) * Wy, 0)`. Nothing is ever spawned or killed.
//!
//! ### Step
//!
//! Per particle: simplex-noise drift, then `z` eases towards
//! `luminance * z_scale`, then `x, y` ease back towards home. See [`step`].
//!
//! ### Field
//!
//! Producers publish [`VideoFrame`]s into a [`FieldSlot`] from any thread. The
//! [`FieldSampler`] mirrors the frame horizontally and returns zero outside it
//! or when nothing is attached.
//!
//! ### Driver
//!
//! [`FrameDriver`] runs simulate → render → swap over a [`PingPong`] pair. It is
//! generic over [`FrameBackend`]: [`CpuBackend`] (rayon) or
//! [`gpu::GpuBackend`] (wgpu compute + instanced quads).
//!
//! ## Configuration
//!
//! | Section | Fields |
//! |---------|--------|
//! | `grid` | `resolution`, `extent` |
//! | `motion` | `noise_amplitude`, `noise_scale`, `noise_time_scale`, `z_scale`, `z_smoothing`, `xy_smoothing` |
//! | `appearance` | `base_size`, `distance_scale`, `far_color`, `near_color`, `z_range`, `opacity_floor` |
//!
//! [`EchoConfig`] loads from and saves to JSON; missing fields take defaults.

pub mod clock;
pub mod config;
pub mod cpu;
pub mod driver;
pub mod error;
pub mod field;
pub mod gpu;
pub mod grid;
pub mod noise;
pub mod render;
pub mod shader;
pub mod source;
pub mod state;
pub mod step;
pub mod window;

pub use clock::FrameClock;
pub use config::{AppearanceConfig, EchoConfig, GridConfig, MotionConfig, MAX_RESOLUTION};
pub use cpu::CpuBackend;
pub use driver::{DriverState, FrameBackend, FrameDriver, FrameInput};
pub use error::{ConfigError, FrameError, GpuError, SimulationError};
pub use field::{FieldSampler, FieldSlot, VideoFrame};
pub use glam::{Vec2, Vec3, Vec4};
pub use grid::ParticleGrid;
pub use render::{PointSprite, ViewProjection};
pub use state::{PingPong, Slot, StateTexture};

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use quantum_echo::prelude::*;
/// ```
pub mod prelude {
    pub use crate::clock::FrameClock;
    pub use crate::config::{AppearanceConfig, EchoConfig, GridConfig, MotionConfig};
    pub use crate::cpu::CpuBackend;
    pub use crate::driver::{DriverState, FrameBackend, FrameDriver, FrameInput};
    pub use crate::error::{ConfigError, FrameError, GpuError, SimulationError};
    pub use crate::field::{FieldSampler, FieldSlot, VideoFrame};
    pub use crate::grid::ParticleGrid;
    pub use crate::render::{PointSprite, ViewProjection};
    pub use crate::state::{PingPong, Slot, StateTexture};
    pub use crate::{Vec2, Vec3, Vec4};
}

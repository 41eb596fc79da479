//! Simulation step: one frame of the force model for every particle.
//!
//! Per particle, in order:
//!
//! 1. read `pos` from the read-role state
//! 2. add `drift(pos.xy * k, t * k_t) * amplitude`
//! 3. `pos.z += (luminance(pos.xy) * z_scale - pos.z) * αz`
//! 4. `pos.xy += (home.xy - pos.xy) * αxy`
//! 5. write `pos` into the write-role state
//!
//! Every particle depends only on its own previous position, its home, the
//! time and the field, so the grid is processed as a parallel map over rows.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec3Swizzles};
use rayon::prelude::*;

use crate::config::MotionConfig;
use crate::field::{FieldSampler, VideoFrame};
use crate::grid::ParticleGrid;
use crate::noise;
use crate::state::StateTexture;

/// Advance a single particle by one frame.
///
/// `sample` returns the field luminance at a world-space `(x, y)`.
#[inline]
pub fn step_particle(
    pos: Vec3,
    home: Vec3,
    time: f32,
    motion: &MotionConfig,
    sample: impl Fn(Vec2) -> f32,
) -> Vec3 {
    let mut pos = pos;

    if motion.noise_amplitude != 0.0 {
        let drift = noise::drift(pos.xy() * motion.noise_scale, time * motion.noise_time_scale);
        pos += drift * motion.noise_amplitude;
    }

    let target_z = sample(pos.xy()) * motion.z_scale;
    pos.z += (target_z - pos.z) * motion.z_smoothing;

    pos.x += (home.x - pos.x) * motion.xy_smoothing;
    pos.y += (home.y - pos.y) * motion.xy_smoothing;

    pos
}

/// Run the step over the whole grid, reading `read` and writing `write`.
///
/// # Panics
///
/// Panics if either state does not match the grid resolution.
pub fn advance(
    read: &StateTexture,
    write: &mut StateTexture,
    grid: &ParticleGrid,
    motion: &MotionConfig,
    sampler: &FieldSampler,
    frame: Option<&VideoFrame>,
    time: f32,
) {
    let n = grid.resolution();
    assert_eq!(read.resolution(), n, "read state does not match grid");
    assert_eq!(write.resolution(), n, "write state does not match grid");

    write
        .texels_mut()
        .par_chunks_mut(n as usize)
        .enumerate()
        .for_each(|(j, row)| {
            let j = j as u32;
            for (i, texel) in row.iter_mut().enumerate() {
                let i = i as u32;
                let next = step_particle(read.position(i, j), grid.home(i, j), time, motion, |xy| {
                    sampler.luminance(frame, xy)
                });
                *texel = next.extend(1.0).to_array();
            }
        });
}

/// Uniform block for the compute pass. Layout matches `SimUniforms` in WGSL.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct SimUniforms {
    pub extent: [f32; 2],
    pub time: f32,
    pub noise_amplitude: f32,
    pub noise_scale: f32,
    pub noise_time_scale: f32,
    pub z_scale: f32,
    pub z_smoothing: f32,
    pub xy_smoothing: f32,
    /// 1 when a video frame is bound, 0 otherwise.
    pub field_enabled: u32,
    pub resolution: u32,
    pub _padding: u32,
}

impl SimUniforms {
    pub fn new(grid: &ParticleGrid, motion: &MotionConfig, time: f32, field_enabled: bool) -> Self {
        Self {
            extent: grid.extent().to_array(),
            time,
            noise_amplitude: motion.noise_amplitude,
            noise_scale: motion.noise_scale,
            noise_time_scale: motion.noise_time_scale,
            z_scale: motion.z_scale,
            z_smoothing: motion.z_smoothing,
            xy_smoothing: motion.xy_smoothing,
            field_enabled: field_enabled as u32,
            resolution: grid.resolution(),
            _padding: 0,
        }
    }
}

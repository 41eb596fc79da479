//! Particle index grid.
//!
//! A particle *is* its grid cell `(i, j)`, with `i, j` in `[0, N)`. From the
//! cell we derive, once and for all:
//!
//! - its home position `((i/N - 0.5) * Wx, (j/N - 0.5) * Wy, 0)`
//! - its state texture coordinate `(i/N, j/N)`
//!
//! State textures are stored row-major with `j` as the row, so cell `(i, j)`
//! lives at texel `(x = i, y = j)` and linear index `j * N + i`.

use glam::{Vec2, Vec3};

use crate::config::GridConfig;

/// Fixed mapping from grid cell to home position and texture coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleGrid {
    resolution: u32,
    extent: Vec2,
}

impl ParticleGrid {
    /// Create an N×N grid spanning `extent` world units.
    ///
    /// # Panics
    ///
    /// Panics if `resolution` is zero.
    pub fn new(resolution: u32, extent: Vec2) -> Self {
        assert!(resolution > 0, "grid resolution must be at least 1");
        Self { resolution, extent }
    }

    pub fn from_config(config: &GridConfig) -> Self {
        Self::new(config.resolution, config.extent())
    }

    #[inline]
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    #[inline]
    pub fn extent(&self) -> Vec2 {
        self.extent
    }

    /// Number of particles (N²).
    #[inline]
    pub fn len(&self) -> usize {
        (self.resolution as usize) * (self.resolution as usize)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Texture coordinate of cell `(i, j)`.
    #[inline]
    pub fn uv(&self, i: u32, j: u32) -> Vec2 {
        let n = self.resolution as f32;
        Vec2::new(i as f32 / n, j as f32 / n)
    }

    /// Resting world position of cell `(i, j)`.
    #[inline]
    pub fn home(&self, i: u32, j: u32) -> Vec3 {
        let offset = (self.uv(i, j) - 0.5) * self.extent;
        offset.extend(0.0)
    }

    /// Linear texel index of cell `(i, j)`.
    #[inline]
    pub fn index(&self, i: u32, j: u32) -> usize {
        j as usize * self.resolution as usize + i as usize
    }

    /// Inverse of [`ParticleGrid::index`].
    #[inline]
    pub fn cell(&self, index: usize) -> (u32, u32) {
        let n = self.resolution as usize;
        ((index % n) as u32, (index / n) as u32)
    }

    /// All cells in texel order.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (0..self.len()).map(move |index| self.cell(index))
    }

    /// Per-particle texture coordinates in texel order, ready for a vertex buffer.
    pub fn references(&self) -> Vec<[f32; 2]> {
        self.cells().map(|(i, j)| self.uv(i, j).to_array()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_grid() -> ParticleGrid {
        ParticleGrid::new(256, Vec2::new(10.0, 8.0))
    }

    #[test]
    fn test_home_corners() {
        let grid = default_grid();
        assert_eq!(grid.home(0, 0), Vec3::new(-5.0, -4.0, 0.0));

        let far = grid.home(255, 255);
        assert!((far.x - 4.9609375).abs() < 1e-5);
        assert!((far.y - 3.96875).abs() < 1e-5);
        assert_eq!(far.z, 0.0);
    }

    #[test]
    fn test_uv_center() {
        let grid = default_grid();
        assert_eq!(grid.uv(128, 128), Vec2::new(0.5, 0.5));
        assert_eq!(grid.home(128, 128), Vec3::ZERO);
    }

    #[test]
    fn test_mapping_is_stable() {
        let grid = default_grid();
        for (i, j) in [(0, 0), (17, 200), (255, 3)] {
            assert_eq!(grid.home(i, j), grid.home(i, j));
            assert_eq!(grid.uv(i, j), grid.uv(i, j));
        }
        let copy = grid;
        assert_eq!(copy.home(31, 97), grid.home(31, 97));
    }

    #[test]
    fn test_index_round_trip() {
        let grid = ParticleGrid::new(7, Vec2::ONE);
        for index in 0..grid.len() {
            let (i, j) = grid.cell(index);
            assert_eq!(grid.index(i, j), index);
        }
        assert_eq!(grid.index(3, 2), 2 * 7 + 3);
    }

    #[test]
    fn test_references_follow_texel_order() {
        let grid = ParticleGrid::new(4, Vec2::new(10.0, 8.0));
        let refs = grid.references();
        assert_eq!(refs.len(), 16);
        assert_eq!(refs[0], [0.0, 0.0]);
        assert_eq!(refs[1], [0.25, 0.0]);
        assert_eq!(refs[4], [0.0, 0.25]);
    }

    #[test]
    #[should_panic(expected = "grid resolution must be at least 1")]
    fn test_zero_resolution_panics() {
        ParticleGrid::new(0, Vec2::ONE);
    }
}

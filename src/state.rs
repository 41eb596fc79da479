//! Double-buffered particle state.
//!
//! [`PingPong`] owns two interchangeable slots and a single role flag. One slot
//! is the `read` role (authoritative positions for the current frame), the
//! other is the `write` role (target of the in-flight step). Swapping flips the
//! flag; nothing is ever copied. The same type holds host-side
//! [`StateTexture`]s and GPU texture slots.

use glam::Vec3;

use crate::grid::ParticleGrid;

/// Physical slot identity, independent of the current role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    pub fn other(self) -> Slot {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }
}

/// Two owned buffers with swappable read/write roles.
#[derive(Debug, Clone)]
pub struct PingPong<T> {
    a: T,
    b: T,
    /// Which slot currently holds the read role (false = A, true = B).
    read_is_b: bool,
}

impl<T> PingPong<T> {
    /// Create a pair with `a` in the read role.
    pub fn new(a: T, b: T) -> Self {
        Self {
            a,
            b,
            read_is_b: false,
        }
    }

    /// Slot currently in the read role.
    pub fn read_slot(&self) -> Slot {
        if self.read_is_b {
            Slot::B
        } else {
            Slot::A
        }
    }

    /// Slot currently in the write role.
    pub fn write_slot(&self) -> Slot {
        self.read_slot().other()
    }

    pub fn read(&self) -> &T {
        self.get(self.read_slot())
    }

    pub fn write(&self) -> &T {
        self.get(self.write_slot())
    }

    pub fn get(&self, slot: Slot) -> &T {
        match slot {
            Slot::A => &self.a,
            Slot::B => &self.b,
        }
    }

    /// Borrow the read buffer immutably and the write buffer mutably.
    ///
    /// This is the only way to get at both at once, so a step can never read
    /// its own write target.
    pub fn split_mut(&mut self) -> (&T, &mut T) {
        if self.read_is_b {
            (&self.b, &mut self.a)
        } else {
            (&self.a, &mut self.b)
        }
    }

    /// Mutable access to both physical slots, for initialization and resets.
    pub fn both_mut(&mut self) -> (&mut T, &mut T) {
        (&mut self.a, &mut self.b)
    }

    /// Exchange the read and write roles.
    pub fn swap(&mut self) {
        self.read_is_b = !self.read_is_b;
    }
}

/// Host-side N×N array of particle positions, one RGBA32F texel per particle.
///
/// Channels are `(x, y, z, 1.0)`; the fourth channel is unused padding kept so
/// the byte layout matches an `Rgba32Float` texture exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct StateTexture {
    resolution: u32,
    texels: Vec<[f32; 4]>,
}

impl StateTexture {
    /// Every particle at its home position (z = 0).
    pub fn from_grid(grid: &ParticleGrid) -> Self {
        let texels = grid
            .cells()
            .map(|(i, j)| grid.home(i, j).extend(1.0).to_array())
            .collect();
        Self {
            resolution: grid.resolution(),
            texels,
        }
    }

    #[inline]
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.texels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.texels.is_empty()
    }

    #[inline]
    fn index(&self, i: u32, j: u32) -> usize {
        j as usize * self.resolution as usize + i as usize
    }

    /// Position of cell `(i, j)`.
    #[inline]
    pub fn position(&self, i: u32, j: u32) -> Vec3 {
        let [x, y, z, _] = self.texels[self.index(i, j)];
        Vec3::new(x, y, z)
    }

    pub fn set_position(&mut self, i: u32, j: u32, position: Vec3) {
        let index = self.index(i, j);
        self.texels[index] = position.extend(1.0).to_array();
    }

    /// Iterate positions in texel order.
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.texels.iter().map(|&[x, y, z, _]| Vec3::new(x, y, z))
    }

    pub fn texels(&self) -> &[[f32; 4]] {
        &self.texels
    }

    pub fn texels_mut(&mut self) -> &mut [[f32; 4]] {
        &mut self.texels
    }

    /// Raw bytes in `Rgba32Float` row-major layout.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }
}

/// Both slots initialized to identical home positions.
pub fn initial_state(grid: &ParticleGrid) -> PingPong<StateTexture> {
    let state = StateTexture::from_grid(grid);
    PingPong::new(state.clone(), state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn test_roles_start_on_a() {
        let pair = PingPong::new(1, 2);
        assert_eq!(pair.read_slot(), Slot::A);
        assert_eq!(pair.write_slot(), Slot::B);
        assert_eq!(*pair.read(), 1);
        assert_eq!(*pair.write(), 2);
    }

    #[test]
    fn test_even_swaps_restore_roles() {
        let mut pair = PingPong::new("a", "b");
        let original = pair.read_slot();
        pair.swap();
        assert_eq!(pair.read_slot(), original.other());
        pair.swap();
        assert_eq!(pair.read_slot(), original);
    }

    #[test]
    fn test_split_mut_targets_write_slot() {
        let mut pair = PingPong::new(vec![0], vec![0]);
        {
            let (read, write) = pair.split_mut();
            write[0] = read[0] + 5;
        }
        assert_eq!(pair.get(Slot::B)[0], 5);
        assert_eq!(pair.get(Slot::A)[0], 0);

        pair.swap();
        {
            let (read, write) = pair.split_mut();
            write[0] = read[0] + 1;
        }
        assert_eq!(pair.get(Slot::A)[0], 6);
    }

    #[test]
    fn test_state_texture_starts_at_home() {
        let grid = ParticleGrid::new(8, Vec2::new(10.0, 8.0));
        let state = StateTexture::from_grid(&grid);
        assert_eq!(state.len(), 64);
        for (i, j) in grid.cells() {
            assert_eq!(state.position(i, j), grid.home(i, j));
        }
        assert!(state.texels().iter().all(|t| t[3] == 1.0));
    }

    #[test]
    fn test_state_preserves_out_of_unit_range_values() {
        let grid = ParticleGrid::new(2, Vec2::ONE);
        let mut state = StateTexture::from_grid(&grid);
        let p = Vec3::new(-5.25, 4.75, 3.999);
        state.set_position(1, 0, p);
        assert_eq!(state.position(1, 0), p);
        assert_eq!(state.as_bytes().len(), 4 * 16);
    }

    #[test]
    fn test_initial_pair_is_identical() {
        let grid = ParticleGrid::new(4, Vec2::new(10.0, 8.0));
        let pair = initial_state(&grid);
        assert_eq!(pair.read(), pair.write());
    }
}

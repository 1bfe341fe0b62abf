//! The backing byte buffer.
//!
//! An [`Arena`] is a plain `Vec<u8>` allocated to full capacity at pool
//! construction and released at `deinit` or drop. It knows nothing about
//! blocks; the descriptor chain decides which ranges are live.

/// A single contiguous byte buffer of fixed capacity.
///
/// The capacity never changes while the arena is live. `release` drops the
/// buffer and leaves a zero-capacity arena behind, which every subsequent
/// range check naturally rejects.
pub(crate) struct Arena {
    /// Backing storage. Allocated to full capacity at creation, zeroed.
    data: Vec<u8>,
}

impl Arena {
    /// Create an arena of `capacity` bytes.
    ///
    /// Allocation failure aborts the process — without an arena no pool
    /// operation can function, so this is the one fatal path in the crate.
    pub(crate) fn new(capacity: u32) -> Self {
        Self {
            data: vec![0u8; capacity as usize],
        }
    }

    /// Total capacity in bytes.
    pub(crate) fn capacity(&self) -> u32 {
        self.data.len() as u32
    }

    /// Shared view of `len` bytes starting at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset + len` exceeds capacity. Callers validate ranges
    /// against the descriptor chain first.
    pub(crate) fn slice(&self, offset: u32, len: u32) -> &[u8] {
        let start = offset as usize;
        &self.data[start..start + len as usize]
    }

    /// Mutable view of `len` bytes starting at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset + len` exceeds capacity.
    pub(crate) fn slice_mut(&mut self, offset: u32, len: u32) -> &mut [u8] {
        let start = offset as usize;
        &mut self.data[start..start + len as usize]
    }

    /// Copy `len` bytes from `src` to `dst` within the arena.
    ///
    /// The ranges may not overlap in practice (they belong to distinct
    /// blocks), but `copy_within` is defined for overlap anyway.
    pub(crate) fn copy_within(&mut self, src: u32, dst: u32, len: u32) {
        let src = src as usize;
        self.data.copy_within(src..src + len as usize, dst as usize);
    }

    /// Release the buffer, leaving a zero-capacity arena.
    pub(crate) fn release(&mut self) {
        self.data = Vec::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_arena_is_zeroed() {
        let arena = Arena::new(64);
        assert_eq!(arena.capacity(), 64);
        assert!(arena.slice(0, 64).iter().all(|&b| b == 0));
    }

    #[test]
    fn copy_within_moves_bytes() {
        let mut arena = Arena::new(32);
        arena.slice_mut(0, 4).copy_from_slice(&[1, 2, 3, 4]);
        arena.copy_within(0, 8, 4);
        assert_eq!(arena.slice(8, 4), &[1, 2, 3, 4]);
    }

    #[test]
    fn release_drops_capacity() {
        let mut arena = Arena::new(16);
        arena.release();
        assert_eq!(arena.capacity(), 0);
    }
}

//! Block descriptors and the offset-ordered descriptor chain.
//!
//! A [`BlockChain`] is the pool's bookkeeping: an ascending-offset list of
//! [`BlockDescriptor`]s that exactly partitions the arena. It is a plain
//! `Vec` rather than linked nodes — descriptor identity is positional, so
//! there is nothing to dangle.
//!
//! Chain invariants, upheld by every mutating operation:
//!
//! - the descriptors partition `[0, capacity)` with no gaps or overlaps;
//! - no two adjacent descriptors are both free (eager coalescing);
//! - every descriptor has a non-zero length.

/// One contiguous sub-range of the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockDescriptor {
    offset: u32,
    len: u32,
    free: bool,
}

impl BlockDescriptor {
    fn new(offset: u32, len: u32, free: bool) -> Self {
        debug_assert!(len > 0, "zero-length descriptor");
        Self { offset, len, free }
    }

    /// Byte offset of the block within the arena.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Length of the block in bytes.
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether the block is available for allocation.
    pub fn is_free(&self) -> bool {
        self.free
    }
}

/// The offset-ordered descriptor chain.
///
/// Stores descriptors in a `Vec` sorted by offset. First-fit search, block
/// lookup by exact offset, splitting and coalescing are all O(chain
/// length), which is the intended cost model for this allocator.
pub struct BlockChain {
    blocks: Vec<BlockDescriptor>,
}

impl BlockChain {
    /// Create a chain with a single free descriptor spanning `capacity`
    /// bytes, or an empty chain for a zero-capacity arena.
    pub fn new(capacity: u32) -> Self {
        let blocks = if capacity == 0 {
            Vec::new()
        } else {
            vec![BlockDescriptor::new(0, capacity, true)]
        };
        Self { blocks }
    }

    /// Drop every descriptor, leaving the chain of a zero-capacity arena.
    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    /// Number of descriptors in the chain.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the chain holds no descriptors.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// First-fit search: index of the first free descriptor with
    /// `len >= size`, scanning in ascending-offset order.
    pub fn first_fit(&self, size: u32) -> Option<usize> {
        self.blocks.iter().position(|b| b.free && b.len >= size)
    }

    /// Index of the descriptor starting at exactly `offset`.
    ///
    /// Interior offsets match nothing; handle identity is the block's
    /// base offset and only that.
    pub fn position_of(&self, offset: u32) -> Option<usize> {
        self.blocks.iter().position(|b| b.offset == offset)
    }

    /// Whether the descriptor at `index` is free.
    pub fn is_free(&self, index: usize) -> bool {
        self.blocks[index].free
    }

    /// Length of the descriptor at `index`.
    pub fn block_len(&self, index: usize) -> u32 {
        self.blocks[index].len
    }

    /// Offset of the descriptor at `index`.
    pub fn offset_of(&self, index: usize) -> u32 {
        self.blocks[index].offset
    }

    /// Allocate from the free descriptor at `index`, splitting off a free
    /// remainder when the block is strictly larger than `size`.
    ///
    /// Returns the granted length. This equals `size` unless the split
    /// was suppressed because the chain already holds `max_blocks`
    /// descriptors, in which case the whole block is granted instead —
    /// over-allocation is the documented degraded mode, never a failure.
    pub fn allocate(&mut self, index: usize, size: u32, max_blocks: u32) -> u32 {
        let BlockDescriptor { offset, len, free } = self.blocks[index];
        debug_assert!(free, "allocate on a non-free descriptor");
        debug_assert!(size > 0 && size <= len, "first-fit picked an unfit block");

        if len > size && (self.blocks.len() as u32) < max_blocks {
            self.blocks[index] = BlockDescriptor::new(offset, size, false);
            self.blocks
                .insert(index + 1, BlockDescriptor::new(offset + size, len - size, true));
            size
        } else {
            self.blocks[index].free = false;
            len
        }
    }

    /// Mark the descriptor at `index` free and coalesce with free
    /// neighbours, forward first, then backward.
    ///
    /// Releasing an already-free descriptor is a no-op.
    pub fn release(&mut self, index: usize) {
        if self.blocks[index].free {
            return;
        }
        self.blocks[index].free = true;

        if index + 1 < self.blocks.len() && self.blocks[index + 1].free {
            let next = self.blocks.remove(index + 1);
            self.blocks[index].len += next.len;
        }
        if index > 0 && self.blocks[index - 1].free {
            let current = self.blocks.remove(index);
            self.blocks[index - 1].len += current.len;
        }
    }

    /// Shrink the allocated descriptor at `index` to `new_len` bytes,
    /// returning the cut tail to the free list.
    ///
    /// The tail merges into a following free block when there is one, so
    /// no descriptor is spent; otherwise a new free descriptor is
    /// inserted, subject to the same `max_blocks` degradation as
    /// [`BlockChain::allocate`] — when the budget is exhausted the block
    /// keeps its full length. Returns the length the block ends up with.
    pub fn shrink(&mut self, index: usize, new_len: u32, max_blocks: u32) -> u32 {
        let BlockDescriptor { offset, len, free } = self.blocks[index];
        debug_assert!(!free, "shrink on a free descriptor");
        debug_assert!(new_len > 0 && new_len <= len, "shrink cannot grow a block");

        let cut = len - new_len;
        if cut == 0 {
            return len;
        }

        if index + 1 < self.blocks.len() && self.blocks[index + 1].free {
            self.blocks[index].len = new_len;
            let next = &mut self.blocks[index + 1];
            next.offset -= cut;
            next.len += cut;
            new_len
        } else if (self.blocks.len() as u32) < max_blocks {
            self.blocks[index].len = new_len;
            self.blocks
                .insert(index + 1, BlockDescriptor::new(offset + new_len, cut, true));
            new_len
        } else {
            len
        }
    }

    /// Total free bytes across the chain.
    pub fn free_bytes(&self) -> u32 {
        self.blocks.iter().filter(|b| b.free).map(|b| b.len).sum()
    }

    /// Length of the largest free block, or 0 when nothing is free.
    pub fn largest_free(&self) -> u32 {
        self.blocks
            .iter()
            .filter(|b| b.free)
            .map(|b| b.len)
            .max()
            .unwrap_or(0)
    }

    /// Iterate over descriptors in ascending-offset order.
    pub fn iter(&self) -> impl Iterator<Item = &BlockDescriptor> {
        self.blocks.iter()
    }

    /// Whether the chain invariants hold for an arena of `capacity` bytes.
    ///
    /// Used in debug assertions after every mutating pool operation.
    pub(crate) fn is_consistent(&self, capacity: u32) -> bool {
        if capacity == 0 {
            return self.blocks.is_empty();
        }
        let Some(first) = self.blocks.first() else {
            return false;
        };
        if first.offset != 0 {
            return false;
        }
        for pair in self.blocks.windows(2) {
            if pair[0].offset + pair[0].len != pair[1].offset {
                return false;
            }
            if pair[0].free && pair[1].free {
                return false;
            }
        }
        if self.blocks.iter().any(|b| b.len == 0) {
            return false;
        }
        let last = self.blocks.last().unwrap();
        last.offset + last.len == capacity
    }
}

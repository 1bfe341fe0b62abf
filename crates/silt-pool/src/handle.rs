//! Opaque block handles.
//!
//! A [`BlockHandle`] is the caller-facing reference to an allocated block.
//! It carries the block's arena offset (its identity) and length, but the
//! pool re-validates both against the descriptor chain on every use — a
//! handle is a claim, not a capability.

use std::fmt;

/// Opaque reference to an allocated block within a pool's arena.
///
/// Handles are `Copy` tokens valid from a successful allocation until the
/// matching `free` (or a relocating `resize`, which invalidates the old
/// handle). Callers must not derive neighbouring blocks from a handle's
/// offset; the offset is exposed for diagnostics and identity only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct BlockHandle {
    /// Byte offset of the block within the arena.
    pub(crate) offset: u32,
    /// Length of the block in bytes. Zero marks the sentinel.
    pub(crate) len: u32,
}

impl BlockHandle {
    /// Create a new handle.
    pub(crate) fn new(offset: u32, len: u32) -> Self {
        Self { offset, len }
    }

    /// The zero-size sentinel: returned by `alloc(0)`.
    ///
    /// It aliases the arena base but owns no bytes. Freeing it is a no-op
    /// and byte access through it is rejected.
    pub(crate) fn sentinel() -> Self {
        Self { offset: 0, len: 0 }
    }

    /// Byte offset of the block within the arena (diagnostic identity).
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Length of the block in bytes.
    ///
    /// May exceed the requested size when the pool granted a whole block
    /// because its descriptor budget was exhausted during splitting.
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether this is the zero-size sentinel handle.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Pack the handle into a `u64` for storage in external structures
    /// (e.g. pool-resident linked-list nodes).
    ///
    /// The packed form is opaque; the only valid use of the result is a
    /// later [`BlockHandle::from_raw`].
    pub fn to_raw(self) -> u64 {
        (u64::from(self.offset) << 32) | u64::from(self.len)
    }

    /// Reconstruct a handle previously packed with [`BlockHandle::to_raw`].
    ///
    /// The result is still validated by the pool on use, so a corrupted
    /// raw value yields an `UnknownHandle` error rather than misdirected
    /// byte access.
    pub fn from_raw(raw: u64) -> Self {
        Self {
            offset: (raw >> 32) as u32,
            len: raw as u32,
        }
    }
}

impl fmt::Display for BlockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHandle(off={}, len={})", self.offset, self.len)
    }
}

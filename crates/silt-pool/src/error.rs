//! Pool-specific error types.

use std::error::Error;
use std::fmt;

/// Errors that can occur during pool operations.
///
/// Exhaustion and invalid-reference conditions are ordinary results, not
/// panics; the only fatal condition in the crate is arena buffer
/// allocation at [`Pool`](crate::Pool) construction, which aborts the
/// process like any other infallible Rust allocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolError {
    /// No free block is large enough to satisfy the request.
    ///
    /// The pool is left exactly as it was; the caller decides whether to
    /// free other blocks, retry, or fail upward.
    Exhausted {
        /// Number of bytes requested.
        requested: u32,
        /// Length of the largest free block at the time of the request.
        largest_free: u32,
    },
    /// The handle does not match any allocated block's offset.
    ///
    /// Surfaced by `resize`, `read` and `write`, whose results are
    /// meaningful to the caller. `free` deliberately stays silent on the
    /// same condition.
    UnknownHandle {
        /// The offset carried by the rejected handle.
        offset: u32,
    },
    /// Byte access through the zero-size sentinel handle.
    ///
    /// The sentinel aliases the arena base but owns no bytes; reading or
    /// writing through it is always an error.
    SentinelAccess,
    /// A read or write longer than the owning block.
    OutOfBounds {
        /// Number of bytes the caller tried to transfer.
        requested: u32,
        /// Length of the owning block.
        block_len: u32,
    },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted {
                requested,
                largest_free,
            } => {
                write!(
                    f,
                    "pool exhausted: requested {requested} bytes, largest free block {largest_free} bytes"
                )
            }
            Self::UnknownHandle { offset } => {
                write!(f, "unknown handle: no allocated block at offset {offset}")
            }
            Self::SentinelAccess => {
                write!(f, "byte access through the zero-size sentinel handle")
            }
            Self::OutOfBounds {
                requested,
                block_len,
            } => {
                write!(
                    f,
                    "access of {requested} bytes exceeds block length {block_len}"
                )
            }
        }
    }
}

impl Error for PoolError {}

//! Fixed-capacity memory pool with first-fit allocation.
//!
//! A [`Pool`] owns a single contiguous byte arena, subdivided into
//! variable-sized blocks tracked by an ordered descriptor chain:
//!
//! ```text
//! Pool (coarse mutex)
//! ├── Arena (Vec<u8>, fixed capacity for its whole lifetime)
//! └── BlockChain → BlockDescriptor[] (offset-ordered, partitions the arena)
//! ```
//!
//! Allocation is **first-fit**: the chain is scanned in ascending-offset
//! order and the first free block large enough wins. Oversized blocks are
//! split into an allocated prefix and a free remainder; freed blocks are
//! eagerly coalesced with free neighbours so that no two adjacent blocks
//! are ever both free.
//!
//! Callers receive opaque [`BlockHandle`] tokens, never descriptors. All
//! operations — including pure lookups — serialize behind one mutex;
//! correctness over throughput. The one deliberate exception is the grow
//! path of [`Pool::resize`], which runs as a sequence of independently
//! locked steps so that it never re-enters the lock it already holds.
//!
//! # Safety
//!
//! The crate is `#![deny(unsafe_code)]`: handles are validated offsets
//! into the arena, and byte access goes through bounds-checked copying
//! accessors rather than raw pointers.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

mod arena;
pub mod block;
pub mod config;
pub mod error;
pub mod handle;
pub mod pool;

// Public re-exports for the primary API surface.
pub use config::PoolConfig;
pub use error::PoolError;
pub use handle::BlockHandle;
pub use pool::{BlockSpan, Pool, PoolStats};

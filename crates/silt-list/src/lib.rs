//! Thread-safe singly linked list with pool-resident nodes.
//!
//! A [`PoolList`] stores `u16` values in nodes allocated from a shared
//! [`silt_pool::Pool`] rather than the global allocator — the list is the
//! pool's first in-tree consumer. One coarse mutex serializes every list
//! operation, readers included: correctness over throughput, matching the
//! pool's own locking discipline.
//!
//! Node layout in pool bytes (10 bytes per node):
//!
//! ```text
//! [0..2]  value   u16 LE
//! [2..10] next    packed BlockHandle (u64 LE), NO_NEXT at end of list
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod error;
pub mod list;

pub use error::ListError;
pub use list::{NodeId, PoolList};

//! Shared scenario builders for the silt benchmarks.

use silt_pool::{BlockHandle, Pool, PoolConfig};

/// Capacity used by all pool benchmarks: 1 MiB.
pub const BENCH_CAPACITY: u32 = 1 << 20;

/// Build a bench pool with a descriptor budget that never degrades.
pub fn bench_pool() -> Pool {
    Pool::new(PoolConfig {
        capacity: BENCH_CAPACITY,
        max_blocks: 1 << 16,
    })
}

/// Fragment a pool by allocating `count` blocks of cycling sizes and
/// freeing every other one, returning the survivors.
///
/// Leaves the free list interleaved so that first-fit scans do real work.
pub fn fragment(pool: &Pool, count: usize) -> Vec<BlockHandle> {
    let sizes = [24u32, 96, 48, 160, 16, 64];
    let handles: Vec<BlockHandle> = (0..count)
        .map(|i| {
            pool.alloc(sizes[i % sizes.len()])
                .expect("bench pool sized to hold the working set")
        })
        .collect();
    let mut survivors = Vec::with_capacity(count / 2);
    for (i, handle) in handles.into_iter().enumerate() {
        if i % 2 == 0 {
            pool.free(handle);
        } else {
            survivors.push(handle);
        }
    }
    survivors
}

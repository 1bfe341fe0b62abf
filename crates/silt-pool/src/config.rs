//! Pool configuration parameters.

/// Configuration for a [`Pool`](crate::Pool).
///
/// Immutable after construction; the arena is sized once and never grows.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Arena capacity in bytes.
    ///
    /// Default: 1 MiB. A zero-capacity pool is valid but can satisfy only
    /// zero-size allocations.
    pub capacity: u32,

    /// Maximum number of block descriptors the chain may hold.
    ///
    /// Default: 4096. When a split would exceed this budget, the pool
    /// degrades by granting the whole block instead of failing the
    /// allocation — the caller receives more bytes than requested rather
    /// than an error. Values below 1 are treated as 1.
    pub max_blocks: u32,
}

impl PoolConfig {
    /// Default arena capacity: 1 MiB.
    pub const DEFAULT_CAPACITY: u32 = 1 << 20;

    /// Default descriptor budget.
    pub const DEFAULT_MAX_BLOCKS: u32 = 4096;

    /// Create a config with the given capacity and default descriptor budget.
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            max_blocks: Self::DEFAULT_MAX_BLOCKS,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_capacity_is_1mib() {
        let config = PoolConfig::default();
        assert_eq!(config.capacity, 1024 * 1024);
    }

    #[test]
    fn capacity_preserved() {
        let config = PoolConfig::new(4096);
        assert_eq!(config.capacity, 4096);
        assert_eq!(config.max_blocks, PoolConfig::DEFAULT_MAX_BLOCKS);
    }
}

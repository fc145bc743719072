use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

pub const DEFAULT_PIVOT_NUMBER: u64 = 0;
pub const DEFAULT_ANCIENT_BODIES_BARRIER: u64 = 0;
pub const DEFAULT_ANCIENT_RECEIPTS_BARRIER: u64 = 0;
pub const DEFAULT_BLOCK_INFO_CACHE_CAPACITY: usize = 64 * 1024;

/// Parameters of a bulk historical sync session.
///
/// `pivot_number` is the block the bodies and receipts feeds count down from.
/// The ancient barriers are the floors below which those feeds never request
/// anything, since older data is expected to arrive by another path.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub pivot_number: u64,
    pub ancient_bodies_barrier: u64,
    pub ancient_receipts_barrier: u64,
    pub block_info_cache_capacity: usize,
}

pub const DEFAULT_SYNC_CONFIG: SyncConfig = SyncConfig {
    pivot_number: DEFAULT_PIVOT_NUMBER,
    ancient_bodies_barrier: DEFAULT_ANCIENT_BODIES_BARRIER,
    ancient_receipts_barrier: DEFAULT_ANCIENT_RECEIPTS_BARRIER,
    block_info_cache_capacity: DEFAULT_BLOCK_INFO_CACHE_CAPACITY,
};

impl Default for SyncConfig {
    fn default() -> Self {
        DEFAULT_SYNC_CONFIG
    }
}

impl SyncConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open sync config {}", path.display()))?;
        let config: SyncConfig = serde_yaml::from_reader(file)
            .with_context(|| format!("failed to parse sync config {}", path.display()))?;

        info!(
            path = %path.display(),
            pivot = config.pivot_number,
            bodies_barrier = config.ancient_bodies_barrier,
            receipts_barrier = config.ancient_receipts_barrier,
            "Sync config loaded"
        );

        Ok(config)
    }

    /// Bodies floor, never above the pivot.
    pub fn ancient_bodies_barrier_calc(&self) -> u64 {
        clamp_barrier("bodies", self.ancient_bodies_barrier, self.pivot_number)
    }

    /// Receipts floor, never above the pivot.
    pub fn ancient_receipts_barrier_calc(&self) -> u64 {
        clamp_barrier("receipts", self.ancient_receipts_barrier, self.pivot_number)
    }
}

fn clamp_barrier(name: &str, barrier: u64, pivot: u64) -> u64 {
    if barrier > pivot {
        warn!(barrier, pivot, "Ancient {name} barrier above pivot, clamping to pivot");
    }
    barrier.min(pivot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_consistent() {
        let config = SyncConfig::default();
        assert_eq!(config, DEFAULT_SYNC_CONFIG);
        assert_eq!(config.block_info_cache_capacity, 65_536);
        assert!(config.ancient_bodies_barrier_calc() <= config.pivot_number);
    }

    #[test]
    fn barrier_is_clamped_to_pivot() {
        let config = SyncConfig {
            pivot_number: 100,
            ancient_bodies_barrier: 250,
            ancient_receipts_barrier: 40,
            ..SyncConfig::default()
        };
        assert_eq!(config.ancient_bodies_barrier_calc(), 100);
        assert_eq!(config.ancient_receipts_barrier_calc(), 40);
    }

    #[test]
    fn loads_partial_yaml_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "pivot_number: 1000\nancient_bodies_barrier: 900").unwrap();

        let config = SyncConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.pivot_number, 1000);
        assert_eq!(config.ancient_bodies_barrier, 900);
        assert_eq!(config.ancient_receipts_barrier, DEFAULT_ANCIENT_RECEIPTS_BARRIER);
        assert_eq!(config.block_info_cache_capacity, DEFAULT_BLOCK_INFO_CACHE_CAPACITY);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(SyncConfig::load_from_file("/nonexistent/sync.yaml").is_err());
    }
}

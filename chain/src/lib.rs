pub mod config;

pub use config::{SyncConfig, DEFAULT_SYNC_CONFIG};

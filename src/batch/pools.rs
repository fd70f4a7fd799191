//! Resource pools - explicit concurrency permits for scarce backends
//!
//! Three independent pools because the three backends have independent rate
//! limits: row pipelines, document downloads, and search queries. The pools
//! are plain values passed into the components that need them, so tests can
//! instantiate independent pools per run instead of sharing process-wide
//! singletons.

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::config::ConcurrencyConfig;

/// The shared permit pools of one batch-processing installation
#[derive(Clone)]
pub struct ResourcePools {
    /// Bounds simultaneous per-row pipelines
    pub rows: Arc<Semaphore>,
    /// Bounds simultaneous document downloads
    pub downloads: Arc<Semaphore>,
    /// Bounds simultaneous calls to the search backend
    pub searches: Arc<Semaphore>,
}

impl ResourcePools {
    /// Build pools from the concurrency configuration
    pub fn new(config: &ConcurrencyConfig) -> Self {
        Self {
            rows: Arc::new(Semaphore::new(config.max_rows)),
            downloads: Arc::new(Semaphore::new(config.max_downloads)),
            searches: Arc::new(Semaphore::new(config.max_searches)),
        }
    }
}

impl Default for ResourcePools {
    fn default() -> Self {
        Self::new(&ConcurrencyConfig::default())
    }
}

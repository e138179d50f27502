//! Latest-value metrics row.
//!
//! Units publish scalar metrics by key into a shared [`MetricsStore`]. Readers
//! such as the console unit hold a [`MetricsReader`], which shares the same
//! row by reference, so a lookup always returns the most recent value.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Metric keys published by the built-in units.
pub mod keys {
    pub const EPISODE_REWARD: &str = "Episode/Reward";
    pub const EPISODE_COST: &str = "Episode/Cost";
    pub const EPISODE_LENGTH: &str = "Episode/Length";
    pub const EPISODE_EXPLOIT: &str = "Episode/Exploit";
    pub const AVG_RPE_LAST_100: &str = "Average/RPE (Last 100)";
    pub const AVG_CPE_LAST_100: &str = "Average/CPE (Last 100)";
    pub const AVG_RPE: &str = "Average/RPE";
    pub const AVG_CPE: &str = "Average/CPE";
    pub const RUN_FRAMES: &str = "Run/Frames";
    pub const BUFFER_SIZE: &str = "Buffer/Size";
    pub const SAC_LOSS: &str = "SAC/Loss";
    pub const SAC_VALUE: &str = "SAC/Value";
    pub const SAC_ALPHA: &str = "SAC/Alpha";
    pub const SAC_ENTROPY: &str = "SAC/Entropy";
}

/// Read-only lookup of the latest metrics by key.
pub trait MetricsView {
    /// Latest value for `key`, if it was ever published.
    fn get(&self, key: &str) -> Option<f64>;
}

type Row = Arc<RwLock<BTreeMap<String, f64>>>;

/// Writable metrics row.
#[derive(Debug, Clone, Default)]
pub struct MetricsStore {
    row: Row,
}

impl MetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the latest value for `key`.
    pub fn set(&self, key: &str, value: f64) {
        self.row.write().insert(key.to_string(), value);
    }

    /// A read-only handle sharing this row.
    pub fn reader(&self) -> MetricsReader {
        MetricsReader {
            row: Arc::clone(&self.row),
        }
    }
}

impl MetricsView for MetricsStore {
    fn get(&self, key: &str) -> Option<f64> {
        self.row.read().get(key).copied()
    }
}

/// Read-only handle to a [`MetricsStore`] row.
#[derive(Debug, Clone)]
pub struct MetricsReader {
    row: Row,
}

impl MetricsView for MetricsReader {
    fn get(&self, key: &str) -> Option<f64> {
        self.row.read().get(key).copied()
    }
}

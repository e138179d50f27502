//! Metrics row and sinks.
//!
//! - [`MetricsStore`]: writable latest-value row shared by the units
//! - [`MetricsReader`] / [`MetricsView`]: read-only lookup by key
//! - [`CsvMetricsSink`]: per-episode CSV output

pub mod csv_sink;
pub mod store;

pub use csv_sink::{CsvMetricsSink, MetricsSink};
pub use store::{keys, MetricsReader, MetricsStore, MetricsView};

//! Episode metrics sinks.
//!
//! The statistics unit hands every finished episode to an optional
//! [`MetricsSink`]. [`CsvMetricsSink`] appends one row per episode.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use super::store::{keys, MetricsView};
use crate::core::run_state::RunState;
use crate::error::UnitError;

/// Backend receiving one record per finished episode.
pub trait MetricsSink {
    /// Record the episode that just ended.
    fn log(&mut self, state: &RunState, row: &dyn MetricsView) -> Result<(), UnitError>;

    /// Flush any buffered output.
    fn flush(&mut self) -> Result<(), UnitError>;
}

/// Columns written after the counters, in order.
const CSV_METRICS: [&str; 9] = [
    keys::EPISODE_REWARD,
    keys::EPISODE_COST,
    keys::EPISODE_LENGTH,
    keys::EPISODE_EXPLOIT,
    keys::AVG_RPE_LAST_100,
    keys::SAC_LOSS,
    keys::SAC_VALUE,
    keys::SAC_ALPHA,
    keys::SAC_ENTROPY,
];

/// CSV file sink for analysis.
pub struct CsvMetricsSink {
    writer: BufWriter<File>,
    start_time: Instant,
}

impl CsvMetricsSink {
    /// Create the file and write the header.
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write!(writer, "steps,episodes,frames")?;
        for key in CSV_METRICS {
            write!(writer, ",{}", key)?;
        }
        writeln!(writer, ",elapsed_secs")?;

        Ok(Self {
            writer,
            start_time: Instant::now(),
        })
    }
}

fn io_error(e: std::io::Error) -> UnitError {
    UnitError::Collaborator(format!("csv sink: {}", e))
}

impl MetricsSink for CsvMetricsSink {
    fn log(&mut self, state: &RunState, row: &dyn MetricsView) -> Result<(), UnitError> {
        write!(
            self.writer,
            "{},{},{}",
            state.global_step_count,
            state.episode_count,
            state.frames()
        )
        .map_err(io_error)?;

        // Missing metrics become empty cells
        for key in CSV_METRICS {
            let cell = row.get(key).map(|v| format!("{:.6}", v)).unwrap_or_default();
            write!(self.writer, ",{}", cell).map_err(io_error)?;
        }
        writeln!(self.writer, ",{:.2}", self.start_time.elapsed().as_secs_f32()).map_err(io_error)
    }

    fn flush(&mut self) -> Result<(), UnitError> {
        self.writer.flush().map_err(io_error)
    }
}

impl Drop for CsvMetricsSink {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

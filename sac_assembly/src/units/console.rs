//! Console summary unit.
//!
//! Reads the metrics row through a [`MetricsReader`], so every printed row
//! shows the latest values published by the units before it. One row per
//! episode, one summary block on close.

use std::io::Write;

use super::{EpisodeContext, StartContext, Unit, UnitKind};
use crate::core::run_state::RunState;
use crate::error::UnitError;
use crate::metrics::{keys, MetricsReader, MetricsView};

/// Where a column takes its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSource {
    Steps,
    Episodes,
    Metric(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleColumn {
    pub header: &'static str,
    pub source: ColumnSource,
}

impl ConsoleColumn {
    pub const fn metric(header: &'static str, key: &'static str) -> Self {
        Self {
            header,
            source: ColumnSource::Metric(key),
        }
    }
}

/// Default per-episode columns.
pub const DEFAULT_COLUMNS: [ConsoleColumn; 9] = [
    ConsoleColumn {
        header: "Steps",
        source: ColumnSource::Steps,
    },
    ConsoleColumn {
        header: "Episodes",
        source: ColumnSource::Episodes,
    },
    ConsoleColumn::metric("Len", keys::EPISODE_LENGTH),
    ConsoleColumn::metric("R", keys::EPISODE_REWARD),
    ConsoleColumn::metric("R(100)", keys::AVG_RPE_LAST_100),
    ConsoleColumn::metric("loss", keys::SAC_LOSS),
    ConsoleColumn::metric("v", keys::SAC_VALUE),
    ConsoleColumn::metric("alpha", keys::SAC_ALPHA),
    ConsoleColumn::metric("entropy", keys::SAC_ENTROPY),
];

const WIDTH: usize = 10;

pub struct ConsoleSummaryUnit {
    name: String,
    metrics: MetricsReader,
    columns: Vec<ConsoleColumn>,
    out: Box<dyn Write>,
    last_state: Option<RunState>,
}

fn write_error(e: std::io::Error) -> UnitError {
    UnitError::Collaborator(format!("console output: {}", e))
}

impl ConsoleSummaryUnit {
    pub fn new(name: impl Into<String>, metrics: MetricsReader, out: Box<dyn Write>) -> Self {
        Self {
            name: name.into(),
            metrics,
            columns: DEFAULT_COLUMNS.to_vec(),
            out,
            last_state: None,
        }
    }

    fn cell(&self, column: &ConsoleColumn, state: &RunState) -> String {
        match column.source {
            ColumnSource::Steps => state.global_step_count.to_string(),
            ColumnSource::Episodes => state.episode_count.to_string(),
            ColumnSource::Metric(key) => match self.metrics.get(key) {
                Some(v) if v.fract() == 0.0 && v.abs() < 1e9 => format!("{}", v as i64),
                Some(v) => format!("{:.3}", v),
                None => "-".to_string(),
            },
        }
    }

    fn summary_value(&self, key: &str) -> String {
        self.metrics
            .get(key)
            .map(|v| format!("{:.3}", v))
            .unwrap_or_else(|| "-".to_string())
    }
}

impl Unit for ConsoleSummaryUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> UnitKind {
        UnitKind::ConsoleSummary
    }

    fn start(&mut self, _ctx: &mut StartContext) -> Result<(), UnitError> {
        let header: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{:>width$}", c.header, width = WIDTH))
            .collect();
        writeln!(self.out, "{}", header.join(" ")).map_err(write_error)
    }

    fn post_episode(
        &mut self,
        state: &RunState,
        _episode: &EpisodeContext,
    ) -> Result<(), UnitError> {
        let row: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{:>width$}", self.cell(c, state), width = WIDTH))
            .collect();
        self.last_state = Some(*state);
        writeln!(self.out, "{}", row.join(" ")).map_err(write_error)
    }

    fn close(&mut self) -> Result<(), UnitError> {
        let (steps, episodes) = self
            .last_state
            .map(|s| (s.global_step_count, s.episode_count))
            .unwrap_or((0, 0));
        let avg_rpe = self.summary_value(keys::AVG_RPE);
        let avg_cpe = self.summary_value(keys::AVG_CPE);

        writeln!(self.out, "Total Steps: {}", steps).map_err(write_error)?;
        writeln!(self.out, "Total Episodes: {}", episodes).map_err(write_error)?;
        writeln!(self.out, "Average RPE: {}", avg_rpe).map_err(write_error)?;
        writeln!(self.out, "Average CPE: {}", avg_cpe).map_err(write_error)?;
        self.out.flush().map_err(write_error)
    }
}

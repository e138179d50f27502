//! Statistics-recording unit.
//!
//! Accumulates per-episode reward and cost sums and publishes them, with
//! running averages, into the shared metrics row at the end of every
//! episode. Presentation toggles:
//!
//! - `record_unscaled`: sums use the raw environment values instead of the
//!   scaled ones the rest of the run sees.
//! - `record_discounted`: sums are discounted with `gamma` / `cost_gamma`.

use std::collections::VecDeque;

use super::{EpisodeContext, StepFrame, Unit, UnitKind};
use crate::config::RunConfig;
use crate::core::phase::Phase;
use crate::core::run_state::RunState;
use crate::error::UnitError;
use crate::metrics::{keys, MetricsSink, MetricsStore};

/// Window of the "last 100" averages.
const RECENT_WINDOW: usize = 100;

/// Presentation settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsConfig {
    pub gamma: f32,
    pub cost_gamma: f32,
    pub record_unscaled: bool,
    pub record_discounted: bool,
}

impl StatsConfig {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            gamma: config.gamma,
            cost_gamma: config.cost_gamma,
            record_unscaled: config.record_unscaled,
            record_discounted: config.record_discounted,
        }
    }
}

/// Running sums of the current episode.
#[derive(Debug, Clone, Copy)]
struct EpisodeSums {
    reward: f64,
    cost: f64,
    reward_discount: f64,
    cost_discount: f64,
    length: u64,
}

impl EpisodeSums {
    fn new() -> Self {
        Self {
            reward: 0.0,
            cost: 0.0,
            reward_discount: 1.0,
            cost_discount: 1.0,
            length: 0,
        }
    }
}

pub struct StatsRecordingUnit {
    name: String,
    config: StatsConfig,
    metrics: MetricsStore,
    sink: Option<Box<dyn MetricsSink>>,
    current: EpisodeSums,
    phase: Phase,
    recent: VecDeque<(f64, f64)>,
    total_reward: f64,
    total_cost: f64,
    episodes: u64,
}

impl StatsRecordingUnit {
    pub fn new(name: impl Into<String>, config: StatsConfig, metrics: MetricsStore) -> Self {
        Self {
            name: name.into(),
            config,
            metrics,
            sink: None,
            current: EpisodeSums::new(),
            phase: Phase::TrainExplore,
            recent: VecDeque::with_capacity(RECENT_WINDOW),
            total_reward: 0.0,
            total_cost: 0.0,
            episodes: 0,
        }
    }

    /// Also hand every finished episode to `sink`.
    pub fn with_sink(mut self, sink: Box<dyn MetricsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Episodes recorded so far.
    pub fn episodes(&self) -> u64 {
        self.episodes
    }

    fn recent_means(&self) -> (f64, f64) {
        let n = self.recent.len().max(1) as f64;
        let (r, c) = self
            .recent
            .iter()
            .fold((0.0, 0.0), |(r, c), (er, ec)| (r + er, c + ec));
        (r / n, c / n)
    }
}

impl Unit for StatsRecordingUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> UnitKind {
        UnitKind::StatsRecording
    }

    fn pre_episode(
        &mut self,
        _state: &RunState,
        episode: &mut EpisodeContext,
    ) -> Result<(), UnitError> {
        self.current = EpisodeSums::new();
        self.phase = episode.phase;
        Ok(())
    }

    fn post_step(&mut self, _state: &RunState, frame: &mut StepFrame) -> Result<(), UnitError> {
        let (reward, cost) = if self.config.record_unscaled {
            (frame.raw_reward, frame.raw_cost)
        } else {
            (frame.reward, frame.cost)
        };

        let sums = &mut self.current;
        sums.reward += sums.reward_discount * reward as f64;
        sums.cost += sums.cost_discount * cost as f64;
        if self.config.record_discounted {
            sums.reward_discount *= self.config.gamma as f64;
            sums.cost_discount *= self.config.cost_gamma as f64;
        }
        sums.length += 1;
        Ok(())
    }

    fn post_episode(
        &mut self,
        state: &RunState,
        _episode: &EpisodeContext,
    ) -> Result<(), UnitError> {
        let sums = self.current;
        self.episodes += 1;
        self.total_reward += sums.reward;
        self.total_cost += sums.cost;
        if self.recent.len() == RECENT_WINDOW {
            self.recent.pop_front();
        }
        self.recent.push_back((sums.reward, sums.cost));
        let (recent_reward, recent_cost) = self.recent_means();

        let m = &self.metrics;
        m.set(keys::EPISODE_REWARD, sums.reward);
        m.set(keys::EPISODE_COST, sums.cost);
        m.set(keys::EPISODE_LENGTH, sums.length as f64);
        m.set(
            keys::EPISODE_EXPLOIT,
            if self.phase == Phase::TrainExploit { 1.0 } else { 0.0 },
        );
        m.set(keys::AVG_RPE_LAST_100, recent_reward);
        m.set(keys::AVG_CPE_LAST_100, recent_cost);
        m.set(keys::AVG_RPE, self.total_reward / self.episodes as f64);
        m.set(keys::AVG_CPE, self.total_cost / self.episodes as f64);
        m.set(keys::RUN_FRAMES, state.frames() as f64);

        if let Some(sink) = self.sink.as_mut() {
            sink.log(state, m)?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), UnitError> {
        match self.sink.as_mut() {
            Some(sink) => sink.flush(),
            None => Ok(()),
        }
    }
}

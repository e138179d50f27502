//! Experience-buffering unit (training runs only).
//!
//! Folds every scaled transition through an [`NStepAccumulator`] and stores
//! the results in a replay buffer it exclusively owns. Other units only get a
//! [`ReplayReader`].

use super::{EpisodeContext, StepFrame, Unit, UnitKind};
use crate::buffers::{NStepAccumulator, ReplayBuffer, ReplayReader, SharedReplayBuffer};
use crate::core::run_state::RunState;
use crate::core::transition::NStepTransition;
use crate::error::UnitError;
use crate::metrics::{keys, MetricsStore};

/// Construction parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperienceBufferConfig {
    pub nsteps: usize,
    pub gamma: f32,
    pub cost_gamma: f32,
    pub capacity: usize,
    pub ignore_done_on_timelimit: bool,
}

pub struct ExperienceBufferUnit {
    name: String,
    buffer: SharedReplayBuffer,
    accumulator: NStepAccumulator,
    metrics: MetricsStore,
}

impl ExperienceBufferUnit {
    pub fn new(
        name: impl Into<String>,
        config: &ExperienceBufferConfig,
        metrics: MetricsStore,
    ) -> Self {
        Self {
            name: name.into(),
            buffer: ReplayBuffer::shared(config.capacity),
            accumulator: NStepAccumulator::new(
                config.nsteps,
                config.gamma,
                config.cost_gamma,
                config.ignore_done_on_timelimit,
            ),
            metrics,
        }
    }

    /// Non-owning view for units registered after this one.
    pub fn reader(&self) -> ReplayReader {
        ReplayReader::new(&self.buffer)
    }

    fn store(&mut self, samples: Vec<NStepTransition>) {
        if samples.is_empty() {
            return;
        }
        let mut buffer = self.buffer.lock();
        for sample in samples {
            buffer.push(sample);
        }
        self.metrics.set(keys::BUFFER_SIZE, buffer.len() as f64);
    }
}

impl Unit for ExperienceBufferUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> UnitKind {
        UnitKind::ExperienceBuffer
    }

    fn post_step(&mut self, _state: &RunState, frame: &mut StepFrame) -> Result<(), UnitError> {
        let transition = frame.to_transition()?;
        let samples = self.accumulator.push(transition);
        self.store(samples);
        Ok(())
    }

    fn post_episode(
        &mut self,
        state: &RunState,
        _episode: &EpisodeContext,
    ) -> Result<(), UnitError> {
        // Episodes cut short by the driver leave partial windows behind
        let samples = self.accumulator.flush();
        self.store(samples);

        let buffer = self.buffer.lock();
        let (exploratory, exploit) = buffer.pushed_counts();
        log::debug!(
            "episode {}: buffer holds {} ({} exploratory / {} exploit pushed)",
            state.episode_count,
            buffer.len(),
            exploratory,
            exploit
        );
        Ok(())
    }
}

//! Episode-type controller unit.
//!
//! Decides the phase of every episode in `pre_episode` and stamps it onto the
//! episode context. The driver copies that phase onto each step frame.

use super::{EpisodeContext, Unit, UnitKind};
use crate::core::phase::{Phase, PhaseController};
use crate::core::run_state::RunState;
use crate::error::UnitError;

pub struct EpisodeTypeUnit {
    name: String,
    controller: PhaseController,
}

impl EpisodeTypeUnit {
    pub fn new(
        name: impl Into<String>,
        eval_mode: bool,
        min_explore_steps: u64,
        exploit_freq: Option<u64>,
    ) -> Self {
        Self {
            name: name.into(),
            controller: PhaseController::new(eval_mode, min_explore_steps, exploit_freq),
        }
    }

    /// Phase of the current episode.
    pub fn phase(&self) -> Phase {
        self.controller.phase()
    }
}

impl Unit for EpisodeTypeUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> UnitKind {
        UnitKind::EpisodeTypeControl
    }

    fn pre_episode(
        &mut self,
        state: &RunState,
        episode: &mut EpisodeContext,
    ) -> Result<(), UnitError> {
        episode.phase = self.controller.on_episode_start(state);
        Ok(())
    }
}

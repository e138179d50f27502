//! Behavioral units and the hooks the driver invokes on them.
//!
//! # Hook order
//!
//! ```text
//! start ──► ┌─► pre_episode ──► ┌─► act ──► env.step ──► post_step ─┐ ──► post_episode ─┐ ──► close
//!           │                   └──────────── until done ───────────┘                    │
//!           └──────────────────────────── until driver stops ─────────────────────────────┘
//! ```
//!
//! Within each hook, units run one at a time in registration order. Hooks
//! receive the run counters as an immutable [`RunState`] snapshot; only the
//! driver advances them.

pub mod console;
pub mod episode_type;
pub mod experience_buffer;
pub mod render;
pub mod reward_scaling;
pub mod sac;
pub mod seeding;
pub mod stats;
pub mod target_sync;

pub use console::{ConsoleColumn, ConsoleSummaryUnit};
pub use episode_type::EpisodeTypeUnit;
pub use experience_buffer::ExperienceBufferUnit;
pub use render::{RenderUnit, Renderer};
pub use reward_scaling::RewardScalingUnit;
pub use sac::{SacUnit, SacUnitConfig};
pub use seeding::{SeedSequence, SeedingUnit};
pub use stats::{StatsConfig, StatsRecordingUnit};
pub use target_sync::{GradientSteps, TargetSyncUnit};

use serde::{Deserialize, Serialize};

use crate::core::phase::Phase;
use crate::core::run_state::RunState;
use crate::core::transition::{Action, Transition};
use crate::environment::EnvStep;
use crate::error::UnitError;

/// Unit kinds, in the order the assembler registers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitKind {
    Seeding,
    RewardScaling,
    EpisodeTypeControl,
    ExperienceBuffer,
    PolicyUpdate,
    TargetSync,
    StatsRecording,
    ConsoleSummary,
    Render,
}

impl UnitKind {
    /// Kinds that must be registered strictly before a unit of this kind.
    pub fn required_predecessors(&self) -> &'static [UnitKind] {
        use UnitKind::*;
        match self {
            Seeding => &[],
            RewardScaling => &[Seeding],
            EpisodeTypeControl => &[Seeding],
            // Stores scaled rewards and needs the phase for every transition
            ExperienceBuffer => &[Seeding, RewardScaling, EpisodeTypeControl],
            PolicyUpdate => &[Seeding, EpisodeTypeControl, ExperienceBuffer],
            TargetSync => &[PolicyUpdate],
            StatsRecording => &[Seeding, RewardScaling],
            ConsoleSummary => &[StatsRecording],
            Render => &[Seeding],
        }
    }

    /// Kinds that only exist in training runs.
    pub fn is_train_only(&self) -> bool {
        matches!(self, UnitKind::ExperienceBuffer | UnitKind::TargetSync)
    }
}

/// Hook identifiers, for error attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hook {
    Start,
    PreEpisode,
    Act,
    PostStep,
    PostEpisode,
    Close,
}

/// Values units can set before the first episode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartContext {
    /// Seed the driver passes to the environment.
    pub env_seed: Option<u64>,
}

/// Per-episode values shared across units.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeContext {
    /// Phase decided at the episode boundary, fixed until the next one.
    pub phase: Phase,
}

/// Per-step values shared across units, in registration order.
#[derive(Debug, Clone, PartialEq)]
pub struct StepFrame {
    pub phase: Phase,
    pub observation: Vec<f32>,
    /// Set during `act`.
    pub action: Option<Action>,
    /// Set by the driver after the environment step.
    pub next_observation: Option<Vec<f32>>,
    pub raw_reward: f32,
    pub raw_cost: f32,
    /// Reward as seen by storing and aggregating units.
    pub reward: f32,
    /// Cost as seen by storing and aggregating units.
    pub cost: f32,
    pub terminal: bool,
    pub truncated: bool,
}

impl StepFrame {
    /// Frame for a step starting from `observation`.
    pub fn new(phase: Phase, observation: Vec<f32>) -> Self {
        Self {
            phase,
            observation,
            action: None,
            next_observation: None,
            raw_reward: 0.0,
            raw_cost: 0.0,
            reward: 0.0,
            cost: 0.0,
            terminal: false,
            truncated: false,
        }
    }

    /// Fill in the environment outcome. Scaled values start out unscaled.
    pub fn record_outcome(&mut self, outcome: EnvStep) {
        self.next_observation = Some(outcome.observation);
        self.raw_reward = outcome.reward;
        self.raw_cost = outcome.cost;
        self.reward = outcome.reward;
        self.cost = outcome.cost;
        self.terminal = outcome.terminal;
        self.truncated = outcome.truncated;
    }

    /// Whether this step ended the episode.
    pub fn done(&self) -> bool {
        self.terminal || self.truncated
    }

    /// The transition as stored by the buffering unit.
    pub fn to_transition(&self) -> Result<Transition, UnitError> {
        let action = self.action.clone().ok_or(UnitError::MissingInput("action"))?;
        let next_state = self
            .next_observation
            .clone()
            .ok_or(UnitError::MissingInput("next observation"))?;
        Ok(Transition {
            state: self.observation.clone(),
            action,
            reward: self.reward,
            cost: self.cost,
            next_state,
            terminal: self.terminal,
            truncated: self.truncated,
            exploratory: self.phase.is_exploration(),
        })
    }
}

/// An independently constructed behavioral module.
///
/// Every hook defaults to a no-op.
pub trait Unit {
    /// Unique name within the run.
    fn name(&self) -> &str;

    fn kind(&self) -> UnitKind;

    fn start(&mut self, _ctx: &mut StartContext) -> Result<(), UnitError> {
        Ok(())
    }

    fn pre_episode(
        &mut self,
        _state: &RunState,
        _episode: &mut EpisodeContext,
    ) -> Result<(), UnitError> {
        Ok(())
    }

    fn act(&mut self, _state: &RunState, _frame: &mut StepFrame) -> Result<(), UnitError> {
        Ok(())
    }

    /// Per-step hook, after the environment transition was counted.
    fn post_step(&mut self, _state: &RunState, _frame: &mut StepFrame) -> Result<(), UnitError> {
        Ok(())
    }

    fn post_episode(
        &mut self,
        _state: &RunState,
        _episode: &EpisodeContext,
    ) -> Result<(), UnitError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), UnitError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_predecessors_come_earlier() {
        let kinds = [
            UnitKind::Seeding,
            UnitKind::RewardScaling,
            UnitKind::EpisodeTypeControl,
            UnitKind::ExperienceBuffer,
            UnitKind::PolicyUpdate,
            UnitKind::TargetSync,
            UnitKind::StatsRecording,
            UnitKind::ConsoleSummary,
            UnitKind::Render,
        ];
        for kind in kinds {
            for required in kind.required_predecessors() {
                assert!(required < &kind, "{:?} requires later kind {:?}", kind, required);
            }
        }
    }

    #[test]
    fn test_frame_outcome_starts_unscaled() {
        let mut frame = StepFrame::new(Phase::TrainExplore, vec![0.0]);
        frame.record_outcome(EnvStep {
            observation: vec![1.0],
            reward: 2.0,
            cost: 0.5,
            terminal: false,
            truncated: true,
        });
        assert_eq!(frame.reward, frame.raw_reward);
        assert_eq!(frame.cost, frame.raw_cost);
        assert!(frame.done());
    }

    #[test]
    fn test_to_transition_requires_action_and_outcome() {
        let mut frame = StepFrame::new(Phase::TrainExploit, vec![0.0]);
        assert_eq!(frame.to_transition(), Err(UnitError::MissingInput("action")));

        frame.action = Some(Action::Discrete(1));
        assert_eq!(
            frame.to_transition(),
            Err(UnitError::MissingInput("next observation"))
        );

        frame.record_outcome(EnvStep {
            observation: vec![1.0],
            reward: 1.0,
            cost: 0.0,
            terminal: true,
            truncated: false,
        });
        let t = frame.to_transition().unwrap();
        assert!(!t.exploratory);
        assert!(t.terminal);
        assert_eq!(t.next_state, vec![1.0]);
    }
}

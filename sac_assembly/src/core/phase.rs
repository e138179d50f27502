//! Explore/exploit and train/eval phase schedule.
//!
//! ```text
//!             eval_mode                       !eval_mode
//!                │                                │
//!                ▼                                ▼
//!          ┌──────────┐                 ┌─────────────────┐
//!          │   EVAL   │                 │  TRAIN_EXPLORE  │◄──┐
//!          └──────────┘                 └────────┬────────┘   │
//!        (whole run)          steps >= min_explore_steps      │ otherwise
//!                             && episode % exploit_freq == 0  │
//!                                                ▼            │
//!                                       ┌─────────────────┐   │
//!                                       │  TRAIN_EXPLOIT  │───┘
//!                                       └─────────────────┘
//! ```
//!
//! The decision is only re-evaluated at episode boundaries; a phase never
//! changes mid-episode.

use serde::{Deserialize, Serialize};

use super::run_state::RunState;

/// Current phase of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Evaluation run: no exploration, no learning.
    Eval,
    /// Training, exploratory episode.
    TrainExplore,
    /// Training, exploit (greedy) episode.
    TrainExploit,
}

impl Phase {
    /// Whether this is an exploration step.
    #[inline]
    pub fn is_exploration(&self) -> bool {
        matches!(self, Self::TrainExplore)
    }

    /// Whether the run is in training mode (either train phase).
    #[inline]
    pub fn is_training(&self) -> bool {
        !matches!(self, Self::Eval)
    }

    /// Whether the policy should act greedily.
    #[inline]
    pub fn is_deterministic(&self) -> bool {
        !self.is_exploration()
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Eval => "eval",
            Self::TrainExplore => "explore",
            Self::TrainExploit => "exploit",
        }
    }
}

/// Phase state machine, advanced once per episode boundary.
#[derive(Debug, Clone)]
pub struct PhaseController {
    eval_mode: bool,
    min_explore_steps: u64,
    exploit_freq: Option<u64>,
    current: Phase,
}

impl PhaseController {
    /// Create a controller. EVAL is entered immediately and never left.
    pub fn new(eval_mode: bool, min_explore_steps: u64, exploit_freq: Option<u64>) -> Self {
        Self {
            eval_mode,
            min_explore_steps,
            exploit_freq,
            current: if eval_mode {
                Phase::Eval
            } else {
                Phase::TrainExplore
            },
        }
    }

    /// Phase of the current episode.
    pub fn phase(&self) -> Phase {
        self.current
    }

    /// Phase for an episode starting after `global_step_count` steps.
    pub fn decide(&self, global_step_count: u64, episode_index: u64) -> Phase {
        if self.eval_mode {
            return Phase::Eval;
        }
        let exploit_episode = self
            .exploit_freq
            .is_some_and(|freq| freq > 0 && episode_index % freq == 0);
        if global_step_count >= self.min_explore_steps && exploit_episode {
            Phase::TrainExploit
        } else {
            Phase::TrainExplore
        }
    }

    /// Re-evaluate at an episode boundary. Returns the new phase.
    pub fn on_episode_start(&mut self, state: &RunState) -> Phase {
        let next = self.decide(state.global_step_count, state.episode_count);
        if next != self.current {
            log::debug!(
                "phase {} -> {} at episode {} (step {})",
                self.current.label(),
                next.label(),
                state.episode_count,
                state.global_step_count
            );
        }
        self.current = next;
        next
    }
}

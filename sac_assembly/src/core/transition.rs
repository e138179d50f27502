//! Transition types flowing from the environment into the replay buffer.
//!
//! - `Action`: discrete index or continuous vector
//! - `Transition`: one environment step, rewards and costs already scaled
//! - `NStepTransition`: `nsteps` transitions folded into one bootstrapped sample

use std::fmt::Debug;

use super::episode_state::EpisodeState;

/// Action representation (discrete or continuous).
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Discrete action index
    Discrete(u32),
    /// Continuous action vector
    Continuous(Vec<f32>),
}

impl Action {
    /// Discrete action index, if this is a discrete action.
    pub fn as_discrete(&self) -> Option<u32> {
        match self {
            Action::Discrete(a) => Some(*a),
            Action::Continuous(_) => None,
        }
    }

    /// Continuous action vector, if this is a continuous action.
    pub fn as_continuous(&self) -> Option<&[f32]> {
        match self {
            Action::Discrete(_) => None,
            Action::Continuous(a) => Some(a),
        }
    }
}

/// One environment transition as seen by the buffering unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Current state observation
    pub state: Vec<f32>,
    /// Action taken
    pub action: Action,
    /// Scaled reward
    pub reward: f32,
    /// Scaled cost
    pub cost: f32,
    /// Next state observation
    pub next_state: Vec<f32>,
    /// Episode terminated (goal reached, failure, etc.)
    pub terminal: bool,
    /// Episode truncated (time limit, etc.)
    pub truncated: bool,
    /// Collected during an exploration episode
    pub exploratory: bool,
}

impl Transition {
    /// Check if episode ended (terminal or truncated).
    pub fn done(&self) -> bool {
        self.terminal || self.truncated
    }

    /// Terminal/truncated classification.
    pub fn episode_state(&self) -> EpisodeState {
        EpisodeState::from_flags(self.terminal, self.truncated)
    }
}

/// `m <= nsteps` consecutive transitions folded into one sample.
///
/// The bootstrap target is
/// `reward_return + bootstrap_discount * (1 - done) * V(next_state)`.
#[derive(Debug, Clone, PartialEq)]
pub struct NStepTransition {
    /// Observation at the first folded step
    pub state: Vec<f32>,
    /// Action at the first folded step
    pub action: Action,
    /// `Σ γ^k r_k` over the folded steps
    pub reward_return: f32,
    /// `Σ γc^k c_k` over the folded steps
    pub cost_return: f32,
    /// Observation after the last folded step
    pub next_state: Vec<f32>,
    /// Whether the bootstrap value must be zeroed
    pub done: bool,
    /// `γ^m`, m = number of folded steps
    pub bootstrap_discount: f32,
    /// Whether the first folded step came from an exploration episode
    pub exploratory: bool,
}

//! Environment abstraction for the run driver.
//!
//! The assembly layer never steps an environment itself; the [`Runner`]
//! does, through this trait.
//!
//! [`Runner`]: crate::runners::Runner

use crate::core::action_space::ActionSpace;
use crate::core::transition::Action;

/// Result of one environment transition.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvStep {
    /// Observation after the step.
    pub observation: Vec<f32>,
    /// Unscaled reward.
    pub reward: f32,
    /// Unscaled cost.
    pub cost: f32,
    /// Episode ended due to goal/failure.
    pub terminal: bool,
    /// Episode ended due to a time limit.
    pub truncated: bool,
}

impl EnvStep {
    /// Terminal OR truncated.
    pub fn done(&self) -> bool {
        self.terminal || self.truncated
    }
}

/// A single (non-vectorized) environment.
///
/// Errors are reported as messages and surface as
/// [`RunError::Environment`](crate::error::RunError::Environment).
pub trait Environment {
    /// Seed the environment's own randomness. Called once before the first reset.
    fn seed(&mut self, seed: u64);

    /// Start a new episode and return its first observation.
    fn reset(&mut self) -> Result<Vec<f32>, String>;

    /// Apply an action.
    fn step(&mut self, action: &Action) -> Result<EnvStep, String>;
}

/// Static description of an environment, needed at assembly time.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvSpec {
    /// Size of a flat observation vector.
    pub obs_size: usize,
    pub action_space: ActionSpace,
}

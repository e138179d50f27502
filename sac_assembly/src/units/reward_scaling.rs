//! Reward and cost scaling.
//!
//! Rewrites the frame's reward and cost in `post_step`, before any storing or
//! aggregating unit sees them. The raw values stay on the frame.

use super::{StepFrame, Unit, UnitKind};
use crate::core::run_state::RunState;
use crate::error::UnitError;

pub struct RewardScalingUnit {
    name: String,
    reward_scaling: f32,
    cost_scaling: f32,
}

impl RewardScalingUnit {
    pub fn new(name: impl Into<String>, reward_scaling: f32, cost_scaling: f32) -> Self {
        Self {
            name: name.into(),
            reward_scaling,
            cost_scaling,
        }
    }

    pub fn reward_scaling(&self) -> f32 {
        self.reward_scaling
    }

    pub fn cost_scaling(&self) -> f32 {
        self.cost_scaling
    }
}

impl Unit for RewardScalingUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> UnitKind {
        UnitKind::RewardScaling
    }

    fn post_step(&mut self, _state: &RunState, frame: &mut StepFrame) -> Result<(), UnitError> {
        frame.reward = frame.raw_reward * self.reward_scaling;
        frame.cost = frame.raw_cost * self.cost_scaling;
        Ok(())
    }
}

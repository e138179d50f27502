//! Learner collaborator interface.
//!
//! Gradient computation and the actor network live outside this crate. The
//! policy-update unit decides *when* to act and train; a [`SacLearner`]
//! decides *how*.

use burn::tensor::backend::Backend;

use super::critic::CriticSet;
use crate::buffers::ReplayBatch;
use crate::config::{NetworkShape, RunConfig};
use crate::core::action_space::PolicyKind;
use crate::core::transition::Action;
use crate::error::UnitError;

/// Hyperparameters handed to the learner at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct SacHyperParams {
    pub gamma: f32,
    pub nsteps: usize,
    pub mb_size: usize,
    pub td_clip: Option<f32>,
    pub grad_clip: Option<f32>,
    pub lr: f64,
    pub a_lr: f64,
    pub network: NetworkShape,
    /// Inference only: the learner is never asked to train.
    pub eval_mode: bool,
}

impl SacHyperParams {
    pub fn from_config(config: &RunConfig, network: NetworkShape) -> Self {
        Self {
            gamma: config.gamma,
            nsteps: config.nsteps,
            mb_size: config.mb_size,
            td_clip: config.td_clip,
            grad_clip: config.grad_clip,
            lr: config.lr,
            a_lr: config.a_lr,
            network,
            eval_mode: config.eval_mode,
        }
    }
}

/// Statistics of one training step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SacLossInfo {
    /// Critic loss.
    pub loss: f32,
    /// Mean Q-value of the sampled batch.
    pub value: f32,
    /// Mean policy entropy of the sampled batch.
    pub entropy: f32,
}

/// Variant-specific actor and gradient step.
pub trait SacLearner<B: Backend> {
    /// Action for one observation. `deterministic` selects the greedy action.
    fn select_action(&mut self, observation: &[f32], deterministic: bool)
        -> Result<Action, UnitError>;

    /// One gradient step on the critics (mutated in place) and the actor.
    fn train_step(
        &mut self,
        batch: &ReplayBatch,
        critics: &CriticSet<B>,
        alpha: f32,
    ) -> Result<SacLossInfo, UnitError>;
}

/// Builds the learner for the resolved policy variant.
pub trait LearnerProvider<B: Backend> {
    fn build(
        &mut self,
        kind: &PolicyKind,
        hyper: &SacHyperParams,
        device: &B::Device,
    ) -> Result<Box<dyn SacLearner<B>>, UnitError>;
}

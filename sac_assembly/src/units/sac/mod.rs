//! SAC policy-update unit.
//!
//! One unit covers both policy variants; the resolved [`PolicyKind`] decides
//! critic shapes, random-action sampling and the entropy target. The unit
//! owns the twin critics and their targets and exposes them to the target
//! copiers only through [`CriticRefs`].
//!
//! # Step behavior
//!
//! - `act`: uniformly random actions in TRAIN_EXPLORE before
//!   `min_explore_steps`; otherwise the learner acts, greedily outside
//!   exploration.
//! - `post_step`: one gradient step when the step is an exploration step past
//!   `min_explore_steps`, a multiple of `train_freq`, and the replay buffer
//!   holds at least `mb_size` transitions. Never in evaluation runs.

pub mod critic;
pub mod entropy;
pub mod learner;

pub use critic::{CriticPair, CriticRefs, CriticSet, QNetwork, QNetworkConfig};
pub use entropy::{target_entropy, EntropyTemperature};
pub use learner::{LearnerProvider, SacHyperParams, SacLearner, SacLossInfo};

use burn::tensor::backend::Backend;
use rand::rngs::StdRng;

use super::target_sync::GradientSteps;
use super::{StepFrame, Unit, UnitKind};
use crate::buffers::ReplayReader;
use crate::core::action_space::{PolicyKind, PolicyVariant};
use crate::core::phase::Phase;
use crate::core::run_state::RunState;
use crate::error::UnitError;
use crate::metrics::{keys, MetricsStore};

/// Construction parameters of [`SacUnit`].
#[derive(Debug, Clone, PartialEq)]
pub struct SacUnitConfig {
    pub kind: PolicyKind,
    pub obs_dim: usize,
    pub hyper: SacHyperParams,
    pub train_freq: u64,
    pub min_explore_steps: u64,
    pub sac_alpha: f32,
    pub fix_alpha: bool,
}

/// How a policy unit was wired at assembly time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyWiring {
    pub variant: PolicyVariant,
    pub has_buffer: bool,
    pub eval_mode: bool,
    pub fixed_alpha: bool,
}

pub struct SacUnit<B: Backend> {
    name: String,
    config: SacUnitConfig,
    critics: CriticSet<B>,
    buffer: Option<ReplayReader>,
    learner: Box<dyn SacLearner<B>>,
    temperature: EntropyTemperature,
    gradient_steps: GradientSteps,
    rng: StdRng,
    metrics: MetricsStore,
}

impl<B: Backend> SacUnit<B> {
    /// Build the unit and fresh critics. `buffer` is `None` in evaluation runs.
    pub fn new(
        name: impl Into<String>,
        config: SacUnitConfig,
        buffer: Option<ReplayReader>,
        learner: Box<dyn SacLearner<B>>,
        mut rng: StdRng,
        metrics: MetricsStore,
        device: &B::Device,
    ) -> Self {
        let critic_config =
            QNetworkConfig::for_policy(config.obs_dim, &config.kind, &config.hyper.network.hiddens);
        let temperature = EntropyTemperature::new(
            config.sac_alpha,
            target_entropy(&config.kind),
            config.hyper.a_lr,
            config.fix_alpha,
        );
        metrics.set(keys::SAC_ALPHA, temperature.alpha() as f64);
        let critics = CriticSet::new(&critic_config, device, &mut rng);

        Self {
            name: name.into(),
            critics,
            buffer,
            learner,
            temperature,
            gradient_steps: GradientSteps::new(),
            rng,
            metrics,
            config,
        }
    }

    /// Non-owning references to both critic pairs.
    pub fn critic_refs(&self) -> CriticRefs<B> {
        self.critics.refs()
    }

    /// Shared count of gradient steps taken so far.
    pub fn gradient_steps(&self) -> GradientSteps {
        self.gradient_steps.clone()
    }

    pub fn wiring(&self) -> PolicyWiring {
        PolicyWiring {
            variant: self.config.kind.variant(),
            has_buffer: self.buffer.is_some(),
            eval_mode: self.config.hyper.eval_mode,
            fixed_alpha: self.temperature.is_fixed(),
        }
    }

    pub fn alpha(&self) -> f32 {
        self.temperature.alpha()
    }

    fn acts_randomly(&self, state: &RunState, phase: Phase) -> bool {
        phase.is_exploration() && state.global_step_count < self.config.min_explore_steps
    }

    fn train_due(&self, state: &RunState, phase: Phase) -> bool {
        !self.config.hyper.eval_mode
            && phase.is_exploration()
            && state.global_step_count >= self.config.min_explore_steps
            && state.global_step_count % self.config.train_freq.max(1) == 0
    }

    fn train(&mut self, state: &RunState) -> Result<(), UnitError> {
        let Some(buffer) = &self.buffer else {
            return Ok(());
        };
        let Some(batch) = buffer.sample(self.config.hyper.mb_size, &mut self.rng)? else {
            return Ok(());
        };

        let info = self
            .learner
            .train_step(&batch, &self.critics, self.temperature.alpha())?;
        self.gradient_steps.record();
        if self.gradient_steps.get() == 1 {
            log::info!("{}: first gradient step at step {}", self.name, state.global_step_count);
        }
        let alpha = self.temperature.update(info.entropy);

        self.metrics.set(keys::SAC_LOSS, info.loss as f64);
        self.metrics.set(keys::SAC_VALUE, info.value as f64);
        self.metrics.set(keys::SAC_ENTROPY, info.entropy as f64);
        self.metrics.set(keys::SAC_ALPHA, alpha as f64);
        Ok(())
    }
}

impl<B: Backend> Unit for SacUnit<B> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> UnitKind {
        UnitKind::PolicyUpdate
    }

    fn act(&mut self, state: &RunState, frame: &mut StepFrame) -> Result<(), UnitError> {
        let action = if self.acts_randomly(state, frame.phase) {
            self.config.kind.sample_uniform(&mut self.rng)
        } else {
            self.learner
                .select_action(&frame.observation, frame.phase.is_deterministic())?
        };
        if !self.config.kind.contains(&action) {
            return Err(UnitError::InvalidAction(format!(
                "{:?} is outside {:?}",
                action, self.config.kind
            )));
        }
        frame.action = Some(action);
        Ok(())
    }

    fn post_step(&mut self, state: &RunState, frame: &mut StepFrame) -> Result<(), UnitError> {
        if self.train_due(state, frame.phase) {
            self.train(state)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;

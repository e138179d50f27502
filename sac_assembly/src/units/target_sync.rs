//! Target-network copier (training runs only), one per critic pair.
//!
//! Registered after the policy-update unit, so within a step it always blends
//! from the weights produced by that step's gradient update.

use burn::tensor::backend::Backend;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::sac::CriticPair;
use super::{StepFrame, Unit, UnitKind};
use crate::core::run_state::RunState;
use crate::core::target_network::{param_sizes, polyak_update, same_layout, TargetSyncSchedule};
use crate::error::UnitError;

/// Count of gradient steps taken by a policy unit.
///
/// Clones share the counter.
#[derive(Debug, Clone, Default)]
pub struct GradientSteps(Arc<AtomicU64>);

impl GradientSteps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct TargetSyncUnit<B: Backend> {
    name: String,
    pair: CriticPair<B>,
    schedule: TargetSyncSchedule,
    gradient_steps: GradientSteps,
    syncs: u64,
}

impl<B: Backend> TargetSyncUnit<B> {
    pub fn new(
        name: impl Into<String>,
        pair: CriticPair<B>,
        schedule: TargetSyncSchedule,
        gradient_steps: GradientSteps,
    ) -> Self {
        Self {
            name: name.into(),
            pair,
            schedule,
            gradient_steps,
            syncs: 0,
        }
    }

    /// Blends performed so far.
    pub fn syncs(&self) -> u64 {
        self.syncs
    }
}

impl<B: Backend> Unit for TargetSyncUnit<B> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> UnitKind {
        UnitKind::TargetSync
    }

    fn post_step(&mut self, state: &RunState, _frame: &mut StepFrame) -> Result<(), UnitError> {
        // Nothing to track before the first gradient step
        if self.gradient_steps.get() == 0 || !self.schedule.is_due(state) {
            return Ok(());
        }

        let source = self
            .pair
            .source
            .upgrade()
            .ok_or(UnitError::DanglingReference("source network"))?;
        let target = self
            .pair
            .target
            .upgrade()
            .ok_or(UnitError::DanglingReference("target network"))?;

        let source = source.lock().clone();
        let mut target = target.lock();
        if !same_layout::<B, _>(&source, &*target) {
            return Err(UnitError::LayoutMismatch {
                source_sizes: param_sizes::<B, _>(&source),
                target_sizes: param_sizes::<B, _>(&*target),
            });
        }
        let current = target.clone();
        *target = polyak_update::<B, _>(&source, current, self.schedule.polyak);

        self.syncs += 1;
        if self.syncs == 1 {
            log::debug!("{}: first target blend at step {}", self.name, state.global_step_count);
        }
        Ok(())
    }
}

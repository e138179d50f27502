//! Target network utilities for stable value estimation.
//!
//! Target networks are copies of the critics that trail the trained weights,
//! providing stable bootstrap targets during training.
//!
//! # Polyak Averaging
//!
//! ```text
//! θ_target = polyak * θ_target + (1 - polyak) * θ_source
//! ```
//!
//! With `polyak` close to 1 (typically 0.995) the target evolves smoothly.
//! Internally the blend is carried out as a soft update with
//! `tau = 1 - polyak`.
//!
//! # Ownership
//!
//! The policy-update unit owns its networks through [`SharedNetwork`]
//! handles. Synchronization units only keep [`NetworkRef`]s (weak handles),
//! so they always read the current source weights and never keep a network
//! alive on their own.

use burn::module::{Module, ModuleMapper, Param};
use burn::prelude::*;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

use super::run_state::RunState;

/// Owning handle to a network shared between units.
pub type SharedNetwork<M> = Arc<Mutex<M>>;

/// Non-owning handle to a network owned by another unit.
pub type NetworkRef<M> = Weak<Mutex<M>>;

/// Wrap a network in an owning shared handle.
pub fn share<M>(network: M) -> SharedNetwork<M> {
    Arc::new(Mutex::new(network))
}

// ============================================================================
// Soft Update Implementation via ModuleMapper
// ============================================================================

/// Collects every float parameter, flattened to 1D, in traversal order.
///
/// Traversal order is deterministic for modules with the same architecture,
/// which lets parameters be matched between two independently created models.
struct ParamExtractor<B: Backend> {
    params: Vec<Tensor<B, 1>>,
}

impl<B: Backend> ModuleMapper<B> for ParamExtractor<B> {
    fn map_float<const D: usize>(&mut self, param: Param<Tensor<B, D>>) -> Param<Tensor<B, D>> {
        let val = param.val();
        let total_size: usize = val.dims().iter().product();
        self.params.push(val.reshape([total_size]));
        param
    }
}

/// Interpolates each target parameter toward the source parameter at the same
/// traversal index: `tau * θ_source + (1 - tau) * θ_target`.
struct SoftUpdateMapper<B: Backend> {
    source_params: Vec<Tensor<B, 1>>,
    tau: f32,
    index: usize,
}

impl<B: Backend> ModuleMapper<B> for SoftUpdateMapper<B> {
    fn map_float<const D: usize>(&mut self, param: Param<Tensor<B, D>>) -> Param<Tensor<B, D>> {
        let target_val = param.val();
        let shape = target_val.dims();
        let total_size: usize = shape.iter().product();

        let idx = self.index;
        self.index += 1;

        match self.source_params.get(idx) {
            Some(source) => {
                let blended = source.clone().mul_scalar(self.tau)
                    + target_val.reshape([total_size]).mul_scalar(1.0 - self.tau);
                Param::initialized(param.id.clone(), blended.reshape(shape))
            }
            None => param,
        }
    }
}

fn extract_params<B, M>(module: &M) -> Vec<Tensor<B, 1>>
where
    B: Backend,
    M: Module<B>,
{
    let mut extractor = ParamExtractor { params: Vec::new() };
    let _ = module.clone().map(&mut extractor);
    extractor.params
}

/// Soft update from `source` into `target`: `θ_target = tau * θ_source + (1 - tau) * θ_target`.
///
/// `tau = 1` is a hard copy, `tau = 0` leaves the target untouched.
/// Parameters are paired by traversal index, so both modules must pass
/// [`same_layout`]. Target parameters past the end of the source are kept.
pub fn soft_update<B, M>(source: &M, target: M, tau: f32) -> M
where
    B: Backend,
    M: Module<B>,
{
    if (tau - 1.0).abs() < 1e-6 {
        return source.clone();
    }
    if tau.abs() < 1e-6 {
        return target;
    }

    let mut updater = SoftUpdateMapper {
        source_params: extract_params::<B, M>(source),
        tau,
        index: 0,
    };
    target.map(&mut updater)
}

/// Polyak blend: `θ_target = polyak * θ_target + (1 - polyak) * θ_source`.
pub fn polyak_update<B, M>(source: &M, target: M, polyak: f32) -> M
where
    B: Backend,
    M: Module<B>,
{
    soft_update::<B, M>(source, target, 1.0 - polyak)
}

/// All float parameters of a module, flattened and concatenated in traversal order.
pub fn flatten_params<B, M>(module: &M) -> Vec<f32>
where
    B: Backend,
    M: Module<B>,
{
    extract_params::<B, M>(module)
        .into_iter()
        .flat_map(|t| t.into_data().iter::<f32>().collect::<Vec<_>>())
        .collect()
}

/// Flattened size of every float parameter, in traversal order.
pub fn param_sizes<B, M>(module: &M) -> Vec<usize>
where
    B: Backend,
    M: Module<B>,
{
    extract_params::<B, M>(module)
        .iter()
        .map(|t| t.dims()[0])
        .collect()
}

/// Whether two modules have the same parameter sizes in the same order.
pub fn same_layout<B, M>(source: &M, target: &M) -> bool
where
    B: Backend,
    M: Module<B>,
{
    param_sizes::<B, M>(source) == param_sizes::<B, M>(target)
}

// ============================================================================
// Sync schedule
// ============================================================================

/// When a target copier blends its networks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetSyncSchedule {
    /// Blending coefficient, `θ_target = polyak * θ_target + (1 - polyak) * θ_source`.
    pub polyak: f32,
    /// Copy cadence in environment frames. 1 means every step.
    pub copy_every: u64,
    /// No copies before this many steps, matching the training gate.
    pub min_explore_steps: u64,
}

impl TargetSyncSchedule {
    /// Create a schedule that blends every eligible step.
    pub fn every_step(polyak: f32, min_explore_steps: u64) -> Self {
        Self {
            polyak,
            copy_every: 1,
            min_explore_steps,
        }
    }

    /// Set the copy cadence in frames.
    pub fn with_copy_every(mut self, copy_every: u64) -> Self {
        self.copy_every = copy_every;
        self
    }

    /// Copy cadence in agent steps: `ceil(copy_every / frameskip)`, at least 1.
    pub fn copy_interval(&self, frameskip: u64) -> u64 {
        self.copy_every.div_ceil(frameskip.max(1)).max(1)
    }

    /// Whether a blend is due at this step.
    pub fn is_due(&self, state: &RunState) -> bool {
        state.global_step_count >= self.min_explore_steps
            && state.global_step_count % self.copy_interval(state.frameskip) == 0
    }
}

//! Core types shared by every unit.

pub mod action_space;
pub mod episode_state;
pub mod phase;
pub mod run_state;
pub mod target_network;
pub mod transition;

pub use action_space::{resolve, ActionSpace, PolicyKind, PolicyVariant};
pub use episode_state::EpisodeState;
pub use phase::{Phase, PhaseController};
pub use run_state::{RunCounters, RunState};
pub use target_network::{
    flatten_params, param_sizes, polyak_update, share, soft_update, NetworkRef, SharedNetwork,
    TargetSyncSchedule,
};
pub use transition::{Action, NStepTransition, Transition};

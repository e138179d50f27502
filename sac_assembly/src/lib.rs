//! # SAC Assembly: Training-Unit Assembly and Step Sequencing
//!
//! Builds the ordered list of independently constructed units that make up a
//! Soft Actor-Critic run and drives them through a single environment.
//!
//! ## Unit Order
//!
//! ```text
//! ┌──────────────┐  ┌──────────────┐  ┌───────────────────────┐
//! │ SeedingAgent │─►│ RewardScaler │─►│ EpisodeTypeController │
//! └──────────────┘  └──────────────┘  └───────────┬───────────┘
//!                                                 ▼
//!        ┌──────────────────┐   ┌────────────────────────────────┐
//!        │ ExpBuffAgent     │──►│ SACAgent / SACDiscreteAgent    │
//!        │ (training only)  │   │ owns critics and target copies │
//!        └──────────────────┘   └───────────────┬────────────────┘
//!                                               ▼
//!        ┌──────────────────────────────────────────────────┐
//!        │ TargetNetCopier1, TargetNetCopier2 (training only) │
//!        └───────────────────────┬──────────────────────────┘
//!                                ▼
//!   ┌───────────────┐   ┌────────────────┐   ┌───────────────────┐
//!   │ StatsRecorder │──►│ ConsolePrinter │──►│ SimpleRenderAgent │
//!   └───────────────┘   └────────────────┘   └───────────────────┘
//! ```
//!
//! Every hook runs the units in this order, so a unit always sees the
//! effects of the units registered before it within the same step.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sac_assembly::{assemble, Collaborators, RunConfig, RunLimits, Runner};
//!
//! let config = RunConfig::from_file("run.toml")?.with_seed(Some(42));
//! let collaborators = Collaborators::new(Box::new(my_learners));
//! let assembly = assemble::<B>(&config, &env_spec, collaborators, &device)?;
//!
//! let mut runner = Runner::new(assembly, env);
//! runner.run(RunLimits::steps(1_000_000))?;
//! ```

pub mod assembly;
pub mod buffers;
pub mod config;
pub mod core;
pub mod environment;
pub mod error;
pub mod metrics;
pub mod runners;
pub mod units;

#[cfg(test)]
mod test_support;

// Assembly and driving
pub use assembly::{assemble, names, Assembler, Assembly, Collaborators, UnitRecord};
pub use runners::{RunLimits, Runner};

pub use config::{ConfigError, ConvSpec, NetworkShape, RunConfig};
pub use error::{AssemblyError, RunError, UnitError};

pub use crate::core::action_space::{ActionSpace, PolicyKind, PolicyVariant};
pub use crate::core::phase::Phase;
pub use crate::core::run_state::RunState;
pub use crate::core::transition::{Action, NStepTransition, Transition};

pub use buffers::{ReplayBatch, ReplayReader};
pub use environment::{EnvSpec, EnvStep, Environment};
pub use metrics::{keys, CsvMetricsSink, MetricsReader, MetricsSink, MetricsView};

// Unit contract
pub use units::sac::{CriticSet, LearnerProvider, SacHyperParams, SacLearner, SacLossInfo};
pub use units::{EpisodeContext, Hook, Renderer, StartContext, StepFrame, Unit, UnitKind};

//! Error taxonomy for assembly and stepping.
//!
//! - [`AssemblyError`]: configuration and ordering errors, fatal before any step runs.
//! - [`UnitError`]: a single unit's hook failed.
//! - [`RunError`]: what the driver reports, attributing a [`UnitError`] to a unit,
//!   hook and step.

use std::fmt;

use crate::config::ConfigError;
use crate::core::action_space::ActionSpace;
use crate::units::{Hook, UnitKind};

/// Errors raised while building the ordered unit list.
#[derive(Debug, Clone, PartialEq)]
pub enum AssemblyError {
    /// The configuration failed validation.
    Config(ConfigError),
    /// No policy-update variant exists for this action space.
    UnsupportedActionSpace(ActionSpace),
    /// Two units were registered under the same name.
    DuplicateUnitName(String),
    /// A unit named a dependency that was not registered strictly before it.
    OrderingViolation { unit: String, missing: String },
    /// A unit was registered before a unit kind it requires.
    MissingPredecessor { unit: String, required: UnitKind },
    /// A collaborator needed to construct a unit failed.
    Collaborator { unit: String, source: UnitError },
}

impl fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssemblyError::Config(e) => write!(f, "configuration error: {}", e),
            AssemblyError::UnsupportedActionSpace(space) => {
                write!(f, "Unsupported Action Space {:?}", space)
            }
            AssemblyError::DuplicateUnitName(name) => {
                write!(f, "unit name {:?} registered twice", name)
            }
            AssemblyError::OrderingViolation { unit, missing } => {
                write!(
                    f,
                    "unit {:?} depends on {:?}, which is not registered before it",
                    unit, missing
                )
            }
            AssemblyError::MissingPredecessor { unit, required } => {
                write!(
                    f,
                    "unit {:?} requires a {:?} unit registered before it",
                    unit, required
                )
            }
            AssemblyError::Collaborator { unit, source } => {
                write!(f, "could not construct unit {:?}: {}", unit, source)
            }
        }
    }
}

impl std::error::Error for AssemblyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssemblyError::Config(e) => Some(e),
            AssemblyError::Collaborator { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for AssemblyError {
    fn from(e: ConfigError) -> Self {
        AssemblyError::Config(e)
    }
}

/// Failure inside a single unit hook.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitError {
    /// An external collaborator (learner, renderer, metrics sink) failed.
    Collaborator(String),
    /// A non-owning reference outlived the unit that owns the referent.
    DanglingReference(&'static str),
    /// The frame did not carry what this hook needs.
    MissingInput(&'static str),
    /// An action does not belong to the configured action space.
    InvalidAction(String),
    /// Source and target networks have different parameter layouts.
    LayoutMismatch {
        source_sizes: Vec<usize>,
        target_sizes: Vec<usize>,
    },
}

impl fmt::Display for UnitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitError::Collaborator(msg) => write!(f, "collaborator failed: {}", msg),
            UnitError::DanglingReference(what) => {
                write!(f, "{} was dropped by its owning unit", what)
            }
            UnitError::MissingInput(what) => write!(f, "step frame has no {}", what),
            UnitError::InvalidAction(msg) => write!(f, "invalid action: {}", msg),
            UnitError::LayoutMismatch {
                source_sizes,
                target_sizes,
            } => write!(
                f,
                "source parameter sizes {:?} do not match target sizes {:?}",
                source_sizes, target_sizes
            ),
        }
    }
}

impl std::error::Error for UnitError {}

/// Errors surfaced by the run driver.
#[derive(Debug, Clone, PartialEq)]
pub enum RunError {
    /// A unit hook failed at the given global step.
    Unit {
        unit: String,
        hook: Hook,
        step: u64,
        source: UnitError,
    },
    /// No unit produced an action during the `act` hooks.
    MissingAction { step: u64 },
    /// The environment failed to reset or step.
    Environment(String),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Unit {
                unit,
                hook,
                step,
                source,
            } => write!(f, "unit {:?} failed in {:?} at step {}: {}", unit, hook, step, source),
            RunError::MissingAction { step } => {
                write!(f, "no unit produced an action at step {}", step)
            }
            RunError::Environment(msg) => write!(f, "environment error: {}", msg),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Unit { source, .. } => Some(source),
            _ => None,
        }
    }
}

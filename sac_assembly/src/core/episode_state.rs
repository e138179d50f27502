//! Type-safe episode termination classification.
//!
//! # Key Distinction
//!
//! - **Terminal**: Episode truly ended (agent died, goal reached, absorbing state)
//!   - Bootstrap value: 0.0 (no future rewards possible)
//!
//! - **Truncated**: Episode hit an external limit (time limit, step limit)
//!   - Bootstrap value: V(s') when time-limit dones are ignored, 0.0 otherwise
//!
//! # Usage
//!
//! ```ignore
//! use sac_assembly::core::EpisodeState;
//!
//! let state = EpisodeState::from_flags(terminal, truncated);
//! let done = state.done_for_bootstrap(config.ignore_done_on_timelimit());
//! ```

/// Episode state classification for correct terminal/truncated handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EpisodeState {
    /// Episode is ongoing, no termination.
    #[default]
    Running,
    /// Episode terminated due to reaching an absorbing state.
    Terminal,
    /// Episode truncated due to external limit (time, steps).
    Truncated,
}

impl EpisodeState {
    /// Create episode state from terminal and truncated flags.
    ///
    /// If both are true, Terminal takes precedence.
    #[inline]
    pub fn from_flags(terminal: bool, truncated: bool) -> Self {
        if terminal {
            Self::Terminal
        } else if truncated {
            Self::Truncated
        } else {
            Self::Running
        }
    }

    /// The done flag stored for bootstrapping.
    ///
    /// A truncation only zeroes the bootstrap value when time-limit dones
    /// are not ignored.
    #[inline]
    pub fn done_for_bootstrap(&self, ignore_done_on_timelimit: bool) -> bool {
        match self {
            Self::Running => false,
            Self::Terminal => true,
            Self::Truncated => !ignore_done_on_timelimit,
        }
    }

    /// Whether the episode is done (either terminal or truncated).
    #[inline]
    pub fn is_done(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

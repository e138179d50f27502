//! Shared run counters.
//!
//! The driver owns a [`RunCounters`] and is the only thing that mutates it.
//! Units receive a [`RunState`] snapshot by shared reference in every hook,
//! so they can read the counters but never change them.

use serde::{Deserialize, Serialize};

/// Immutable snapshot of the run counters handed to unit hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    /// Environment transitions so far, incremented once per transition.
    pub global_step_count: u64,
    /// Episodes started so far. During the first episode this is 1.
    pub episode_count: u64,
    /// Transitions in the current episode.
    pub episode_step_count: u64,
    /// Environment frames per agent step, fixed for the run.
    pub frameskip: u64,
}

impl RunState {
    /// Total environment frames consumed.
    pub fn frames(&self) -> u64 {
        self.global_step_count * self.frameskip
    }
}

/// Driver-owned run counters.
#[derive(Debug, Clone)]
pub struct RunCounters {
    state: RunState,
}

impl RunCounters {
    /// Create counters for a run with the given frameskip.
    pub fn new(frameskip: u64) -> Self {
        Self {
            state: RunState {
                global_step_count: 0,
                episode_count: 0,
                episode_step_count: 0,
                frameskip: frameskip.max(1),
            },
        }
    }

    /// Start a new episode.
    pub fn begin_episode(&mut self) {
        self.state.episode_count += 1;
        self.state.episode_step_count = 0;
    }

    /// Count one environment transition.
    pub fn record_transition(&mut self) {
        self.state.global_step_count += 1;
        self.state.episode_step_count += 1;
    }

    /// Snapshot for unit hooks.
    pub fn snapshot(&self) -> RunState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let counters = RunCounters::new(4);
        let state = counters.snapshot();
        assert_eq!(state.global_step_count, 0);
        assert_eq!(state.episode_count, 0);
        assert_eq!(state.episode_step_count, 0);
        assert_eq!(state.frameskip, 4);
    }

    #[test]
    fn test_episode_boundary_resets_episode_steps_only() {
        let mut counters = RunCounters::new(1);
        counters.begin_episode();
        counters.record_transition();
        counters.record_transition();
        assert_eq!(counters.snapshot().episode_step_count, 2);

        counters.begin_episode();
        let state = counters.snapshot();
        assert_eq!(state.episode_count, 2);
        assert_eq!(state.episode_step_count, 0);
        assert_eq!(state.global_step_count, 2);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut counters = RunCounters::new(1);
        counters.begin_episode();
        let before = counters.snapshot();
        counters.record_transition();
        assert_eq!(before.global_step_count, 0);
        assert_eq!(counters.snapshot().global_step_count, 1);
    }

    #[test]
    fn test_frames_scale_with_frameskip() {
        let mut counters = RunCounters::new(4);
        counters.begin_episode();
        for _ in 0..3 {
            counters.record_transition();
        }
        assert_eq!(counters.snapshot().frames(), 12);
    }

    #[test]
    fn test_zero_frameskip_clamped() {
        assert_eq!(RunCounters::new(0).snapshot().frameskip, 1);
    }
}

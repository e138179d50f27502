//! Single-environment run driver.
//!
//! The [`Runner`] owns the assembled units, the environment and the run
//! counters. It walks the hook sequence, dispatching each hook to every unit
//! in registration order, and is the only place the counters advance.

use burn::tensor::backend::Backend;

use crate::assembly::Assembly;
use crate::core::phase::Phase;
use crate::core::run_state::{RunCounters, RunState};
use crate::environment::Environment;
use crate::error::{RunError, UnitError};
use crate::units::{EpisodeContext, Hook, StartContext, StepFrame, Unit};

/// When to stop a run. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunLimits {
    /// Stop after this many environment transitions.
    pub max_steps: Option<u64>,
    /// Stop after this many episodes.
    pub max_episodes: Option<u64>,
}

impl RunLimits {
    pub fn steps(max_steps: u64) -> Self {
        Self {
            max_steps: Some(max_steps),
            max_episodes: None,
        }
    }

    pub fn episodes(max_episodes: u64) -> Self {
        Self {
            max_steps: None,
            max_episodes: Some(max_episodes),
        }
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn with_max_episodes(mut self, max_episodes: u64) -> Self {
        self.max_episodes = Some(max_episodes);
        self
    }

    fn steps_reached(&self, state: &RunState) -> bool {
        self.max_steps
            .is_some_and(|max| state.global_step_count >= max)
    }

    fn episodes_reached(&self, state: &RunState) -> bool {
        self.max_episodes
            .is_some_and(|max| state.episode_count >= max)
    }
}

/// Run one hook on every unit, attributing the first failure.
fn dispatch<F>(
    units: &mut [Box<dyn Unit>],
    hook: Hook,
    step: u64,
    mut f: F,
) -> Result<(), RunError>
where
    F: FnMut(&mut dyn Unit) -> Result<(), UnitError>,
{
    for unit in units.iter_mut() {
        f(unit.as_mut()).map_err(|source| RunError::Unit {
            unit: unit.name().to_string(),
            hook,
            step,
            source,
        })?;
    }
    Ok(())
}

/// Drives an [`Assembly`] against an [`Environment`].
pub struct Runner<B: Backend, E: Environment> {
    assembly: Assembly<B>,
    env: E,
    counters: RunCounters,
}

impl<B: Backend, E: Environment> Runner<B, E> {
    pub fn new(assembly: Assembly<B>, env: E) -> Self {
        let counters = RunCounters::new(assembly.frameskip());
        Self {
            assembly,
            env,
            counters,
        }
    }

    pub fn assembly(&self) -> &Assembly<B> {
        &self.assembly
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    /// Current counter snapshot.
    pub fn state(&self) -> RunState {
        self.counters.snapshot()
    }

    /// Give back the assembly and environment.
    pub fn into_parts(self) -> (Assembly<B>, E) {
        (self.assembly, self.env)
    }

    /// Run episodes until a limit is hit, then close every unit.
    ///
    /// An episode cut short by `max_steps` still gets its `post_episode`
    /// hooks. The first failing hook aborts the run without closing.
    pub fn run(&mut self, limits: RunLimits) -> Result<RunState, RunError> {
        let initial_phase = if self.assembly.policy_wiring().eval_mode {
            Phase::Eval
        } else {
            Phase::TrainExplore
        };

        let mut start = StartContext::default();
        dispatch(self.assembly.units_mut(), Hook::Start, 0, |u| {
            u.start(&mut start)
        })?;
        if let Some(seed) = start.env_seed {
            self.env.seed(seed);
        }
        log::info!(
            "run started: {} units, limits {:?}",
            self.assembly.records().len(),
            limits
        );

        loop {
            let state = self.counters.snapshot();
            if limits.episodes_reached(&state) || limits.steps_reached(&state) {
                break;
            }
            self.run_episode(initial_phase, &limits)?;
        }

        let state = self.counters.snapshot();
        dispatch(
            self.assembly.units_mut(),
            Hook::Close,
            state.global_step_count,
            |u| u.close(),
        )?;
        log::info!(
            "run finished after {} steps, {} episodes",
            state.global_step_count,
            state.episode_count
        );
        Ok(state)
    }

    fn run_episode(&mut self, initial_phase: Phase, limits: &RunLimits) -> Result<(), RunError> {
        self.counters.begin_episode();
        let state = self.counters.snapshot();
        let mut episode = EpisodeContext {
            phase: initial_phase,
        };
        dispatch(
            self.assembly.units_mut(),
            Hook::PreEpisode,
            state.global_step_count,
            |u| u.pre_episode(&state, &mut episode),
        )?;

        let mut observation = self.env.reset().map_err(RunError::Environment)?;
        loop {
            let state = self.counters.snapshot();
            let step = state.global_step_count;
            let mut frame = StepFrame::new(episode.phase, observation);
            dispatch(self.assembly.units_mut(), Hook::Act, step, |u| {
                u.act(&state, &mut frame)
            })?;
            let action = frame
                .action
                .as_ref()
                .ok_or(RunError::MissingAction { step })?;
            let outcome = self.env.step(action).map_err(RunError::Environment)?;
            frame.record_outcome(outcome);

            self.counters.record_transition();
            let state = self.counters.snapshot();
            dispatch(
                self.assembly.units_mut(),
                Hook::PostStep,
                state.global_step_count,
                |u| u.post_step(&state, &mut frame),
            )?;

            if frame.done() || limits.steps_reached(&state) {
                break;
            }
            // The step frame is rebuilt each step; carry the observation over
            observation = match frame.next_observation {
                Some(next) => next,
                None => return Err(RunError::Environment("missing next observation".into())),
            };
        }

        let state = self.counters.snapshot();
        dispatch(
            self.assembly.units_mut(),
            Hook::PostEpisode,
            state.global_step_count,
            |u| u.post_episode(&state, &episode),
        )
    }
}

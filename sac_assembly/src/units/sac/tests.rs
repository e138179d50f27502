use super::*;
use crate::buffers::{ReplayBuffer, SharedReplayBuffer};
use crate::config::NetworkShape;
use crate::core::target_network::flatten_params;
use crate::core::transition::{Action, NStepTransition};
use crate::metrics::MetricsView;
use crate::test_support::{FakeProvider, TestBackend};
use rand::SeedableRng;

// ============================================================================
// Helpers
// ============================================================================

const OBS_DIM: usize = 3;

fn hyper(mb_size: usize, eval_mode: bool) -> SacHyperParams {
    SacHyperParams {
        gamma: 0.99,
        nsteps: 1,
        mb_size,
        td_clip: None,
        grad_clip: None,
        lr: 1e-3,
        a_lr: 0.1,
        network: NetworkShape {
            convs: vec![],
            hiddens: vec![8],
        },
        eval_mode,
    }
}

fn config(kind: PolicyKind, min_explore_steps: u64, mb_size: usize, eval_mode: bool) -> SacUnitConfig {
    SacUnitConfig {
        kind,
        obs_dim: OBS_DIM,
        hyper: hyper(mb_size, eval_mode),
        train_freq: 2,
        min_explore_steps,
        sac_alpha: 0.2,
        fix_alpha: false,
    }
}

fn build(
    config: SacUnitConfig,
    buffer: Option<ReplayReader>,
) -> (SacUnit<TestBackend>, FakeProvider, MetricsStore) {
    let mut provider = FakeProvider::new(OBS_DIM);
    let device = Default::default();
    let learner = provider.build(&config.kind, &config.hyper, &device).unwrap();
    let metrics = MetricsStore::new();
    let unit = SacUnit::new(
        "SACAgent",
        config,
        buffer,
        learner,
        StdRng::seed_from_u64(3),
        metrics.clone(),
        &device,
    );
    (unit, provider, metrics)
}

fn filled_buffer(n: usize) -> SharedReplayBuffer {
    let buffer = ReplayBuffer::shared(100);
    for i in 0..n {
        buffer.lock().push(NStepTransition {
            state: vec![i as f32; OBS_DIM],
            action: Action::Discrete(0),
            reward_return: 1.0,
            cost_return: 0.0,
            next_state: vec![i as f32 + 1.0; OBS_DIM],
            done: false,
            bootstrap_discount: 0.99,
            exploratory: true,
        });
    }
    buffer
}

fn state(step: u64) -> RunState {
    RunState {
        global_step_count: step,
        episode_count: 1,
        episode_step_count: step,
        frameskip: 1,
    }
}

fn frame(phase: Phase) -> StepFrame {
    StepFrame::new(phase, vec![0.0; OBS_DIM])
}

// ============================================================================
// Acting
// ============================================================================

#[test]
fn test_random_actions_before_min_explore() {
    let kind = PolicyKind::Continuous {
        low: vec![-2.0, 0.0],
        high: vec![2.0, 1.0],
    };
    let (mut unit, provider, _) = build(config(kind.clone(), 10, 4, false), None);

    for step in 0..10 {
        let mut frame = frame(Phase::TrainExplore);
        unit.act(&state(step), &mut frame).unwrap();
        assert!(kind.contains(frame.action.as_ref().unwrap()));
    }
    assert_eq!(provider.log.lock().actions, 0);

    let mut frame = frame(Phase::TrainExplore);
    unit.act(&state(10), &mut frame).unwrap();
    let log = provider.log.lock();
    assert_eq!(log.actions, 1);
    assert_eq!(log.deterministic_actions, 0);
}

#[test]
fn test_exploit_and_eval_act_greedily() {
    let (mut unit, provider, _) = build(config(PolicyKind::Discrete { n: 3 }, 10, 4, false), None);

    let mut frame = frame(Phase::TrainExploit);
    unit.act(&state(0), &mut frame).unwrap();
    let mut eval_frame = StepFrame::new(Phase::Eval, vec![0.0; OBS_DIM]);
    unit.act(&state(0), &mut eval_frame).unwrap();

    let log = provider.log.lock();
    assert_eq!(log.actions, 2);
    assert_eq!(log.deterministic_actions, 2);
    assert_eq!(frame.action, Some(Action::Discrete(0)));
}

struct OutOfRangeLearner;

impl SacLearner<TestBackend> for OutOfRangeLearner {
    fn select_action(&mut self, _: &[f32], _: bool) -> Result<Action, UnitError> {
        Ok(Action::Discrete(7))
    }

    fn train_step(
        &mut self,
        _: &crate::buffers::ReplayBatch,
        _: &CriticSet<TestBackend>,
        _: f32,
    ) -> Result<SacLossInfo, UnitError> {
        Err(UnitError::Collaborator("unused".into()))
    }
}

#[test]
fn test_rejects_actions_outside_space() {
    let device = Default::default();
    let mut unit = SacUnit::<TestBackend>::new(
        "SACDiscreteAgent",
        config(PolicyKind::Discrete { n: 2 }, 0, 4, true),
        None,
        Box::new(OutOfRangeLearner),
        StdRng::seed_from_u64(0),
        MetricsStore::new(),
        &device,
    );
    let mut frame = frame(Phase::Eval);
    assert!(matches!(
        unit.act(&state(0), &mut frame),
        Err(UnitError::InvalidAction(_))
    ));
    assert!(frame.action.is_none());
}

// ============================================================================
// Training gate
// ============================================================================

#[test]
fn test_trains_only_when_every_condition_holds() {
    let buffer = filled_buffer(3);
    let (mut unit, provider, metrics) = build(
        config(PolicyKind::Discrete { n: 2 }, 10, 4, false),
        Some(ReplayReader::new(&buffer)),
    );
    let steps = unit.gradient_steps();

    // Below min_explore_steps
    unit.post_step(&state(8), &mut frame(Phase::TrainExplore)).unwrap();
    // Buffer smaller than mb_size
    unit.post_step(&state(10), &mut frame(Phase::TrainExplore)).unwrap();
    assert_eq!(steps.get(), 0);

    let first = buffer.lock().iter().next().cloned().unwrap();
    buffer.lock().push(first);
    // Not a multiple of train_freq
    unit.post_step(&state(11), &mut frame(Phase::TrainExplore)).unwrap();
    // Exploit episodes never train
    unit.post_step(&state(12), &mut frame(Phase::TrainExploit)).unwrap();
    assert_eq!(steps.get(), 0);

    unit.post_step(&state(12), &mut frame(Phase::TrainExplore)).unwrap();
    assert_eq!(steps.get(), 1);
    assert_eq!(provider.log.lock().batch_sizes, vec![4]);
    assert_eq!(metrics.get(keys::SAC_LOSS), Some(1.0));
    assert_eq!(metrics.get(keys::SAC_VALUE), Some(2.0));
    assert_eq!(metrics.get(keys::SAC_ENTROPY), Some(0.5));
}

#[test]
fn test_alpha_adapts_after_training() {
    let buffer = filled_buffer(8);
    let (mut unit, provider, metrics) = build(
        config(PolicyKind::Discrete { n: 2 }, 0, 4, false),
        Some(ReplayReader::new(&buffer)),
    );
    assert!((unit.alpha() - 0.2).abs() < 1e-6);

    unit.post_step(&state(2), &mut frame(Phase::TrainExplore)).unwrap();
    unit.post_step(&state(4), &mut frame(Phase::TrainExplore)).unwrap();

    // Entropy 0.5 is below the 0.89 * ln(2) target, so alpha grows
    let alphas = provider.log.lock().alphas.clone();
    assert_eq!(alphas.len(), 2);
    assert!((alphas[0] - 0.2).abs() < 1e-6);
    assert!(alphas[1] > alphas[0]);
    assert!(unit.alpha() > alphas[1]);
    assert_eq!(metrics.get(keys::SAC_ALPHA), Some(unit.alpha() as f64));
}

#[test]
fn test_training_moves_source_not_target() {
    let buffer = filled_buffer(8);
    let (mut unit, _, _) = build(
        config(PolicyKind::Discrete { n: 2 }, 0, 4, false),
        Some(ReplayReader::new(&buffer)),
    );
    let refs = unit.critic_refs();
    let pair = refs.pair(0).unwrap();
    let q1 = pair.source.upgrade().unwrap();
    let t1 = pair.target.upgrade().unwrap();
    let before = flatten_params::<TestBackend, _>(&*q1.lock());

    unit.post_step(&state(2), &mut frame(Phase::TrainExplore)).unwrap();

    assert_ne!(flatten_params::<TestBackend, _>(&*q1.lock()), before);
    assert_eq!(flatten_params::<TestBackend, _>(&*t1.lock()), before);
}

#[test]
fn test_eval_never_trains() {
    let (mut unit, provider, _) = build(config(PolicyKind::Discrete { n: 2 }, 0, 1, true), None);
    let wiring = unit.wiring();
    assert!(!wiring.has_buffer);
    assert!(wiring.eval_mode);
    assert_eq!(wiring.variant, PolicyVariant::Discrete);

    for step in 0..10 {
        unit.post_step(&state(step), &mut frame(Phase::Eval)).unwrap();
    }
    assert_eq!(unit.gradient_steps().get(), 0);
    assert!(provider.log.lock().batch_sizes.is_empty());
}

#[test]
fn test_dropped_buffer_is_reported() {
    let buffer = filled_buffer(8);
    let (mut unit, _, _) = build(
        config(PolicyKind::Discrete { n: 2 }, 0, 4, false),
        Some(ReplayReader::new(&buffer)),
    );
    drop(buffer);
    assert_eq!(
        unit.post_step(&state(2), &mut frame(Phase::TrainExplore)),
        Err(UnitError::DanglingReference("replay buffer"))
    );
}

//! Shared fakes for unit, assembly and runner tests.

use burn::backend::NdArray;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

use crate::buffers::ReplayBatch;
use crate::core::action_space::{PolicyKind, PolicyVariant};
use crate::core::target_network::soft_update;
use crate::core::transition::Action;
use crate::environment::{EnvStep, Environment};
use crate::error::UnitError;
use crate::units::sac::{
    CriticSet, LearnerProvider, QNetwork, QNetworkConfig, SacHyperParams, SacLearner, SacLossInfo,
};

pub type TestBackend = NdArray<f32>;

/// What the fake learner was asked to do.
#[derive(Debug, Clone, Default)]
pub struct LearnerLog {
    pub built: Vec<PolicyVariant>,
    pub hyper: Vec<SacHyperParams>,
    pub actions: usize,
    pub deterministic_actions: usize,
    pub batch_sizes: Vec<usize>,
    pub alphas: Vec<f32>,
}

/// Learner that pulls `q1` halfway toward a fixed network on every step.
pub struct FakeLearner {
    kind: PolicyKind,
    pull: QNetwork<TestBackend>,
    entropy: f32,
    log: Arc<Mutex<LearnerLog>>,
}

impl SacLearner<TestBackend> for FakeLearner {
    fn select_action(
        &mut self,
        _observation: &[f32],
        deterministic: bool,
    ) -> Result<Action, UnitError> {
        let mut log = self.log.lock();
        log.actions += 1;
        if deterministic {
            log.deterministic_actions += 1;
        }
        Ok(match &self.kind {
            PolicyKind::Continuous { low, high } => Action::Continuous(
                low.iter().zip(high).map(|(l, h)| 0.5 * (l + h)).collect(),
            ),
            PolicyKind::Discrete { .. } => Action::Discrete(0),
        })
    }

    fn train_step(
        &mut self,
        batch: &ReplayBatch,
        critics: &CriticSet<TestBackend>,
        alpha: f32,
    ) -> Result<SacLossInfo, UnitError> {
        {
            let mut log = self.log.lock();
            log.batch_sizes.push(batch.len());
            log.alphas.push(alpha);
        }
        let mut q1 = critics.q1.lock();
        let current = q1.clone();
        *q1 = soft_update::<TestBackend, _>(&self.pull, current, 0.5);
        Ok(SacLossInfo {
            loss: 1.0,
            value: 2.0,
            entropy: self.entropy,
        })
    }
}

/// Provider handing out [`FakeLearner`]s that share one log.
pub struct FakeProvider {
    pub obs_dim: usize,
    pub entropy: f32,
    pub fail: bool,
    pub log: Arc<Mutex<LearnerLog>>,
}

impl FakeProvider {
    pub fn new(obs_dim: usize) -> Self {
        Self {
            obs_dim,
            entropy: 0.5,
            fail: false,
            log: Arc::new(Mutex::new(LearnerLog::default())),
        }
    }
}

impl LearnerProvider<TestBackend> for FakeProvider {
    fn build(
        &mut self,
        kind: &PolicyKind,
        hyper: &SacHyperParams,
        device: &<TestBackend as burn::tensor::backend::Backend>::Device,
    ) -> Result<Box<dyn SacLearner<TestBackend>>, UnitError> {
        if self.fail {
            return Err(UnitError::Collaborator("no learner available".into()));
        }
        {
            let mut log = self.log.lock();
            log.built.push(kind.variant());
            log.hyper.push(hyper.clone());
        }
        let pull = QNetworkConfig::for_policy(self.obs_dim, kind, &hyper.network.hiddens)
            .init::<TestBackend, _>(device, &mut StdRng::seed_from_u64(0));
        Ok(Box::new(FakeLearner {
            kind: kind.clone(),
            pull,
            entropy: self.entropy,
            log: Arc::clone(&self.log),
        }))
    }
}

/// Walk along a line: one reward per step, terminal after `episode_len` steps.
pub struct LineEnv {
    pub obs_dim: usize,
    pub episode_len: u64,
    pub reward: f32,
    pub truncate: bool,
    pub seeds: Vec<u64>,
    pub resets: u64,
    position: u64,
}

impl LineEnv {
    pub fn new(obs_dim: usize, episode_len: u64) -> Self {
        Self {
            obs_dim,
            episode_len,
            reward: 1.0,
            truncate: false,
            seeds: Vec::new(),
            resets: 0,
            position: 0,
        }
    }

    fn observation(&self) -> Vec<f32> {
        vec![self.position as f32; self.obs_dim]
    }
}

impl Environment for LineEnv {
    fn seed(&mut self, seed: u64) {
        self.seeds.push(seed);
    }

    fn reset(&mut self) -> Result<Vec<f32>, String> {
        self.resets += 1;
        self.position = 0;
        Ok(self.observation())
    }

    fn step(&mut self, _action: &Action) -> Result<EnvStep, String> {
        self.position += 1;
        let end = self.position >= self.episode_len;
        Ok(EnvStep {
            observation: self.observation(),
            reward: self.reward,
            cost: 0.5 * self.reward,
            terminal: end && !self.truncate,
            truncated: end && self.truncate,
        })
    }
}

/// In-memory console output that tests can read back.
#[derive(Clone, Default)]
pub struct SharedOutput(Arc<Mutex<Vec<u8>>>);

impl SharedOutput {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl std::io::Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

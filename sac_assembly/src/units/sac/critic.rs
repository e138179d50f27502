//! Twin Q-network critics.
//!
//! Architecture differs by action type:
//! - **Continuous**: Q(s, a) → scalar. Action concatenated with the observation.
//! - **Discrete**: Q(s) → [n_actions]. One Q-value per action.
//!
//! The policy-update unit owns all four networks (`q1`, `q2` and their
//! targets). Target copiers only receive [`CriticRefs`].

use burn::module::{Module, Param};
use burn::nn::{Initializer, Linear, LinearConfig};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use rand::Rng;
use std::sync::Arc;

use crate::core::action_space::PolicyKind;
use crate::core::target_network::{share, NetworkRef, SharedNetwork};

// ============================================================================
// Q-Network
// ============================================================================

/// Fully connected Q-network.
#[derive(Module, Debug)]
pub struct QNetwork<B: Backend> {
    hidden: Vec<Linear<B>>,
    head: Linear<B>,
    input_dim: usize,
    output_dim: usize,
}

impl<B: Backend> QNetwork<B> {
    /// Forward pass: `[batch, input_dim]` → `[batch, output_dim]`.
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = input;
        for layer in &self.hidden {
            x = relu(layer.forward(x));
        }
        self.head.forward(x)
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    pub fn num_hidden_layers(&self) -> usize {
        self.hidden.len()
    }
}

/// Layer sizes of a [`QNetwork`].
#[derive(Debug, Clone, PartialEq)]
pub struct QNetworkConfig {
    pub input_dim: usize,
    pub hiddens: Vec<usize>,
    pub output_dim: usize,
}

impl QNetworkConfig {
    /// Critic shape for a resolved policy variant.
    pub fn for_policy(obs_dim: usize, kind: &PolicyKind, hiddens: &[usize]) -> Self {
        let (input_dim, output_dim) = match kind {
            PolicyKind::Continuous { .. } => (obs_dim + kind.action_dim(), 1),
            PolicyKind::Discrete { n } => (obs_dim, *n),
        };
        Self {
            input_dim,
            hiddens: hiddens.to_vec(),
            output_dim,
        }
    }

    /// Build the network with weights drawn from `rng`.
    pub fn init<B: Backend, R: Rng + ?Sized>(
        &self,
        device: &B::Device,
        rng: &mut R,
    ) -> QNetwork<B> {
        let mut hidden = Vec::with_capacity(self.hiddens.len());
        let mut d_in = self.input_dim;
        for &width in &self.hiddens {
            hidden.push(seeded_linear(d_in, width, device, rng));
            d_in = width;
        }
        QNetwork {
            hidden,
            head: seeded_linear(d_in, self.output_dim, device, rng),
            input_dim: self.input_dim,
            output_dim: self.output_dim,
        }
    }
}

/// Linear layer with weights and bias uniform in `±1/sqrt(d_in)`.
///
/// Same bounds as burn's default Kaiming init, but drawn from the run's RNG
/// instead of the backend's global one.
fn seeded_linear<B: Backend, R: Rng + ?Sized>(
    d_in: usize,
    d_out: usize,
    device: &B::Device,
    rng: &mut R,
) -> Linear<B> {
    let bound = 1.0 / (d_in.max(1) as f32).sqrt();
    let mut uniform = |len: usize| -> Vec<f32> {
        (0..len).map(|_| rng.gen_range(-bound..=bound)).collect()
    };
    let weight = uniform(d_in * d_out);
    let bias = uniform(d_out);

    let mut layer = LinearConfig::new(d_in, d_out)
        .with_initializer(Initializer::Zeros)
        .init(device);
    layer.weight = Param::from_tensor(Tensor::<B, 2>::from_data(
        TensorData::new(weight, [d_in, d_out]),
        device,
    ));
    layer.bias = Some(Param::from_tensor(Tensor::<B, 1>::from_data(
        TensorData::new(bias, [d_out]),
        device,
    )));
    layer
}

// ============================================================================
// Critic set
// ============================================================================

/// Twin critics and their targets, owned by the policy-update unit.
pub struct CriticSet<B: Backend> {
    pub q1: SharedNetwork<QNetwork<B>>,
    pub q2: SharedNetwork<QNetwork<B>>,
    pub target_q1: SharedNetwork<QNetwork<B>>,
    pub target_q2: SharedNetwork<QNetwork<B>>,
}

impl<B: Backend> CriticSet<B> {
    /// Fresh critics; each target starts as an exact copy of its source.
    pub fn new<R: Rng + ?Sized>(config: &QNetworkConfig, device: &B::Device, rng: &mut R) -> Self {
        let q1 = config.init::<B, R>(device, rng);
        let q2 = config.init::<B, R>(device, rng);
        Self {
            target_q1: share(q1.clone()),
            target_q2: share(q2.clone()),
            q1: share(q1),
            q2: share(q2),
        }
    }

    /// Non-owning references for synchronization units.
    pub fn refs(&self) -> CriticRefs<B> {
        CriticRefs {
            pairs: [
                CriticPair {
                    source: Arc::downgrade(&self.q1),
                    target: Arc::downgrade(&self.target_q1),
                },
                CriticPair {
                    source: Arc::downgrade(&self.q2),
                    target: Arc::downgrade(&self.target_q2),
                },
            ],
        }
    }
}

/// A source network and the target trailing it.
pub struct CriticPair<B: Backend> {
    pub source: NetworkRef<QNetwork<B>>,
    pub target: NetworkRef<QNetwork<B>>,
}

impl<B: Backend> Clone for CriticPair<B> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            target: self.target.clone(),
        }
    }
}

/// Named references to both critic pairs.
pub struct CriticRefs<B: Backend> {
    pairs: [CriticPair<B>; 2],
}

impl<B: Backend> Clone for CriticRefs<B> {
    fn clone(&self) -> Self {
        Self {
            pairs: self.pairs.clone(),
        }
    }
}

impl<B: Backend> CriticRefs<B> {
    /// Pair `index` (0 for `q1`, 1 for `q2`).
    pub fn pair(&self, index: usize) -> Option<CriticPair<B>> {
        self.pairs.get(index).cloned()
    }

    pub fn pairs(&self) -> &[CriticPair<B>] {
        &self.pairs
    }
}

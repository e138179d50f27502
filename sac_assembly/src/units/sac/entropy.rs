//! Entropy temperature (alpha) handling.
//!
//! SAC's objective includes an entropy term weighted by α. With a fixed
//! temperature α stays at its initial value; otherwise `log α` follows a
//! gradient step after every training step:
//!
//! ```text
//! log_α ← log_α - a_lr * (H - H_target)
//! ```
//!
//! so α shrinks while the policy is more random than the target and grows
//! once it becomes too greedy.

use crate::core::action_space::PolicyKind;

/// Scale of the SAC-Discrete target entropy, `0.89 * ln(n)`.
pub const DISCRETE_TARGET_ENTROPY_SCALE: f64 = 0.89;

/// Target entropy for a resolved policy variant.
///
/// - Continuous: `-dim(A)`
/// - Discrete: `0.89 * ln(n)`
pub fn target_entropy(kind: &PolicyKind) -> f64 {
    match kind {
        PolicyKind::Continuous { low, .. } => -(low.len() as f64),
        PolicyKind::Discrete { n } => DISCRETE_TARGET_ENTROPY_SCALE * (*n as f64).ln(),
    }
}

/// Entropy temperature, fixed or adapted.
#[derive(Debug, Clone, PartialEq)]
pub struct EntropyTemperature {
    log_alpha: f64,
    target_entropy: f64,
    lr: f64,
    fixed: bool,
}

impl EntropyTemperature {
    pub fn new(initial_alpha: f32, target_entropy: f64, lr: f64, fixed: bool) -> Self {
        Self {
            log_alpha: (initial_alpha as f64).ln(),
            target_entropy,
            lr,
            fixed,
        }
    }

    /// Current α = exp(log α).
    pub fn alpha(&self) -> f32 {
        self.log_alpha.exp() as f32
    }

    pub fn target_entropy(&self) -> f64 {
        self.target_entropy
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Adapt to the entropy measured on the latest batch. Returns the new α.
    pub fn update(&mut self, entropy: f32) -> f32 {
        if !self.fixed && entropy.is_finite() {
            self.log_alpha -= self.lr * (entropy as f64 - self.target_entropy);
        }
        self.alpha()
    }
}

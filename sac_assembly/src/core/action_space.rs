//! Action-space descriptors and policy variant resolution.
//!
//! SAC has two policy-update variants: a squashed Gaussian policy for
//! bounded continuous actions and a categorical policy for enumerable
//! discrete actions. [`resolve`] maps a descriptor to exactly one of them,
//! once per run, at assembly time. Every other shape is a configuration
//! error.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::transition::Action;
use crate::error::AssemblyError;

/// Action space of the target environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionSpace {
    /// Continuous box with per-dimension bounds.
    Box { low: Vec<f32>, high: Vec<f32> },
    /// `n` enumerable actions `0..n`.
    Discrete { n: usize },
    /// Several independent discrete choices.
    MultiDiscrete { nvec: Vec<usize> },
    /// `n` independent binary choices.
    MultiBinary { n: usize },
    /// Composite space.
    Tuple(Vec<ActionSpace>),
}

/// Resolved policy-update variant tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyVariant {
    Continuous,
    Discrete,
}

/// Resolved variant carrying the bounds it needs.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyKind {
    Continuous { low: Vec<f32>, high: Vec<f32> },
    Discrete { n: usize },
}

/// Map an action-space descriptor to its policy-update variant.
///
/// A box only qualifies when it is non-empty, both bound vectors have the
/// same length, and every bound is finite with `low <= high`. A discrete
/// space needs at least one action and indices that fit an [`Action::Discrete`].
pub fn resolve(space: &ActionSpace) -> Result<PolicyKind, AssemblyError> {
    match space {
        ActionSpace::Box { low, high }
            if !low.is_empty()
                && low.len() == high.len()
                && low
                    .iter()
                    .zip(high.iter())
                    .all(|(l, h)| l.is_finite() && h.is_finite() && l <= h) =>
        {
            Ok(PolicyKind::Continuous {
                low: low.clone(),
                high: high.clone(),
            })
        }
        ActionSpace::Discrete { n } if *n > 0 && u32::try_from(*n).is_ok() => {
            Ok(PolicyKind::Discrete { n: *n })
        }
        other => Err(AssemblyError::UnsupportedActionSpace(other.clone())),
    }
}

impl PolicyKind {
    /// The variant tag.
    pub fn variant(&self) -> PolicyVariant {
        match self {
            PolicyKind::Continuous { .. } => PolicyVariant::Continuous,
            PolicyKind::Discrete { .. } => PolicyVariant::Discrete,
        }
    }

    /// Dimensionality of the critic's action input (continuous) or output (discrete).
    pub fn action_dim(&self) -> usize {
        match self {
            PolicyKind::Continuous { low, .. } => low.len(),
            PolicyKind::Discrete { n } => *n,
        }
    }

    /// Uniformly random action, used before the exploration threshold.
    pub fn sample_uniform<R: Rng + ?Sized>(&self, rng: &mut R) -> Action {
        match self {
            PolicyKind::Continuous { low, high } => Action::Continuous(
                low.iter()
                    .zip(high.iter())
                    .map(|(&l, &h)| if l < h { rng.gen_range(l..=h) } else { l })
                    .collect(),
            ),
            PolicyKind::Discrete { n } => {
                let n = u32::try_from(*n).unwrap_or(u32::MAX);
                Action::Discrete(rng.gen_range(0..n))
            }
        }
    }

    /// Whether an action belongs to this space.
    pub fn contains(&self, action: &Action) -> bool {
        match (self, action) {
            (PolicyKind::Continuous { low, high }, Action::Continuous(a)) => {
                a.len() == low.len()
                    && a.iter()
                        .zip(low.iter().zip(high.iter()))
                        .all(|(x, (l, h))| (*l..=*h).contains(x))
            }
            (PolicyKind::Discrete { n }, Action::Discrete(a)) => (*a as usize) < *n,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_box_resolves_continuous() {
        let space = ActionSpace::Box {
            low: vec![-1.0, -2.0],
            high: vec![1.0, 2.0],
        };
        let kind = resolve(&space).unwrap();
        assert_eq!(kind.variant(), PolicyVariant::Continuous);
        assert_eq!(kind.action_dim(), 2);
    }

    #[test]
    fn test_discrete_resolves_discrete() {
        let kind = resolve(&ActionSpace::Discrete { n: 4 }).unwrap();
        assert_eq!(kind.variant(), PolicyVariant::Discrete);
        assert_eq!(kind.action_dim(), 4);
    }

    #[test]
    fn test_other_shapes_unsupported() {
        let unsupported = [
            ActionSpace::MultiDiscrete { nvec: vec![2, 3] },
            ActionSpace::MultiBinary { n: 3 },
            ActionSpace::Tuple(vec![ActionSpace::Discrete { n: 2 }]),
            ActionSpace::Discrete { n: 0 },
            ActionSpace::Box {
                low: vec![],
                high: vec![],
            },
            ActionSpace::Box {
                low: vec![f32::NEG_INFINITY],
                high: vec![1.0],
            },
            ActionSpace::Box {
                low: vec![1.0],
                high: vec![-1.0],
            },
            ActionSpace::Box {
                low: vec![0.0, 0.0],
                high: vec![1.0],
            },
        ];

        for space in unsupported {
            match resolve(&space) {
                Err(AssemblyError::UnsupportedActionSpace(reported)) => {
                    assert_eq!(reported, space, "error must carry the offending descriptor")
                }
                other => panic!("expected UnsupportedActionSpace for {:?}, got {:?}", space, other),
            }
        }
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_discrete_too_large_for_action_index() {
        let largest = u32::MAX as usize;
        assert!(resolve(&ActionSpace::Discrete { n: largest }).is_ok());

        let space = ActionSpace::Discrete { n: largest + 1 };
        assert_eq!(
            resolve(&space),
            Err(AssemblyError::UnsupportedActionSpace(space.clone()))
        );
    }

    #[test]
    fn test_uniform_samples_stay_in_space() {
        let mut rng = StdRng::seed_from_u64(0);
        let kinds = [
            PolicyKind::Continuous {
                low: vec![-1.0, 0.0, 2.0],
                high: vec![1.0, 0.5, 2.0],
            },
            PolicyKind::Discrete { n: 3 },
        ];
        for kind in kinds {
            for _ in 0..200 {
                let action = kind.sample_uniform(&mut rng);
                assert!(kind.contains(&action), "{:?} not in {:?}", action, kind);
            }
        }
    }

    #[test]
    fn test_contains_rejects_mismatched_actions() {
        let continuous = PolicyKind::Continuous {
            low: vec![-1.0],
            high: vec![1.0],
        };
        assert!(!continuous.contains(&Action::Discrete(0)));
        assert!(!continuous.contains(&Action::Continuous(vec![2.0])));
        assert!(!continuous.contains(&Action::Continuous(vec![0.0, 0.0])));
        assert!(!PolicyKind::Discrete { n: 2 }.contains(&Action::Discrete(2)));
    }

    proptest! {
        #[test]
        fn prop_bounded_boxes_are_continuous(
            bounds in prop::collection::vec((-100.0f32..100.0, 0.0f32..50.0), 1..8)
        ) {
            let low: Vec<f32> = bounds.iter().map(|(l, _)| *l).collect();
            let high: Vec<f32> = bounds.iter().map(|(l, w)| l + w).collect();
            let kind = resolve(&ActionSpace::Box { low, high }).unwrap();
            prop_assert_eq!(kind.variant(), PolicyVariant::Continuous);
        }

        #[test]
        fn prop_discrete_spaces_are_discrete(n in 1usize..10_000) {
            let kind = resolve(&ActionSpace::Discrete { n }).unwrap();
            prop_assert_eq!(kind.variant(), PolicyVariant::Discrete);
        }
    }
}

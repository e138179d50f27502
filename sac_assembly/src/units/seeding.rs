//! Seeding unit.
//!
//! Always registered first. It owns the run's [`SeedSequence`]; every other
//! randomness consumer receives an RNG derived from it, so nothing random can
//! be built before this unit exists.

use burn::tensor::backend::Backend;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::{StartContext, Unit, UnitKind};
use crate::error::UnitError;

/// SplitMix64 finalizer, used to spread consecutive stream indices.
fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Deterministic stream of seeds derived from one base seed.
#[derive(Debug, Clone)]
pub struct SeedSequence {
    base: u64,
    deterministic: bool,
    drawn: u64,
}

impl SeedSequence {
    /// `Some(seed)` is deterministic; `None` draws the base seed from OS entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let (base, deterministic) = match seed {
            Some(seed) => (seed, true),
            None => (rand::random::<u64>(), false),
        };
        Self {
            base,
            deterministic,
            drawn: 0,
        }
    }

    pub fn base_seed(&self) -> u64 {
        self.base
    }

    pub fn is_deterministic(&self) -> bool {
        self.deterministic
    }

    /// Next seed in the stream.
    pub fn next_seed(&mut self) -> u64 {
        self.drawn += 1;
        splitmix64(self.base ^ splitmix64(self.drawn))
    }

    /// A fresh RNG seeded from the next seed in the stream.
    pub fn next_rng(&mut self) -> StdRng {
        StdRng::seed_from_u64(self.next_seed())
    }
}

/// Seeds the environment and hands out RNGs to later units.
pub struct SeedingUnit {
    name: String,
    seeds: SeedSequence,
    env_seed: u64,
}

impl SeedingUnit {
    pub fn new(name: impl Into<String>, seed: Option<u64>) -> Self {
        let mut seeds = SeedSequence::new(seed);
        let env_seed = seeds.next_seed();
        Self {
            name: name.into(),
            seeds,
            env_seed,
        }
    }

    /// RNG for a randomness-consuming unit constructed after this one.
    pub fn derive_rng(&mut self) -> StdRng {
        self.seeds.next_rng()
    }

    /// Seed the backend's global RNG from the next seed in the stream.
    ///
    /// Anything initialized through burn's default initializers afterwards
    /// follows the run seed.
    pub fn seed_backend<B: Backend>(&mut self, device: &B::Device) -> u64 {
        let seed = self.seeds.next_seed();
        B::seed(device, seed);
        log::debug!("backend seed {}", seed);
        seed
    }

    pub fn sequence(&self) -> &SeedSequence {
        &self.seeds
    }
}

impl Unit for SeedingUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> UnitKind {
        UnitKind::Seeding
    }

    fn start(&mut self, ctx: &mut StartContext) -> Result<(), UnitError> {
        if self.seeds.is_deterministic() {
            log::info!("seed {} (environment seed {})", self.seeds.base_seed(), self.env_seed);
            ctx.env_seed = Some(self.env_seed);
        } else {
            log::info!("stochastic seeding");
        }
        Ok(())
    }
}

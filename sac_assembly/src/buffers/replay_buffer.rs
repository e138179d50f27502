//! Uniform replay buffer with n-step folding.
//!
//! - **Ring buffer** semantics (overwrite oldest when full)
//! - **Uniform random sampling** with replacement
//! - **n-step folding** of consecutive transitions before storage
//!
//! The experience-buffering unit exclusively owns the storage through a
//! [`SharedReplayBuffer`]. The policy-update unit gets a [`ReplayReader`],
//! a weak handle that can only count and sample.

use parking_lot::Mutex;
use rand::Rng;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use crate::core::transition::{NStepTransition, Transition};
use crate::error::UnitError;

// ============================================================================
// Ring Buffer (Internal)
// ============================================================================

/// Ring buffer with O(1) insert and random access.
struct RingBuffer<T> {
    buffer: Vec<T>,
    capacity: usize,
    /// Next position to write (circular).
    write_pos: usize,
}

impl<T> RingBuffer<T> {
    fn new(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity.min(1 << 16)),
            capacity,
            write_pos: 0,
        }
    }

    fn push(&mut self, item: T) {
        if self.buffer.len() < self.capacity {
            self.buffer.push(item);
        } else {
            self.buffer[self.write_pos] = item;
        }
        self.write_pos = (self.write_pos + 1) % self.capacity;
    }

    #[inline]
    fn get(&self, idx: usize) -> Option<&T> {
        self.buffer.get(idx)
    }

    #[inline]
    fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Items oldest first.
    fn iter(&self) -> impl Iterator<Item = &T> {
        let split = if self.buffer.len() < self.capacity {
            0
        } else {
            self.write_pos
        };
        self.buffer[split..].iter().chain(self.buffer[..split].iter())
    }
}

// ============================================================================
// Replay Buffer
// ============================================================================

/// A uniformly sampled minibatch.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayBatch {
    pub transitions: Vec<NStepTransition>,
}

impl ReplayBatch {
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

/// Replay storage for n-step transitions.
pub struct ReplayBuffer {
    storage: RingBuffer<NStepTransition>,
    exploratory_pushed: u64,
    exploit_pushed: u64,
}

/// Owning handle, held by the buffering unit only.
pub type SharedReplayBuffer = Arc<Mutex<ReplayBuffer>>;

impl ReplayBuffer {
    /// Create a buffer holding at most `capacity` transitions.
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: RingBuffer::new(capacity.max(1)),
            exploratory_pushed: 0,
            exploit_pushed: 0,
        }
    }

    /// Wrap in an owning shared handle.
    pub fn shared(capacity: usize) -> SharedReplayBuffer {
        Arc::new(Mutex::new(Self::new(capacity)))
    }

    /// Store a transition, evicting the oldest when full.
    pub fn push(&mut self, transition: NStepTransition) {
        if transition.exploratory {
            self.exploratory_pushed += 1;
        } else {
            self.exploit_pushed += 1;
        }
        self.storage.push(transition);
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.storage.capacity
    }

    /// Transitions pushed over the lifetime of the buffer: (exploratory, exploit).
    pub fn pushed_counts(&self) -> (u64, u64) {
        (self.exploratory_pushed, self.exploit_pushed)
    }

    /// Stored transitions, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &NStepTransition> {
        self.storage.iter()
    }

    /// Sample `batch_size` transitions uniformly with replacement.
    ///
    /// Returns `None` while fewer than `batch_size` transitions are stored.
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Option<ReplayBatch> {
        let len = self.len();
        if len == 0 || len < batch_size {
            return None;
        }
        let transitions = (0..batch_size)
            .filter_map(|_| self.storage.get(rng.gen_range(0..len)).cloned())
            .collect();
        Some(ReplayBatch { transitions })
    }
}

/// Read-only, non-owning view of a replay buffer.
///
/// Can count and sample but never push, resize or evict.
#[derive(Clone)]
pub struct ReplayReader {
    inner: Weak<Mutex<ReplayBuffer>>,
}

impl ReplayReader {
    /// Create a reader for a buffer owned elsewhere.
    pub fn new(buffer: &SharedReplayBuffer) -> Self {
        Self {
            inner: Arc::downgrade(buffer),
        }
    }

    fn upgrade(&self) -> Result<SharedReplayBuffer, UnitError> {
        self.inner
            .upgrade()
            .ok_or(UnitError::DanglingReference("replay buffer"))
    }

    pub fn len(&self) -> Result<usize, UnitError> {
        Ok(self.upgrade()?.lock().len())
    }

    pub fn sample<R: Rng + ?Sized>(
        &self,
        batch_size: usize,
        rng: &mut R,
    ) -> Result<Option<ReplayBatch>, UnitError> {
        Ok(self.upgrade()?.lock().sample(batch_size, rng))
    }

    /// Copy of the stored transitions, oldest first.
    pub fn to_vec(&self) -> Result<Vec<NStepTransition>, UnitError> {
        Ok(self.upgrade()?.lock().iter().cloned().collect())
    }
}

// ============================================================================
// N-step folding
// ============================================================================

/// Folds the last `nsteps` transitions of an episode into bootstrapped samples.
#[derive(Debug, Clone)]
pub struct NStepAccumulator {
    nsteps: usize,
    gamma: f32,
    cost_gamma: f32,
    ignore_done_on_timelimit: bool,
    window: VecDeque<Transition>,
}

impl NStepAccumulator {
    pub fn new(nsteps: usize, gamma: f32, cost_gamma: f32, ignore_done_on_timelimit: bool) -> Self {
        let nsteps = nsteps.max(1);
        Self {
            nsteps,
            gamma,
            cost_gamma,
            ignore_done_on_timelimit,
            window: VecDeque::with_capacity(nsteps),
        }
    }

    /// Add a transition and return every sample that became complete.
    ///
    /// When the transition ends the episode, all partial windows are flushed.
    pub fn push(&mut self, transition: Transition) -> Vec<NStepTransition> {
        let done = transition.done();
        self.window.push_back(transition);

        if done {
            return self.flush();
        }
        if self.window.len() == self.nsteps {
            let folded = self.fold();
            self.window.pop_front();
            return folded.into_iter().collect();
        }
        Vec::new()
    }

    /// Fold every pending window, e.g. when the driver cuts an episode short.
    pub fn flush(&mut self) -> Vec<NStepTransition> {
        let mut out = Vec::with_capacity(self.window.len());
        while !self.window.is_empty() {
            out.extend(self.fold());
            self.window.pop_front();
        }
        out
    }

    /// Number of transitions waiting for a full window.
    pub fn pending(&self) -> usize {
        self.window.len()
    }

    fn fold(&self) -> Option<NStepTransition> {
        let first = self.window.front()?;
        let last = self.window.back()?;

        let mut reward_return = 0.0f32;
        let mut cost_return = 0.0f32;
        let mut reward_discount = 1.0f32;
        let mut cost_discount = 1.0f32;
        for t in &self.window {
            reward_return += reward_discount * t.reward;
            cost_return += cost_discount * t.cost;
            reward_discount *= self.gamma;
            cost_discount *= self.cost_gamma;
        }

        Some(NStepTransition {
            state: first.state.clone(),
            action: first.action.clone(),
            reward_return,
            cost_return,
            next_state: last.next_state.clone(),
            done: last
                .episode_state()
                .done_for_bootstrap(self.ignore_done_on_timelimit),
            bootstrap_discount: reward_discount,
            exploratory: first.exploratory,
        })
    }
}

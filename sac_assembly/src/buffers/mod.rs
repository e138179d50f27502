//! Experience storage.

pub mod replay_buffer;

pub use replay_buffer::{
    NStepAccumulator, ReplayBatch, ReplayBuffer, ReplayReader, SharedReplayBuffer,
};

//! Proximal Policy Optimization on top of [burn](https://burn.dev).
//!
//! The core lives in [`algo::ppo`]: rollout memory, return estimation, the
//! clipped surrogate objective and the update controller with its divergence
//! safeguards. Networks and environments are collaborators supplied by the
//! caller; `nn` ships a reference actor-critic and, with the `gym` feature,
//! `gym` wraps CartPole from `gym_rs`.

pub mod algo;
pub mod env;
pub mod error;
#[cfg(feature = "gym")]
pub mod gym;
pub mod nn;
pub mod traits;

pub use error::PPOError;

//! Reference environments, thin wrappers over `gym_rs`

pub mod cartpole;

pub use cartpole::{CartPole, CartPoleAction, CartPoleState};

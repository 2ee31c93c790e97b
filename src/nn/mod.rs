//! Neural network building blocks for RL algorithms

pub mod actor_critic;
pub mod categorical;
pub mod mlp;

pub use actor_critic::{ActorCritic, ActorCriticConfig};
pub use categorical::Categorical;
pub use mlp::{MLP, MLPConfig};

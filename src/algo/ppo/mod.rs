//! Proximal Policy Optimization (PPO) implementation
//!
//! PPO is an on-policy actor-critic algorithm that bounds each policy update
//! with a clipped surrogate objective, so one batch of experience can be
//! reused for several gradient steps without wrecking the policy.
//!
//! # Components
//!
//! - [`RolloutMemory`]: transitions of the current window
//! - [`returns`]: episodic and bootstrapped discounted return targets
//! - [`SurrogateObjective`]: clipped policy loss, (clipped) value loss, entropy bonus
//! - [`Annealing`]: linear learning-rate / clip-epsilon schedule
//! - [`PPOAgent`]: the update controller
//!
//! # Update cycle
//!
//! Two protocols are available through [`UpdateVariant`]:
//!
//! - **Episodic**: Monte-Carlo returns reset at episode ends, `num_learn`
//!   gradient steps, then the old-policy snapshot is refreshed.
//! - **Bootstrapped**: the window is cut mid-episode and bootstrapped from a
//!   value estimate. Hyperparameters are annealed and the snapshot is taken
//!   before any step. After every step the approximate KL is checked: above
//!   `divergence_threshold` the cycle stops, and if the policy drifted past the
//!   threshold during the step, the step is undone by restoring the snapshot.
//!
//! # Usage Example
//!
//! ```ignore
//! use clipped_ppo::algo::ppo::{PPOAgent, PPOAgentConfig, UpdateVariant};
//! use clipped_ppo::nn::ActorCriticConfig;
//!
//! let policy = ActorCriticConfig::new(4, vec![64, 64], 2).init::<Backend>(&device);
//! let config = PPOAgentConfig {
//!     variant: UpdateVariant::Bootstrapped,
//!     update_every: 128,
//!     num_learn: 4,
//!     anneal_lr: true,
//!     ..Default::default()
//! };
//!
//! let mut agent: PPOAgent<Backend, _, [f32; 4], 2> = PPOAgent::new(policy, config, device)?;
//! let (reward, done, metrics) = agent.step(&mut env)?;
//! ```
//!
//! # Hyperparameters
//!
//! - `clip_epsilon`: Clipping parameter (typically 0.1-0.3)
//! - `num_learn`: Gradient steps per update (3-10)
//! - `update_every`: Rollout window length (128-2048)
//! - `divergence_threshold`: Approximate KL that stops an update (0.01-0.05)
//!
//! Reference: "Proximal Policy Optimization Algorithms" (Schulman et al., 2017)

pub mod agent;
pub mod config;
pub mod evaluator;
pub mod grad_norm;
pub mod memory;
pub mod objective;
pub mod returns;
pub mod schedule;

pub use agent::{ActionSample, PPOAgent};
pub use config::{PPOAgentConfig, SurrogateClip, UpdateVariant};
pub use evaluator::{PolicyEvaluator, PolicyOutput};
pub use memory::RolloutMemory;
pub use objective::{ObjectiveTerms, SurrogateObjective};
pub use returns::Bootstrap;
pub use schedule::{Annealing, Hyperparameters};

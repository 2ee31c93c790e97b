//! Trainable agent trait for fine-grained training control
//!
//! The trait is the glue between an agent and an outer training loop: the
//! loop calls [`TrainableAgent::step`] repeatedly, the agent collects
//! experience and runs an update whenever its own trigger fires.

use crate::{env::Environment, error::PPOError};

/// Training metrics returned after each update cycle
///
/// The loss, entropy and KL numbers describe the last gradient step that ran.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrainingMetrics {
    /// Clipped surrogate policy loss
    pub policy_loss: f32,

    /// Value loss (clipped in the bootstrapped variant)
    pub value_loss: f32,

    /// Mean entropy of the policy (higher means more exploration)
    pub entropy: f32,

    /// Approximate KL divergence from the old policy, `mean(old log π - log π)`
    pub approx_kl: f32,

    /// Fraction of probability ratios outside `[1 - ε, 1 + ε]`
    pub clip_fraction: f32,

    /// Number of gradient updates performed
    pub n_updates: usize,

    /// Cycle stopped early because the approximate KL crossed the threshold
    pub early_stopped: bool,

    /// Last gradient step was undone by restoring the snapshot
    pub rolled_back: bool,

    /// Learning rate used for this cycle
    pub learning_rate: f64,

    /// Clip epsilon used for this cycle
    pub clip_epsilon: f32,

    /// Return targets had (numerically) zero variance
    pub degenerate_returns: bool,
}

/// Trait for trainable RL agents with fine-grained control
///
/// # Example
///
/// ```ignore
/// loop {
///     let (reward, done, metrics) = agent.step(&mut env)?;
///     if let Some(metrics) = metrics {
///         println!("Policy loss: {}", metrics.policy_loss);
///     }
///     if done {
///         break;
///     }
/// }
/// ```
pub trait TrainableAgent<E: Environment> {
    /// Information returned after each environment step
    type StepInfo;

    /// Take one step in the environment, learning when the agent's trigger fires
    fn step(&mut self, env: &mut E) -> Result<Self::StepInfo, PPOError>;

    /// Check if the agent is ready to train
    ///
    /// Always false in evaluation mode.
    fn should_learn(&self) -> bool;

    /// Train on collected experience
    ///
    /// `next_state` is the state following the last stored transition, `None`
    /// when the episode ended there.
    fn learn(&mut self, next_state: Option<&E::State>, done: bool) -> Result<TrainingMetrics, PPOError>;

    /// Reset the agent's episode state
    ///
    /// Clears trajectory buffers, but keeps learned weights.
    fn reset_episode(&mut self);

    /// Get total number of environment steps taken
    fn total_steps(&self) -> usize;

    /// Make agent in evaluation mode
    fn eval(&mut self);

    /// Make agent in training mode
    fn train(&mut self);
}

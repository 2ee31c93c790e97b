use burn::{
    module::AutodiffModule,
    prelude::*,
    tensor::backend::{AutodiffBackend, Backend},
};

use crate::error::PPOError;

/// Per-transition outputs of a policy, every tensor has shape `[batch]`
#[derive(Debug, Clone)]
pub struct PolicyOutput<B: Backend> {
    /// Sampled actions, or the actions that were passed in
    pub actions: Tensor<B, 1, Int>,
    /// log π(a|s) of `actions`
    pub log_probs: Tensor<B, 1>,
    /// V(s)
    pub values: Tensor<B, 1>,
    /// Entropy of π(·|s)
    pub entropy: Tensor<B, 1>,
}

impl<B: Backend> PolicyOutput<B> {
    /// Check that every output carries exactly one entry per transition
    pub fn validate(&self, batch: usize) -> Result<(), PPOError> {
        check_shape("actions", &self.actions.shape().dims, batch)?;
        check_shape("log_probs", &self.log_probs.shape().dims, batch)?;
        check_shape("values", &self.values.shape().dims, batch)?;
        check_shape("entropy", &self.entropy.shape().dims, batch)
    }
}

fn check_shape(what: &'static str, dims: &[usize], expected: usize) -> Result<(), PPOError> {
    if dims == [expected] {
        Ok(())
    } else {
        Err(PPOError::ShapeMismatch {
            what,
            expected,
            actual: dims.to_vec(),
        })
    }
}

/// Actor-critic policy driven by the PPO update controller
///
/// The controller owns the module: it clones it for the old-policy snapshot,
/// restores from that clone on rollback, and hands it to the optimizer.
/// States come in with dimension `D`, batch first.
pub trait PolicyEvaluator<B: AutodiffBackend, const D: usize>: AutodiffModule<B> {
    /// Evaluate a batch of states
    ///
    /// - `actions = None`: sample one action per state (acting)
    /// - `actions = Some(a)`: score the given actions (learning); the output's
    ///   `actions` are `a`
    fn act(&self, states: Tensor<B, D>, actions: Option<Tensor<B, 1, Int>>) -> PolicyOutput<B>;
}

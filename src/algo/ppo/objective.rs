//! Clipped surrogate objective
//!
//! `loss = -min(r·A, clip) + value_loss - β·H`, with `r = exp(log π - log π_old)`.
//! Everything here is pure tensor arithmetic; gradients only materialise when
//! the update controller calls `backward` on [`ObjectiveTerms::loss`].

use burn::{prelude::*, tensor::backend::Backend};

use super::{config::SurrogateClip, evaluator::PolicyOutput, returns::normalize_tensor};

/// Loss coefficients and switches that stay fixed for the agent's lifetime
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurrogateObjective {
    pub entropy_beta: f32,
    pub clip: SurrogateClip,
    /// Re-normalise `returns - values` per gradient step
    pub normalize_advantages: bool,
    pub floor: f32,
}

/// Scalar terms (shape `[1]`) plus the per-transition importance ratio
#[derive(Debug, Clone)]
pub struct ObjectiveTerms<B: Backend> {
    pub loss: Tensor<B, 1>,
    pub policy_loss: Tensor<B, 1>,
    pub value_loss: Tensor<B, 1>,
    pub entropy: Tensor<B, 1>,
    /// Mean of `old log π - new log π`, detached
    pub approx_kl: Tensor<B, 1>,
    /// Share of ratios outside `[1 - ε, 1 + ε]`, detached
    pub clip_fraction: Tensor<B, 1>,
    pub ratio: Tensor<B, 1>,
}

impl SurrogateObjective {
    /// Combine the current policy's outputs with the frozen rollout data
    ///
    /// `old_log_probs` and `returns` are detached here. `value_anchor` turns on
    /// value clipping around that estimate.
    pub fn compute<B: Backend>(
        &self,
        current: &PolicyOutput<B>,
        old_log_probs: Tensor<B, 1>,
        returns: Tensor<B, 1>,
        clip_epsilon: f32,
        value_anchor: Option<f32>,
    ) -> ObjectiveTerms<B> {
        let old_log_probs = old_log_probs.detach();
        let returns = returns.detach();

        let ratio = (current.log_probs.clone() - old_log_probs.clone()).exp();

        let mut advantages = returns.clone() - current.values.clone().detach();
        if self.normalize_advantages {
            advantages = normalize_tensor(advantages, self.floor);
        }

        let surr1 = ratio.clone() * advantages.clone();
        let surr2 = match self.clip {
            SurrogateClip::Ratio => {
                ratio.clone().clamp(1.0 - clip_epsilon, 1.0 + clip_epsilon) * advantages
            }
            SurrogateClip::Advantage => advantages.clamp(1.0 - clip_epsilon, 1.0 + clip_epsilon),
        };
        let policy_loss = surr1.min_pair(surr2).mean().neg();

        let value_loss =
            value_loss_elements(current.values.clone(), returns, clip_epsilon, value_anchor).mean();

        let entropy = current.entropy.clone().mean();
        let loss = policy_loss.clone() + value_loss.clone() - entropy.clone() * self.entropy_beta;

        let approx_kl = (old_log_probs - current.log_probs.clone()).mean().detach();
        let clip_fraction = (ratio.clone().lower_elem(1.0 - clip_epsilon).float()
            + ratio.clone().greater_elem(1.0 + clip_epsilon).float())
        .mean()
        .detach();

        ObjectiveTerms {
            loss,
            policy_loss,
            value_loss,
            entropy,
            approx_kl,
            clip_fraction,
            ratio,
        }
    }
}

/// Per-transition value loss
///
/// Without an anchor this is the squared error. With one, the estimate is also
/// clipped to `anchor ± ε` and the larger of the two squared errors is kept,
/// scaled by 0.5.
pub fn value_loss_elements<B: Backend>(
    values: Tensor<B, 1>,
    returns: Tensor<B, 1>,
    clip_epsilon: f32,
    anchor: Option<f32>,
) -> Tensor<B, 1> {
    let unclipped = (values.clone() - returns.clone()).powf_scalar(2.0);

    match anchor {
        None => unclipped,
        Some(anchor) => {
            let clipped = (values.sub_scalar(anchor)).clamp(-clip_epsilon, clip_epsilon).add_scalar(anchor);
            let clipped = (clipped - returns).powf_scalar(2.0);
            unclipped.max_pair(clipped) * 0.5
        }
    }
}

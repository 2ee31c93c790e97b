//! Discounted return targets for a rollout window
//!
//! Both estimators walk the window backwards and produce one target per
//! transition, in forward order. Targets are normalised before they reach the
//! objective.

use burn::{prelude::*, tensor::backend::Backend};
use serde::{Deserialize, Serialize};

/// Value estimate for the state right after a truncated window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bootstrap {
    /// Critic estimate V(s_{T+1})
    pub last_value: f32,
    /// Whether s_{T+1} starts a new episode
    pub next_done: bool,
}

/// Monte-Carlo discounted returns, reset at every `done`
///
/// The reset happens before the step's reward is added, so a terminal step's
/// target is its own reward.
pub fn discounted_returns(rewards: &[f32], dones: &[bool], gamma: f32) -> Vec<f32> {
    let mut returns = vec![0.0; rewards.len()];
    let mut running = 0.0;

    for (i, (&reward, &done)) in rewards.iter().zip(dones).enumerate().rev() {
        if done {
            running = 0.0;
        }
        running = reward + gamma * running;
        returns[i] = running;
    }

    returns
}

/// One-step bootstrapped returns over a fixed window
///
/// `dones[t]` marks that state `t` opened a new episode, so the chain from
/// `t` to `t + 1` is cut by `dones[t + 1]`, and by `bootstrap.next_done` at
/// the window edge.
pub fn bootstrapped_returns(
    rewards: &[f32],
    dones: &[bool],
    gamma: f32,
    bootstrap: Bootstrap,
) -> Vec<f32> {
    let n = rewards.len();
    let mut returns = vec![0.0; n];

    for t in (0..n).rev() {
        let (next_non_terminal, next_return) = if t == n - 1 {
            (1.0 - bootstrap.next_done as u8 as f32, bootstrap.last_value)
        } else {
            (1.0 - dones[t + 1] as u8 as f32, returns[t + 1])
        };
        returns[t] = rewards[t] + gamma * next_non_terminal * next_return;
    }

    returns
}

/// Output of [`normalize`]
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub values: Vec<f32>,
    /// Standard deviation did not exceed the floor, targets carry no signal
    pub degenerate: bool,
}

/// Shift to zero mean and scale to unit sample standard deviation
///
/// `floor` is added to the deviation before dividing. Batches shorter than two
/// elements have deviation zero.
pub fn normalize(values: &[f32], floor: f32) -> Normalized {
    if values.is_empty() {
        return Normalized { values: Vec::new(), degenerate: true };
    }

    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let denom = (values.len().saturating_sub(1)).max(1) as f32;
    let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / denom).sqrt();

    Normalized {
        values: values.iter().map(|v| (v - mean) / (std + floor)).collect(),
        degenerate: std <= floor,
    }
}

/// Tensor counterpart of [`normalize`], keeps the autodiff graph intact
pub fn normalize_tensor<B: Backend>(values: Tensor<B, 1>, floor: f32) -> Tensor<B, 1> {
    let [n] = values.dims();
    let denom = n.saturating_sub(1).max(1) as f32;

    let mean = values.clone().mean();
    let centered = values - mean;
    let std = centered
        .clone()
        .powf_scalar(2.0)
        .sum()
        .div_scalar(denom)
        .sqrt()
        .add_scalar(floor);

    centered / std
}

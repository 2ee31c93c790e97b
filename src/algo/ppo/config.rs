use serde::{Deserialize, Serialize};

use crate::error::PPOError;

/// How returns are estimated and how an update cycle is driven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateVariant {
    /// Monte-Carlo returns reset at episode boundaries.
    /// Snapshot refreshed after the cycle, no divergence checks.
    Episodic,
    /// Fixed window bootstrapped from a value estimate past its end.
    /// Snapshot at the start, annealing, value clipping, grad-norm clipping
    /// and the divergence safeguards.
    Bootstrapped,
}

impl UpdateVariant {
    /// Floor added to the standard deviation when normalising
    pub fn default_normalization_floor(self) -> f32 {
        match self {
            UpdateVariant::Episodic => 1e-5,
            UpdateVariant::Bootstrapped => 1e-8,
        }
    }
}

/// What the second surrogate term clips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurrogateClip {
    /// `clip(ratio, 1 - ε, 1 + ε) * advantage`
    Ratio,
    /// `clip(advantage, 1 - ε, 1 + ε)`, kept for reproducing older runs
    Advantage,
}

/// Configuration for PPO agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PPOAgentConfig {
    /// Update protocol (default: Bootstrapped)
    pub variant: UpdateVariant,
    /// Discount factor γ (default: 0.99)
    pub gamma: f32,
    /// Clipping parameter ε (default: 0.1)
    pub clip_epsilon: f32,
    /// Anneal ε linearly over `anneal_horizon` steps (default: false)
    pub anneal_epsilon: bool,
    /// Adam learning rate (default: 2.5e-4)
    pub learning_rate: f64,
    /// Anneal the learning rate linearly over `anneal_horizon` steps (default: false)
    pub anneal_lr: bool,
    /// Number of environment steps over which annealing reaches zero (default: 10M)
    pub anneal_horizon: usize,
    /// Entropy coefficient β (default: 0.01)
    pub entropy_beta: f32,
    /// Gradient steps per update cycle (default: 4)
    pub num_learn: usize,
    /// Rollout window length (default: 2000)
    pub update_every: usize,
    /// Approximate KL above which a cycle stops or rolls back (default: 0.03)
    pub divergence_threshold: f32,
    /// Ceiling on the global L2 norm of all gradients, bootstrapped variant only (default: Some(0.5))
    pub max_grad_norm: Option<f32>,
    /// Standard deviation floor; `None` picks the variant's default
    pub normalization_floor: Option<f32>,
    /// Surrogate formulation (default: Ratio)
    pub surrogate_clip: SurrogateClip,
    /// Drop the rollout after each update cycle (default: true)
    pub clear_memory_after_update: bool,
}

impl Default for PPOAgentConfig {
    fn default() -> Self {
        Self {
            variant: UpdateVariant::Bootstrapped,
            gamma: 0.99,
            clip_epsilon: 0.1,
            anneal_epsilon: false,
            learning_rate: 2.5e-4,
            anneal_lr: false,
            anneal_horizon: 10_000_000,
            entropy_beta: 0.01,
            num_learn: 4,
            update_every: 2000,
            divergence_threshold: 0.03,
            max_grad_norm: Some(0.5),
            normalization_floor: None,
            surrogate_clip: SurrogateClip::Ratio,
            clear_memory_after_update: true,
        }
    }
}

impl PPOAgentConfig {
    /// Parse a (possibly partial) JSON document, missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, PPOError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, PPOError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Floor actually used for return and advantage normalisation
    pub fn floor(&self) -> f32 {
        self.normalization_floor
            .unwrap_or_else(|| self.variant.default_normalization_floor())
    }

    pub fn validate(&self) -> Result<(), PPOError> {
        let invalid = |msg: String| Err(PPOError::InvalidConfig(msg));

        if !(0.0..=1.0).contains(&self.gamma) {
            return invalid(format!("gamma must lie in [0, 1], got {}", self.gamma));
        }
        if !(self.clip_epsilon > 0.0) {
            return invalid(format!("clip_epsilon must be positive, got {}", self.clip_epsilon));
        }
        if !(self.learning_rate > 0.0) {
            return invalid(format!("learning_rate must be positive, got {}", self.learning_rate));
        }
        if self.entropy_beta < 0.0 {
            return invalid(format!("entropy_beta must not be negative, got {}", self.entropy_beta));
        }
        if self.num_learn == 0 {
            return invalid("num_learn must be at least 1".into());
        }
        if self.update_every == 0 {
            return invalid("update_every must be at least 1".into());
        }
        if !(self.divergence_threshold > 0.0) {
            return invalid(format!(
                "divergence_threshold must be positive, got {}",
                self.divergence_threshold
            ));
        }
        if (self.anneal_lr || self.anneal_epsilon) && self.anneal_horizon == 0 {
            return invalid("anneal_horizon must be positive when annealing is enabled".into());
        }
        if let Some(norm) = self.max_grad_norm {
            if !(norm > 0.0) {
                return invalid(format!("max_grad_norm must be positive, got {norm}"));
            }
        }
        if !(self.floor() > 0.0) {
            return invalid(format!("normalization_floor must be positive, got {}", self.floor()));
        }
        Ok(())
    }
}

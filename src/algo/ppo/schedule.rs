//! Linear annealing of the learning rate and clip epsilon

use serde::{Deserialize, Serialize};

/// Values in effect for one update cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub learning_rate: f64,
    pub clip_epsilon: f32,
}

/// Remaining share of training, `1 - (global_step - 1) / horizon`, clamped to [0, 1]
///
/// Step 1 is the first environment step and yields 1; step `horizon + 1` and
/// everything after it yields 0.
pub fn progress_fraction(global_step: usize, horizon: usize) -> f64 {
    if horizon == 0 {
        return 0.0;
    }
    let elapsed = global_step.saturating_sub(1) as f64;
    (1.0 - elapsed / horizon as f64).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Annealing {
    pub horizon: usize,
    pub anneal_lr: bool,
    pub anneal_epsilon: bool,
}

impl Annealing {
    /// Scale the enabled base values by [`progress_fraction`]
    pub fn apply(&self, base: Hyperparameters, global_step: usize) -> Hyperparameters {
        if !self.anneal_lr && !self.anneal_epsilon {
            return base;
        }
        let frac = progress_fraction(global_step, self.horizon);

        Hyperparameters {
            learning_rate: if self.anneal_lr {
                base.learning_rate * frac
            } else {
                base.learning_rate
            },
            clip_epsilon: if self.anneal_epsilon {
                base.clip_epsilon * frac as f32
            } else {
                base.clip_epsilon
            },
        }
    }
}

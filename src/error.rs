use thiserror::Error;

/// Errors surfaced by the PPO trainer.
///
/// Divergent updates, rollbacks and zero-variance batches are handled inside
/// an update cycle and reported through [`TrainingMetrics`](crate::traits::TrainingMetrics);
/// only failures that abort a cycle end up here.
#[derive(Debug, Error)]
pub enum PPOError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("bootstrapped update requires a last value estimate and next done flag")]
    MissingBootstrap,

    #[error("cannot learn from an empty rollout")]
    EmptyRollout,

    #[error("policy output `{what}` has shape {actual:?}, expected [{expected}]")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: Vec<usize>,
    },

    #[error("loss became non-finite at gradient step {step}, update aborted")]
    NonFiniteLoss { step: usize },

    #[error("failed to read tensor data: {0}")]
    TensorData(String),

    #[error("failed to (de)serialize configuration: {0}")]
    Serde(#[from] serde_json::Error),
}

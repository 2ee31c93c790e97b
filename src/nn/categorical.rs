use burn::{
    prelude::*,
    tensor::{activation::log_softmax, backend::Backend, Distribution},
};

/// Batched categorical distribution over discrete actions
#[derive(Debug, Clone)]
pub struct Categorical<B: Backend> {
    /// `[batch, num_actions]`, normalised
    log_probs: Tensor<B, 2>,
}

impl<B: Backend> Categorical<B> {
    pub fn from_logits(logits: Tensor<B, 2>) -> Self {
        Self {
            log_probs: log_softmax(logits, 1),
        }
    }

    /// One action per row via the Gumbel-max trick, drawn from the backend RNG
    pub fn sample(&self) -> Tensor<B, 1, Int> {
        let uniform = Tensor::<B, 2>::random(
            self.log_probs.shape(),
            Distribution::Uniform(1e-10, 1.0),
            &self.log_probs.device(),
        );
        let gumbel = uniform.log().neg().log().neg();

        (self.log_probs.clone().detach() + gumbel)
            .argmax(1)
            .squeeze_dims(&[1])
    }

    /// log π(a) for one action per row
    pub fn log_prob(&self, actions: Tensor<B, 1, Int>) -> Tensor<B, 1> {
        self.log_probs
            .clone()
            .gather(1, actions.unsqueeze_dim::<2>(1))
            .squeeze_dims(&[1])
    }

    pub fn entropy(&self) -> Tensor<B, 1> {
        let probs = self.log_probs.clone().exp();
        (probs * self.log_probs.clone())
            .sum_dim(1)
            .neg()
            .squeeze_dims(&[1])
    }
}

use burn::{
    prelude::*,
    tensor::backend::{AutodiffBackend, Backend},
};

use super::{Categorical, MLPConfig, MLP};
use crate::algo::ppo::{PolicyEvaluator, PolicyOutput};

/// Configuration for [`ActorCritic`]
#[derive(Config, Debug)]
pub struct ActorCriticConfig {
    /// Flattened observation size
    pub input_dim: usize,
    /// Hidden layers of both trunks
    pub hidden_layers: Vec<usize>,
    pub num_actions: usize,
    #[config(default = "true")]
    pub tanh_hidden: bool,
}

impl ActorCriticConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ActorCritic<B> {
        let mlp = |output_dim| {
            MLPConfig::new(self.input_dim, self.hidden_layers.clone(), output_dim)
                .with_tanh_hidden(self.tanh_hidden)
                .init(device)
        };

        ActorCritic {
            actor: mlp(self.num_actions),
            critic: mlp(1),
        }
    }
}

/// Separate actor and critic MLPs with a categorical policy head
#[derive(Module, Debug)]
pub struct ActorCritic<B: Backend> {
    actor: MLP<B>,
    critic: MLP<B>,
}

impl<B: Backend> ActorCritic<B> {
    /// `[batch, features]` → policy output
    pub fn forward(&self, states: Tensor<B, 2>, actions: Option<Tensor<B, 1, Int>>) -> PolicyOutput<B> {
        let dist = Categorical::from_logits(self.actor.forward(states.clone()));
        let actions = actions.unwrap_or_else(|| dist.sample());

        PolicyOutput {
            log_probs: dist.log_prob(actions.clone()),
            entropy: dist.entropy(),
            values: self.critic.forward(states).squeeze_dims(&[1]),
            actions,
        }
    }

    #[cfg(test)]
    pub(crate) fn flat_parameters(&self) -> Vec<f32> {
        let mut flat = self.actor.flat_parameters();
        flat.extend(self.critic.flat_parameters());
        flat
    }
}

/// Implementation for 2D tensors (batch of states)
/// `[batch, features]`
impl<B: AutodiffBackend> PolicyEvaluator<B, 2> for ActorCritic<B> {
    fn act(&self, states: Tensor<B, 2>, actions: Option<Tensor<B, 1, Int>>) -> PolicyOutput<B> {
        self.forward(states, actions)
    }
}

/// Implementation for 3D tensors (stacked frames)
/// `[batch, frames, features]` flattened to `[batch, frames*features]`
impl<B: AutodiffBackend> PolicyEvaluator<B, 3> for ActorCritic<B> {
    fn act(&self, states: Tensor<B, 3>, actions: Option<Tensor<B, 1, Int>>) -> PolicyOutput<B> {
        let [batch, frames, features] = states.dims();
        self.forward(states.reshape([batch, frames * features]), actions)
    }
}

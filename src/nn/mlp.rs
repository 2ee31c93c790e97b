//! Multi-Layer Perceptron (MLP) - Generic feedforward neural network
//!
//! Used as the actor and critic trunks of [`ActorCritic`](super::ActorCritic).

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::{activation::relu, backend::Backend},
};

/// Configuration for Multi-Layer Perceptron
#[derive(Config, Debug)]
pub struct MLPConfig {
    /// Input dimension
    pub input_dim: usize,
    /// Hidden layer dimensions (e.g., [64, 64] for two hidden layers of 64 units each)
    pub hidden_layers: Vec<usize>,
    /// Output dimension
    pub output_dim: usize,
    /// Use Tanh instead of ReLU between hidden layers (default: false)
    #[config(default = "false")]
    pub tanh_hidden: bool,
}

/// Multi-Layer Perceptron implementation
///
/// Output layer has no activation (linear)
#[derive(Module, Debug)]
pub struct MLP<B: Backend> {
    layers: Vec<Linear<B>>,
    tanh_hidden: bool,
}

impl MLPConfig {
    /// Initialize the MLP with the given configuration
    pub fn init<B: Backend>(&self, device: &B::Device) -> MLP<B> {
        let dims: Vec<usize> = std::iter::once(self.input_dim)
            .chain(self.hidden_layers.iter().copied())
            .chain(std::iter::once(self.output_dim))
            .collect();

        let layers = dims
            .windows(2)
            .map(|pair| LinearConfig::new(pair[0], pair[1]).init(device))
            .collect();

        MLP {
            layers,
            tanh_hidden: self.tanh_hidden,
        }
    }
}

impl<B: Backend> MLP<B> {
    /// Forward pass over the last dimension, works with any tensor rank
    pub fn forward<const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        let last = self.layers.len() - 1;
        let mut x = input;

        for (i, layer) in self.layers.iter().enumerate() {
            x = layer.forward(x);
            if i < last {
                x = if self.tanh_hidden { x.tanh() } else { relu(x) };
            }
        }

        x
    }

    /// Weights and biases flattened in layer order
    #[cfg(test)]
    pub(crate) fn flat_parameters(&self) -> Vec<f32> {
        let mut flat = Vec::new();
        for layer in &self.layers {
            flat.extend(layer.weight.val().into_data().to_vec::<f32>().unwrap());
            if let Some(bias) = &layer.bias {
                flat.extend(bias.val().into_data().to_vec::<f32>().unwrap());
            }
        }
        flat
    }
}

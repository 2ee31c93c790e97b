// CartPole with the bootstrapped PPO variant: fixed rollout windows cut
// mid-episode, annealed learning rate, KL guarded updates.
//
// cargo run --example ppo_cartpole --features gym
// RUST_LOG=clipped_ppo=debug shows every gradient step.

use std::collections::VecDeque;

use burn::backend::{
    ndarray::{NdArray, NdArrayDevice},
    Autodiff,
};
use clipped_ppo::{
    algo::ppo::{PPOAgent, PPOAgentConfig, UpdateVariant},
    env::Environment,
    gym::CartPole,
    nn::ActorCriticConfig,
    traits::TrainableAgent,
};
use gym_rs::utils::renderer::RenderMode;
use tracing::info;
use tracing_subscriber::EnvFilter;

type PPOBackend = Autodiff<NdArray>;

const NUM_EPISODES: usize = 300;
const MAX_STEPS: usize = 500;
const WINDOW: usize = 10;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let device = NdArrayDevice::default();
    let mut env = CartPole::new(RenderMode::None, MAX_STEPS);

    // state (4) → 64 → 64 → actions (2) and value (1), tanh hidden layers
    let policy = ActorCriticConfig::new(4, vec![64, 64], 2).init::<PPOBackend>(&device);

    let config = PPOAgentConfig {
        variant: UpdateVariant::Bootstrapped,
        update_every: 256,
        num_learn: 4,
        anneal_lr: true,
        anneal_horizon: NUM_EPISODES * MAX_STEPS,
        ..Default::default()
    };
    info!(config = %config.to_json()?, "starting training");

    let mut agent: PPOAgent<PPOBackend, _, _, 2> = PPOAgent::new(policy, config, device)?;

    let mut rewards = VecDeque::with_capacity(WINDOW);
    let mut rollbacks = 0;

    for episode in 0..NUM_EPISODES {
        env.reset();

        loop {
            let (_, done, metrics) = agent.step(&mut env)?;

            if let Some(metrics) = metrics {
                rollbacks += metrics.rolled_back as usize;
                info!(
                    episode,
                    policy_loss = metrics.policy_loss,
                    value_loss = metrics.value_loss,
                    approx_kl = metrics.approx_kl,
                    learning_rate = metrics.learning_rate,
                    "update"
                );
            }

            if done {
                break;
            }
        }

        if rewards.len() == WINDOW {
            rewards.pop_front();
        }
        rewards.push_back(env.report["reward"]);

        if (episode + 1) % WINDOW == 0 {
            let avg = rewards.iter().sum::<f64>() / rewards.len() as f64;
            info!(
                episode = episode + 1,
                avg_reward = avg,
                total_steps = TrainableAgent::<CartPole>::total_steps(&agent),
                rollbacks,
                "progress"
            );
        }
    }

    info!(cycles = agent.n_cycles(), "training complete");
    Ok(())
}

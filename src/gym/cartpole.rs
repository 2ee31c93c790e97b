use gym_rs::core::{ActionReward, Env};
use gym_rs::envs::classical_control::cartpole::{CartPoleEnv, CartPoleObservation};
use gym_rs::utils::renderer::RenderMode;
use strum::FromRepr;

use crate::env::{Environment, Report};

/// State representation: [x, x_dot, θ, θ_dot]
pub type CartPoleState = [f32; 4];

fn obs2arr(observation: CartPoleObservation) -> CartPoleState {
    let values = Vec::from(observation);
    let mut state = [0.0; 4];
    for (s, v) in state.iter_mut().zip(values) {
        *s = v as f32;
    }
    state
}

/// Actions for the [`CartPole`] environment
/// 0 = push left, 1 = push right
#[derive(FromRepr, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CartPoleAction {
    PushLeft = 0,
    PushRight = 1,
}

impl From<usize> for CartPoleAction {
    fn from(value: usize) -> Self {
        // Anything but 0 pushes right
        Self::from_repr(value).unwrap_or(CartPoleAction::PushRight)
    }
}

/// The classic cart-pole balancing task with discrete actions
///
/// This implementation is a thin wrapper around [gym_rs](https://github.com/MathisWellmann/gym-rs).
/// Reward is 1 per step until the pole falls or the cart leaves the track;
/// episodes are additionally capped at `max_steps`.
#[derive(Debug, Clone)]
pub struct CartPole {
    gym_env: CartPoleEnv,
    steps: usize,
    max_steps: usize,
    // Consumed by the next reset
    seed: Option<u64>,
    pub report: Report,
}

impl CartPole {
    pub fn new(render_mode: RenderMode, max_steps: usize) -> Self {
        Self {
            gym_env: CartPoleEnv::new(render_mode),
            steps: 0,
            max_steps,
            seed: None,
            report: Report::new(vec!["reward"]),
        }
    }

    /// Reproducible episodes: the first reset seeds the environment's RNG
    pub fn seeded(render_mode: RenderMode, max_steps: usize, seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::new(render_mode, max_steps)
        }
    }
}

impl Environment for CartPole {
    type State = CartPoleState;
    type Action = CartPoleAction;

    fn step(&mut self, action: Self::Action) -> (Option<Self::State>, f32) {
        let ActionReward {
            observation,
            reward,
            done,
            ..
        } = self.gym_env.step(action as usize);
        self.steps += 1;

        let next_state = if done || self.steps >= self.max_steps {
            None
        } else {
            Some(obs2arr(observation))
        };

        self.report.entry("reward").and_modify(|x| *x += *reward);

        (next_state, *reward as f32)
    }

    fn reset(&mut self) -> Self::State {
        self.steps = 0;
        self.report.reset();
        obs2arr(self.gym_env.reset(self.seed.take(), false, None).0)
    }

    fn current_state(&self) -> Self::State {
        obs2arr(self.gym_env.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(max_steps: usize, seed: u64) -> CartPole {
        CartPole::seeded(RenderMode::None, max_steps, seed)
    }

    #[test]
    fn test_reset_state_is_near_upright() {
        let mut env = env(500, 7);
        let state = env.reset();

        assert!(state.iter().all(|v| v.abs() <= 0.05));
        assert_eq!(env.current_state(), state);
    }

    #[test]
    fn test_same_seed_same_first_state() {
        assert_eq!(env(500, 42).reset(), env(500, 42).reset());
    }

    #[test]
    fn test_constant_push_topples_pole() {
        let mut env = env(500, 3);
        env.reset();

        let mut steps = 0;
        while env.step(CartPoleAction::PushRight).0.is_some() {
            steps += 1;
            assert!(steps < 500, "pole should fall long before the step cap");
        }

        assert_eq!(env.report["reward"], (steps + 1) as f64);
    }

    #[test]
    fn test_episode_is_capped_at_max_steps() {
        let mut env = env(3, 11);
        env.reset();

        assert!(env.step(CartPoleAction::PushLeft).0.is_some());
        assert!(env.step(CartPoleAction::PushRight).0.is_some());
        assert!(env.step(CartPoleAction::PushLeft).0.is_none());
    }

    #[test]
    fn test_reset_clears_report_and_cap() {
        let mut env = env(3, 5);
        env.reset();
        for _ in 0..3 {
            env.step(CartPoleAction::PushLeft);
        }

        env.reset();

        assert_eq!(env.report["reward"], 0.0);
        assert!(env.step(CartPoleAction::PushRight).0.is_some());
    }

    #[test]
    fn test_action_from_index() {
        assert_eq!(CartPoleAction::from(0), CartPoleAction::PushLeft);
        assert_eq!(CartPoleAction::from(1), CartPoleAction::PushRight);
    }
}

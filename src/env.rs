//! Environment abstraction consumed by the agents
//!
//! An environment hands out states and takes actions. The episode is over when
//! [`Environment::step`] returns `None` for the next state; the reward of that
//! final step is still returned.

use std::{
    collections::BTreeMap,
    ops::{Deref, DerefMut},
};

/// A reinforcement learning environment
pub trait Environment {
    /// Observation handed to the agent
    type State: Clone;
    /// Action accepted by [`Environment::step`]
    type Action;

    /// Apply `action` and return `(next_state, reward)`
    ///
    /// `next_state` is `None` when the episode terminated on this step.
    fn step(&mut self, action: Self::Action) -> (Option<Self::State>, f32);

    /// Start a new episode and return its first state
    fn reset(&mut self) -> Self::State;

    /// State the next call to [`Environment::step`] acts on
    fn current_state(&self) -> Self::State;
}

/// Named per-episode statistics, e.g. accumulated reward
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report(BTreeMap<&'static str, f64>);

impl Report {
    /// Report with every key initialised to zero
    pub fn new(keys: Vec<&'static str>) -> Self {
        Self(keys.into_iter().map(|k| (k, 0.0)).collect())
    }

    /// Reset every entry to zero, keeping the keys
    pub fn reset(&mut self) {
        self.0.values_mut().for_each(|v| *v = 0.0);
    }
}

impl Deref for Report {
    type Target = BTreeMap<&'static str, f64>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Report {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Transitions of the current rollout window, in the order they happened
///
/// Stored as parallel arrays: index `i` of every accessor refers to the same
/// environment step. The buffer does not bound its size, the caller decides
/// when a window is complete.
#[derive(Clone, Debug)]
pub struct RolloutMemory<S> {
    states: Vec<S>,
    actions: Vec<usize>,
    rewards: Vec<f32>,
    log_probs: Vec<f32>,
    dones: Vec<bool>,
}

impl<S> Default for RolloutMemory<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> RolloutMemory<S> {
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            actions: Vec::new(),
            rewards: Vec::new(),
            log_probs: Vec::new(),
            dones: Vec::new(),
        }
    }

    /// Record one step. `log_prob` is the log-probability of `action` under
    /// the policy that chose it.
    pub fn add(&mut self, state: S, action: usize, reward: f32, log_prob: f32, done: bool) {
        self.states.push(state);
        self.actions.push(action);
        self.rewards.push(reward);
        self.log_probs.push(log_prob);
        self.dones.push(done);
    }

    pub fn clear(&mut self) {
        self.states.clear();
        self.actions.clear();
        self.rewards.clear();
        self.log_probs.clear();
        self.dones.clear();
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> &[S] {
        &self.states
    }

    pub fn actions(&self) -> &[usize] {
        &self.actions
    }

    pub fn rewards(&self) -> &[f32] {
        &self.rewards
    }

    pub fn log_probs(&self) -> &[f32] {
        &self.log_probs
    }

    pub fn dones(&self) -> &[bool] {
        &self.dones
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_keeps_arrays_aligned() {
        let mut memory = RolloutMemory::new();
        memory.add([0.0_f32, 1.0], 1, 0.5, -0.7, false);
        memory.add([2.0, 3.0], 0, 1.0, -0.2, true);

        assert_eq!(memory.len(), 2);
        assert_eq!(memory.states()[1], [2.0, 3.0]);
        assert_eq!(memory.actions(), &[1, 0]);
        assert_eq!(memory.rewards(), &[0.5, 1.0]);
        assert_eq!(memory.log_probs(), &[-0.7, -0.2]);
        assert_eq!(memory.dones(), &[false, true]);
    }

    #[test]
    fn test_clear_empties_every_array() {
        let mut memory = RolloutMemory::new();
        for i in 0..5 {
            memory.add(i, i % 2, 1.0, -0.1, i == 4);
        }
        memory.clear();

        assert!(memory.is_empty());
        assert!(memory.actions().is_empty());
        assert!(memory.rewards().is_empty());
        assert!(memory.log_probs().is_empty());
        assert!(memory.dones().is_empty());
    }
}

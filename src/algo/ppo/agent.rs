use burn::{
    module::AutodiffModule,
    optim::{adaptor::OptimizerAdaptor, Adam, AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use tracing::{debug, info, warn};

use super::{
    config::{PPOAgentConfig, UpdateVariant},
    evaluator::{PolicyEvaluator, PolicyOutput},
    grad_norm::{clip_grad_norm, global_grad_norm},
    memory::RolloutMemory,
    objective::{ObjectiveTerms, SurrogateObjective},
    returns::{bootstrapped_returns, discounted_returns, normalize, Bootstrap},
    schedule::{Annealing, Hyperparameters},
};
use crate::{
    env::Environment,
    error::PPOError,
    traits::{ToTensor, TrainableAgent, TrainingMetrics},
};

/// Action chosen by the snapshot policy for a single state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionSample {
    pub action: usize,
    pub log_prob: f32,
    pub value: f32,
    pub entropy: f32,
}

/// Everything an update mutates: current policy, old-policy snapshot,
/// optimizer, device and the learning rate in effect
///
/// `max_grad_norm` bounds the global L2 norm over all parameter gradients.
struct Learner<B, P>
where
    B: AutodiffBackend,
    P: AutodiffModule<B>,
{
    policy: P,
    snapshot: P,
    optimizer: OptimizerAdaptor<Adam, P, B>,
    device: B::Device,
    hyper: Hyperparameters,
    max_grad_norm: Option<f32>,
}

impl<B, P> Learner<B, P>
where
    B: AutodiffBackend,
    P: AutodiffModule<B>,
{
    fn take_snapshot(&mut self) {
        self.snapshot = self.policy.clone();
    }

    fn restore_snapshot(&mut self) {
        self.policy = self.snapshot.clone();
    }

    /// Backpropagate `loss` and step the optimizer, returns the pre-clip gradient norm
    fn apply_gradients(&mut self, loss: Tensor<B, 1>) -> f32 {
        let grads = loss.backward();
        let mut grads = GradientsParams::from_grads(grads, &self.policy);
        let grad_norm = match self.max_grad_norm {
            Some(max_norm) => clip_grad_norm::<B, P>(&self.policy, &mut grads, max_norm),
            None => global_grad_norm::<B, P>(&self.policy, &grads),
        };

        self.policy = self
            .optimizer
            .step(self.hyper.learning_rate, self.policy.clone(), grads);
        grad_norm
    }
}

/// PPO agent for discrete action spaces
///
/// This agent is generic over:
/// - `B`: Autodiff backend (e.g., Wgpu, NdArray)
/// - `P`: Actor-critic network implementing [`PolicyEvaluator`]
/// - `S`: State stored in the rollout memory, shaped into a tensor by [`ToTensor`]
/// - `D`: Dimension of the batched state tensor
pub struct PPOAgent<B, P, S, const D: usize>
where
    B: AutodiffBackend,
    P: PolicyEvaluator<B, D>,
{
    learner: Learner<B, P>,
    memory: RolloutMemory<S>,
    objective: SurrogateObjective,
    annealing: Annealing,
    config: PPOAgentConfig,

    total_steps: usize,
    n_cycles: usize,
    learn_mode: bool,
    // Next recorded state opens an episode (bootstrapped done convention)
    episode_start: bool,
}

impl<B, P, S, const D: usize> PPOAgent<B, P, S, D>
where
    B: AutodiffBackend,
    P: PolicyEvaluator<B, D>,
    S: Clone,
    Vec<S>: ToTensor<B, D, Float>,
{
    /// Create a new PPO agent, the snapshot starts as a copy of `policy`
    pub fn new(policy: P, config: PPOAgentConfig, device: B::Device) -> Result<Self, PPOError> {
        config.validate()?;

        let max_grad_norm = match config.variant {
            UpdateVariant::Episodic => None,
            UpdateVariant::Bootstrapped => config.max_grad_norm,
        };

        let objective = SurrogateObjective {
            entropy_beta: config.entropy_beta,
            clip: config.surrogate_clip,
            normalize_advantages: config.variant == UpdateVariant::Bootstrapped,
            floor: config.floor(),
        };
        let annealing = Annealing {
            horizon: config.anneal_horizon,
            anneal_lr: config.anneal_lr,
            anneal_epsilon: config.anneal_epsilon,
        };

        Ok(Self {
            learner: Learner {
                snapshot: policy.clone(),
                policy,
                optimizer: AdamConfig::new().init(),
                device,
                hyper: base_hyperparameters(&config),
                max_grad_norm,
            },
            memory: RolloutMemory::new(),
            objective,
            annealing,
            config,
            total_steps: 0,
            n_cycles: 0,
            learn_mode: true,
            episode_start: false,
        })
    }

    /// Policy being optimised
    pub fn policy(&self) -> &P {
        &self.learner.policy
    }

    /// Frozen policy used for acting and as the ratio denominator
    pub fn snapshot(&self) -> &P {
        &self.learner.snapshot
    }

    pub fn memory(&self) -> &RolloutMemory<S> {
        &self.memory
    }

    pub fn config(&self) -> &PPOAgentConfig {
        &self.config
    }

    /// Learning rate and clip epsilon of the most recent cycle
    pub fn hyperparameters(&self) -> Hyperparameters {
        self.learner.hyper
    }

    /// Get total number of environment steps recorded
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Number of update cycles run so far
    pub fn n_cycles(&self) -> usize {
        self.n_cycles
    }

    /// Window is full and the agent is in training mode
    pub fn should_learn(&self) -> bool {
        self.learn_mode && self.memory.len() >= self.config.update_every
    }

    /// Sample an action for `state` from the snapshot policy
    pub fn act(&self, state: &S) -> Result<ActionSample, PPOError> {
        let states = vec![state.clone()].to_tensor(&self.learner.device);
        let output = self.learner.snapshot.act(states, None);
        output.validate(1)?;

        let action = output
            .actions
            .into_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .map_err(|e| PPOError::TensorData(format!("{e:?}")))?[0];

        Ok(ActionSample {
            action: action as usize,
            log_prob: scalar(output.log_probs)?,
            value: scalar(output.values)?,
            entropy: scalar(output.entropy)?,
        })
    }

    /// Snapshot's value estimate for `state`, used to bootstrap a truncated window
    pub fn value(&self, state: &S) -> Result<f32, PPOError> {
        Ok(self.act(state)?.value)
    }

    /// Store a transition in the rollout memory
    pub fn add_to_memory(&mut self, state: S, action: usize, reward: f32, log_prob: f32, done: bool) {
        self.memory.add(state, action, reward, log_prob, done);
        self.total_steps += 1;
    }

    /// Run one update cycle on the stored rollout
    ///
    /// `bootstrap` is required by [`UpdateVariant::Bootstrapped`] and ignored by
    /// [`UpdateVariant::Episodic`]. `global_step` drives annealing.
    ///
    /// A cycle that fails midway restores the snapshot, so gradient steps taken
    /// before the failure are discarded and the memory is kept.
    pub fn learn(
        &mut self,
        bootstrap: Option<Bootstrap>,
        global_step: usize,
    ) -> Result<TrainingMetrics, PPOError> {
        if self.memory.is_empty() {
            return Err(PPOError::EmptyRollout);
        }

        let outcome = match (self.config.variant, bootstrap) {
            (UpdateVariant::Episodic, _) => self.learn_episodic(),
            (UpdateVariant::Bootstrapped, Some(bootstrap)) => {
                self.learn_bootstrapped(bootstrap, global_step)
            }
            (UpdateVariant::Bootstrapped, None) => return Err(PPOError::MissingBootstrap),
        };
        let metrics = match outcome {
            Ok(metrics) => metrics,
            Err(e) => {
                warn!(error = %e, "update cycle aborted, restoring snapshot");
                self.learner.restore_snapshot();
                return Err(e);
            }
        };

        if self.config.clear_memory_after_update {
            self.memory.clear();
        }
        self.n_cycles += 1;

        info!(
            cycle = self.n_cycles,
            policy_loss = metrics.policy_loss,
            value_loss = metrics.value_loss,
            entropy = metrics.entropy,
            approx_kl = metrics.approx_kl,
            n_updates = metrics.n_updates,
            early_stopped = metrics.early_stopped,
            rolled_back = metrics.rolled_back,
            "update cycle finished"
        );

        Ok(metrics)
    }

    fn learn_episodic(&mut self) -> Result<TrainingMetrics, PPOError> {
        let returns = discounted_returns(self.memory.rewards(), self.memory.dones(), self.config.gamma);
        let batch = self.batch(returns)?;

        let mut metrics = batch.metrics(self.learner.hyper);
        for step in 0..self.config.num_learn {
            let (_, terms) = self.evaluate(&batch, None)?;
            let stats = self.optimize(step, terms)?;
            metrics.record(&stats);
        }

        self.learner.take_snapshot();
        Ok(metrics)
    }

    fn learn_bootstrapped(
        &mut self,
        bootstrap: Bootstrap,
        global_step: usize,
    ) -> Result<TrainingMetrics, PPOError> {
        self.learner.hyper = self
            .annealing
            .apply(base_hyperparameters(&self.config), global_step);
        self.learner.take_snapshot();

        let returns = bootstrapped_returns(
            self.memory.rewards(),
            self.memory.dones(),
            self.config.gamma,
            bootstrap,
        );
        let batch = self.batch(returns)?;
        let threshold = self.config.divergence_threshold;

        let mut metrics = batch.metrics(self.learner.hyper);
        for step in 0..self.config.num_learn {
            let (_, terms) = self.evaluate(&batch, Some(bootstrap.last_value))?;
            let stats = self.optimize(step, terms)?;
            metrics.record(&stats);

            if stats.approx_kl.abs() > threshold {
                warn!(step, approx_kl = stats.approx_kl, threshold, "approx KL above threshold, stopping cycle");
                metrics.early_stopped = true;
                break;
            }

            let (after, _) = self.evaluate(&batch, Some(bootstrap.last_value))?;
            let drift = scalar((batch.old_log_probs.clone() - after.log_probs).mean())?;
            if drift.abs() > threshold {
                warn!(step, drift, threshold, "policy drifted past threshold, restoring snapshot");
                self.learner.restore_snapshot();
                metrics.rolled_back = true;
                break;
            }
        }

        if !metrics.rolled_back {
            self.learner.take_snapshot();
        }
        Ok(metrics)
    }

    /// Freeze the rollout into tensors for this cycle
    fn batch(&self, returns: Vec<f32>) -> Result<Batch<B, D>, PPOError> {
        let device = &self.learner.device;
        let normalized = normalize(&returns, self.config.floor());
        if normalized.degenerate {
            warn!(len = returns.len(), "return targets have no variance");
        }

        let actions: Vec<i32> = self.memory.actions().iter().map(|&a| a as i32).collect();

        Ok(Batch {
            states: self.memory.states().to_vec().to_tensor(device).detach(),
            actions: Tensor::<B, 1, Int>::from_data(
                TensorData::from(actions.as_slice()).convert::<B::IntElem>(),
                device,
            ),
            old_log_probs: Tensor::<B, 1>::from_data(
                TensorData::from(self.memory.log_probs()).convert::<B::FloatElem>(),
                device,
            ),
            returns: Tensor::<B, 1>::from_data(
                TensorData::from(normalized.values.as_slice()).convert::<B::FloatElem>(),
                device,
            ),
            len: returns.len(),
            degenerate: normalized.degenerate,
        })
    }

    /// Re-evaluate the rollout under the current policy
    fn evaluate(
        &self,
        batch: &Batch<B, D>,
        value_anchor: Option<f32>,
    ) -> Result<(PolicyOutput<B>, ObjectiveTerms<B>), PPOError> {
        let output = self
            .learner
            .policy
            .act(batch.states.clone(), Some(batch.actions.clone()));
        output.validate(batch.len)?;

        let terms = self.objective.compute(
            &output,
            batch.old_log_probs.clone(),
            batch.returns.clone(),
            self.learner.hyper.clip_epsilon,
            value_anchor,
        );
        Ok((output, terms))
    }

    /// One optimizer step on `terms.loss`, refused when the loss is not finite
    fn optimize(&mut self, step: usize, terms: ObjectiveTerms<B>) -> Result<StepStats, PPOError> {
        let stats = StepStats {
            loss: scalar(terms.loss.clone())?,
            policy_loss: scalar(terms.policy_loss)?,
            value_loss: scalar(terms.value_loss)?,
            entropy: scalar(terms.entropy)?,
            approx_kl: scalar(terms.approx_kl)?,
            clip_fraction: scalar(terms.clip_fraction)?,
        };
        if !stats.loss.is_finite() {
            return Err(PPOError::NonFiniteLoss { step });
        }

        let grad_norm = self.learner.apply_gradients(terms.loss);
        debug!(
            step,
            loss = stats.loss,
            policy_loss = stats.policy_loss,
            value_loss = stats.value_loss,
            entropy = stats.entropy,
            approx_kl = stats.approx_kl,
            clip_fraction = stats.clip_fraction,
            grad_norm,
            learning_rate = self.learner.hyper.learning_rate,
            "gradient step"
        );
        Ok(stats)
    }
}

fn base_hyperparameters(config: &PPOAgentConfig) -> Hyperparameters {
    Hyperparameters {
        learning_rate: config.learning_rate,
        clip_epsilon: config.clip_epsilon,
    }
}

fn scalar<B: Backend>(tensor: Tensor<B, 1>) -> Result<f32, PPOError> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| PPOError::TensorData(format!("{e:?}")))?
        .first()
        .copied()
        .ok_or_else(|| PPOError::TensorData("empty tensor".into()))
}

/// Rollout tensors shared by every gradient step of a cycle
struct Batch<B: AutodiffBackend, const D: usize> {
    states: Tensor<B, D>,
    actions: Tensor<B, 1, Int>,
    old_log_probs: Tensor<B, 1>,
    returns: Tensor<B, 1>,
    len: usize,
    degenerate: bool,
}

impl<B: AutodiffBackend, const D: usize> Batch<B, D> {
    fn metrics(&self, hyper: Hyperparameters) -> TrainingMetrics {
        TrainingMetrics {
            learning_rate: hyper.learning_rate,
            clip_epsilon: hyper.clip_epsilon,
            degenerate_returns: self.degenerate,
            ..Default::default()
        }
    }
}

struct StepStats {
    loss: f32,
    policy_loss: f32,
    value_loss: f32,
    entropy: f32,
    approx_kl: f32,
    clip_fraction: f32,
}

impl TrainingMetrics {
    /// Latest step wins, the cycle reports the state it ended in
    fn record(&mut self, stats: &StepStats) {
        self.policy_loss = stats.policy_loss;
        self.value_loss = stats.value_loss;
        self.entropy = stats.entropy;
        self.approx_kl = stats.approx_kl;
        self.clip_fraction = stats.clip_fraction;
        self.n_updates += 1;
    }
}

/// Implementation of TrainableAgent trait for PPO
///
/// Transitions are collected with the snapshot policy. A cycle runs when the
/// window is full (bootstrapped) or an episode ends (episodic).
impl<B, P, E, const D: usize> TrainableAgent<E> for PPOAgent<B, P, E::State, D>
where
    B: AutodiffBackend,
    P: PolicyEvaluator<B, D>,
    E: Environment,
    E::Action: From<usize>,
    Vec<E::State>: ToTensor<B, D, Float>,
{
    type StepInfo = (f32, bool, Option<TrainingMetrics>);

    fn step(&mut self, env: &mut E) -> Result<Self::StepInfo, PPOError> {
        let state = env.current_state();
        let sample = self.act(&state)?;

        let (next_state, reward) = env.step(sample.action.into());
        let done = next_state.is_none();

        if !self.learn_mode {
            // Evaluation steps are neither stored nor counted
            self.episode_start = done;
            return Ok((reward, done, None));
        }

        let recorded_done = match self.config.variant {
            UpdateVariant::Episodic => done,
            UpdateVariant::Bootstrapped => self.episode_start,
        };
        self.add_to_memory(state, sample.action, reward, sample.log_prob, recorded_done);
        self.episode_start = done;

        let episode_update = self.config.variant == UpdateVariant::Episodic && done;
        if self.should_learn() || episode_update {
            let metrics = TrainableAgent::<E>::learn(self, next_state.as_ref(), done)?;
            return Ok((reward, done, Some(metrics)));
        }
        Ok((reward, done, None))
    }

    fn should_learn(&self) -> bool {
        PPOAgent::should_learn(self)
    }

    fn learn(&mut self, next_state: Option<&E::State>, done: bool) -> Result<TrainingMetrics, PPOError> {
        let bootstrap = match (self.config.variant, next_state) {
            (UpdateVariant::Episodic, _) => None,
            (UpdateVariant::Bootstrapped, Some(state)) if !done => Some(Bootstrap {
                last_value: self.value(state)?,
                next_done: false,
            }),
            (UpdateVariant::Bootstrapped, _) => Some(Bootstrap {
                last_value: 0.0,
                next_done: true,
            }),
        };
        let global_step = self.total_steps;
        PPOAgent::learn(self, bootstrap, global_step)
    }

    /// Reset episode state (clear memory, keep weights)
    fn reset_episode(&mut self) {
        self.memory.clear();
        self.episode_start = false;
    }

    fn total_steps(&self) -> usize {
        self.total_steps
    }

    fn eval(&mut self) {
        self.learn_mode = false;
    }

    fn train(&mut self) {
        self.learn_mode = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{
        backend::{
            ndarray::{NdArray, NdArrayDevice},
            Autodiff,
        },
        tensor::backend::Backend,
    };

    use crate::nn::{ActorCritic, ActorCriticConfig};

    type B = Autodiff<NdArray>;
    type Agent = PPOAgent<B, ActorCritic<B>, [f32; 4], 2>;

    const STATES: [[f32; 4]; 4] = [
        [0.1, -0.2, 0.3, 0.0],
        [0.5, 0.4, -0.1, 0.2],
        [-0.3, 0.0, 0.2, -0.4],
        [0.0, 0.9, -0.6, 0.1],
    ];
    const REWARDS: [f32; 4] = [1.0, -1.0, 0.5, 2.0];

    fn agent(config: PPOAgentConfig) -> Agent {
        let device = NdArrayDevice::default();
        let policy = ActorCriticConfig::new(4, vec![16], 2).init::<B>(&device);
        PPOAgent::new(policy, config, device).unwrap()
    }

    fn episodic() -> PPOAgentConfig {
        PPOAgentConfig {
            variant: UpdateVariant::Episodic,
            ..Default::default()
        }
    }

    fn collect(agent: &mut Agent, dones: [bool; 4]) {
        for (i, state) in STATES.iter().enumerate() {
            let sample = agent.act(state).unwrap();
            agent.add_to_memory(*state, sample.action, REWARDS[i], sample.log_prob, dones[i]);
        }
    }

    /// Walk left or right along a line, the episode ends after `horizon` steps
    struct Corridor {
        position: f32,
        steps: usize,
        horizon: usize,
    }

    impl Corridor {
        fn new(horizon: usize) -> Self {
            Self {
                position: 0.0,
                steps: 0,
                horizon,
            }
        }
    }

    impl Environment for Corridor {
        type State = [f32; 4];
        type Action = usize;

        fn step(&mut self, action: usize) -> (Option<[f32; 4]>, f32) {
            self.position += if action == 1 { 0.1 } else { -0.1 };
            self.steps += 1;

            let reward = self.position;
            if self.steps >= self.horizon {
                (None, reward)
            } else {
                (Some(self.current_state()), reward)
            }
        }

        fn reset(&mut self) -> [f32; 4] {
            self.position = 0.0;
            self.steps = 0;
            self.current_state()
        }

        fn current_state(&self) -> [f32; 4] {
            let progress = self.steps as f32 / self.horizon as f32;
            [self.position, progress, 1.0 - progress, 1.0]
        }
    }

    fn bootstrap() -> Option<Bootstrap> {
        Some(Bootstrap {
            last_value: 0.3,
            next_done: false,
        })
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let device = NdArrayDevice::default();
        let policy = ActorCriticConfig::new(4, vec![16], 2).init::<B>(&device);
        let config = PPOAgentConfig {
            num_learn: 0,
            ..Default::default()
        };

        assert!(matches!(
            Agent::new(policy, config, device),
            Err(PPOError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_learn_on_empty_memory_fails() {
        let mut agent = agent(episodic());
        assert!(matches!(agent.learn(None, 1), Err(PPOError::EmptyRollout)));
    }

    #[test]
    fn test_bootstrapped_learn_requires_bootstrap() {
        let mut agent = agent(PPOAgentConfig::default());
        collect(&mut agent, [false; 4]);

        assert!(matches!(agent.learn(None, 4), Err(PPOError::MissingBootstrap)));
        assert_eq!(agent.memory().len(), 4);
        assert_eq!(agent.n_cycles(), 0);
    }

    #[test]
    fn test_first_episodic_step_has_unit_ratio() {
        let mut agent = agent(episodic());
        collect(&mut agent, [false, false, false, true]);

        let returns = discounted_returns(agent.memory.rewards(), agent.memory.dones(), 0.99);
        let batch = agent.batch(returns).unwrap();
        let (_, terms) = agent.evaluate(&batch, None).unwrap();

        let ratios = terms.ratio.into_data().convert::<f32>().to_vec::<f32>().unwrap();
        assert_eq!(ratios.len(), 4);
        for r in ratios {
            assert!((r - 1.0).abs() < 1e-5, "ratio {r} should be 1");
        }
    }

    #[test]
    fn test_episodic_cycle_runs_every_step_and_refreshes_snapshot() {
        let mut agent = agent(PPOAgentConfig {
            num_learn: 3,
            learning_rate: 1e-2,
            ..episodic()
        });
        let initial = agent.policy().flat_parameters();
        collect(&mut agent, [false, true, false, true]);

        let metrics = agent.learn(None, 4).unwrap();

        assert_eq!(metrics.n_updates, 3);
        assert!(!metrics.early_stopped);
        assert!(!metrics.rolled_back);
        assert_ne!(agent.policy().flat_parameters(), initial);
        assert_eq!(
            agent.snapshot().flat_parameters(),
            agent.policy().flat_parameters()
        );
        assert!(agent.memory().is_empty());
        assert_eq!(agent.n_cycles(), 1);
    }

    #[test]
    fn test_destructive_step_is_rolled_back_exactly() {
        let mut agent = agent(PPOAgentConfig {
            learning_rate: 50.0,
            num_learn: 4,
            ..Default::default()
        });
        let before = agent.policy().flat_parameters();
        collect(&mut agent, [false; 4]);

        let metrics = agent.learn(bootstrap(), 4).unwrap();

        assert!(metrics.rolled_back);
        assert!(!metrics.early_stopped);
        assert_eq!(metrics.n_updates, 1, "no step may follow a rollback");
        assert_eq!(agent.policy().flat_parameters(), before);
        assert_eq!(agent.snapshot().flat_parameters(), before);
    }

    #[test]
    fn test_stale_log_probs_stop_cycle_but_keep_update() {
        let mut agent = agent(PPOAgentConfig {
            num_learn: 4,
            ..Default::default()
        });
        let before = agent.policy().flat_parameters();
        for (i, state) in STATES.iter().enumerate() {
            let sample = agent.act(state).unwrap();
            // Far from what the current policy assigns
            agent.add_to_memory(*state, sample.action, REWARDS[i], -5.0, false);
        }

        let metrics = agent.learn(bootstrap(), 4).unwrap();

        assert!(metrics.early_stopped);
        assert!(!metrics.rolled_back);
        assert_eq!(metrics.n_updates, 1);
        assert!(metrics.approx_kl.abs() > 0.03);
        assert_ne!(agent.policy().flat_parameters(), before);
    }

    #[test]
    fn test_annealing_sets_cycle_hyperparameters() {
        let mut agent = agent(PPOAgentConfig {
            anneal_lr: true,
            anneal_epsilon: true,
            anneal_horizon: 100,
            learning_rate: 2e-4,
            clip_epsilon: 0.2,
            ..Default::default()
        });
        collect(&mut agent, [false; 4]);

        let metrics = agent.learn(bootstrap(), 51).unwrap();

        assert!((metrics.learning_rate - 1e-4).abs() < 1e-12);
        assert!((metrics.clip_epsilon - 0.1).abs() < 1e-6);
        assert_eq!(agent.hyperparameters().learning_rate, metrics.learning_rate);
    }

    #[test]
    fn test_memory_kept_when_clearing_disabled() {
        let mut agent = agent(PPOAgentConfig {
            clear_memory_after_update: false,
            ..episodic()
        });
        collect(&mut agent, [false, false, false, true]);

        agent.learn(None, 4).unwrap();

        assert_eq!(agent.memory().len(), 4);
    }

    #[test]
    fn test_non_finite_loss_aborts_without_update() {
        let mut agent = agent(episodic());
        let before = agent.policy().flat_parameters();
        for (i, state) in STATES.iter().enumerate() {
            let sample = agent.act(state).unwrap();
            let reward = if i == 0 { f32::NAN } else { REWARDS[i] };
            agent.add_to_memory(*state, sample.action, reward, sample.log_prob, i == 3);
        }

        match agent.learn(None, 4) {
            Err(PPOError::NonFiniteLoss { step: 0 }) => {}
            other => panic!("expected non-finite loss, got {other:?}"),
        }
        assert_eq!(agent.policy().flat_parameters(), before);
        assert_eq!(agent.memory().len(), 4);
    }

    #[test]
    fn test_failure_after_applied_steps_restores_snapshot() {
        // One enormous step leaves outputs large enough to overflow the loss
        let mut agent = agent(PPOAgentConfig {
            learning_rate: 1e30,
            num_learn: 4,
            ..episodic()
        });
        let before = agent.policy().flat_parameters();
        collect(&mut agent, [false, false, false, true]);

        match agent.learn(None, 4) {
            Err(PPOError::NonFiniteLoss { step: 1 }) => {}
            other => panic!("expected non-finite loss at the second step, got {other:?}"),
        }
        assert_eq!(agent.policy().flat_parameters(), before);
        assert_eq!(agent.snapshot().flat_parameters(), before);
        assert_eq!(agent.n_cycles(), 0);
    }

    #[test]
    fn test_grad_norm_ceiling_only_in_bootstrapped_variant() {
        let config = PPOAgentConfig {
            max_grad_norm: Some(0.5),
            ..Default::default()
        };
        assert_eq!(agent(config.clone()).learner.max_grad_norm, Some(0.5));

        let config = PPOAgentConfig {
            variant: UpdateVariant::Episodic,
            ..config
        };
        assert_eq!(agent(config).learner.max_grad_norm, None);

        let config = PPOAgentConfig {
            max_grad_norm: None,
            ..Default::default()
        };
        assert_eq!(agent(config).learner.max_grad_norm, None);
    }

    #[derive(Module, Debug)]
    struct TruncatedValues<B: Backend> {
        inner: ActorCritic<B>,
    }

    impl<B: AutodiffBackend> PolicyEvaluator<B, 2> for TruncatedValues<B> {
        fn act(&self, states: Tensor<B, 2>, actions: Option<Tensor<B, 1, Int>>) -> PolicyOutput<B> {
            let mut output = self.inner.forward(states, actions);
            output.values = output.values.slice([0..1]);
            output
        }
    }

    #[test]
    fn test_misshaped_policy_output_is_rejected() {
        let device = NdArrayDevice::default();
        let policy = TruncatedValues {
            inner: ActorCriticConfig::new(4, vec![8], 2).init::<B>(&device),
        };
        let mut agent: PPOAgent<B, _, [f32; 4], 2> =
            PPOAgent::new(policy, episodic(), device).unwrap();

        for state in STATES {
            let sample = agent.act(&state).unwrap();
            agent.add_to_memory(state, sample.action, 1.0, sample.log_prob, false);
        }

        match agent.learn(None, 4) {
            Err(PPOError::ShapeMismatch { what, expected, actual }) => {
                assert_eq!(what, "values");
                assert_eq!(expected, 4);
                assert_eq!(actual, vec![1]);
            }
            other => panic!("expected shape mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_trainable_loop_updates_every_window() {
        let mut agent = agent(PPOAgentConfig {
            update_every: 8,
            num_learn: 2,
            ..Default::default()
        });
        let mut env = Corridor::new(7);
        let mut updates = 0;

        for _ in 0..40 {
            let (_, done, metrics) = agent.step(&mut env).unwrap();
            if let Some(metrics) = metrics {
                updates += 1;
                assert!(metrics.n_updates >= 1);
                assert!(agent.memory().is_empty());
            }
            if done {
                env.reset();
            }
        }

        assert_eq!(updates, 5);
        assert_eq!(TrainableAgent::<Corridor>::total_steps(&agent), 40);
    }

    #[test]
    fn test_trainable_loop_episodic_updates_at_episode_end() {
        let mut agent = agent(PPOAgentConfig {
            num_learn: 2,
            ..episodic()
        });
        let mut env = Corridor::new(10);
        let mut steps = 0;

        loop {
            let (_, done, metrics) = agent.step(&mut env).unwrap();
            steps += 1;
            if done {
                assert!(metrics.is_some());
                break;
            }
            assert!(metrics.is_none());
        }
        assert_eq!(steps, 10);
        assert_eq!(agent.n_cycles(), 1);
    }

    #[test]
    fn test_eval_mode_neither_learns_nor_stores() {
        let mut agent = agent(PPOAgentConfig {
            update_every: 8,
            ..Default::default()
        });
        let mut env = Corridor::new(5);
        TrainableAgent::<Corridor>::eval(&mut agent);

        for _ in 0..6 {
            let (_, done, metrics) = agent.step(&mut env).unwrap();
            assert!(metrics.is_none());
            if done {
                env.reset();
            }
        }
        assert!(agent.memory().is_empty());
        assert_eq!(agent.total_steps(), 0);

        // A full window of training steps is needed before the first update
        TrainableAgent::<Corridor>::train(&mut agent);
        let mut first_update = None;
        for step in 1..=8 {
            let (_, done, metrics) = agent.step(&mut env).unwrap();
            if metrics.is_some() && first_update.is_none() {
                first_update = Some(step);
            }
            if done {
                env.reset();
            }
        }
        assert_eq!(first_update, Some(8));
        assert_eq!(agent.n_cycles(), 1);
    }
}

//! Episode driver: owns the swarm state and advances it one action at a time.

use crate::context::SimContext;
use crate::recorder::{EpisodeRecorder, EpisodeRecording};

use lazyflock_core::config::isolation_rule;
use lazyflock_core::control::apply_laziness;
use lazyflock_core::geometry::relative_state;
use lazyflock_core::integrator::advance;
use lazyflock_core::observation::build_observation;
use lazyflock_core::reward::{self, Entropy};
use lazyflock_core::{
    AgentState, CommMode, EpisodeHistory, EpisodeStatus, FlockConfig, FlockError, Observation,
    PaddingMask, RelativeState, Result, RewardPolicy, SwarmState, Task, TerminationEngine,
    TopologyEngine, ValidatedConfig,
};
use nalgebra::{DMatrix, Vector2};
use tracing::{debug, info, warn};

/// Diagnostics attached to every step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepInfo {
    /// Swarm alignment (Vicsek only)
    pub alignment: Option<f64>,

    /// Entropies of the new state (ACS only)
    pub spatial_entropy: Option<f64>,
    pub velocity_entropy: Option<f64>,

    /// Task reward before any training shaping
    pub original_reward: f64,

    /// Isolated active agents after the step (range mode only)
    pub comm_loss_agents: Vec<bool>,

    /// Index of the step just taken
    pub time_step: usize,
}

/// Everything a `step` call hands back.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub observation: Observation,
    pub reward: f64,
    pub agent_rewards: Vec<f64>,
    pub done: bool,
    pub info: StepInfo,
}

/// Per-episode mutable state, created by a reset.
struct Episode {
    state: SwarmState,
    rel: RelativeState,
    initial_state: SwarmState,
    num_agents: usize,
    time_step: usize,
    status: EpisodeStatus,
    history: EpisodeHistory,
    lost_comm_step: Option<usize>,
    recorder: Option<EpisodeRecorder>,
}

/// Single-environment flocking simulation with per-agent laziness actions.
///
/// The action is one scalar `a_i ∈ [0, 1]` per slot; agent `i` applies
/// `(1 - a_i)` of the turn rate its control law asks for.
pub struct FlockingEnv {
    config: ValidatedConfig,
    ctx: SimContext,
    topology: TopologyEngine,

    /// Termination rules for the current episode; a replay with an explicit
    /// range switches the isolation rule
    termination: TerminationEngine,

    episode: Option<Episode>,
}

impl FlockingEnv {
    /// Validates `config` and builds an environment seeded with `seed`.
    pub fn new(config: FlockConfig, seed: u64) -> Result<Self> {
        if config.env.task_type == Task::Vicsek && config.env.entropy_p_goal.is_some() {
            warn!("entropy_p_goal is ignored by the vicsek task");
        }

        let config = config.validate()?;
        let topology = TopologyEngine::new(config.comm_mode, config.boundary());
        let termination = config.termination;

        info!(
            "FlockingEnv: task={} agents={}..={} comm={:?} seed={}",
            config.task().name(),
            config.num_agents_min,
            config.num_agents_max,
            config.comm_mode,
            seed
        );

        Ok(Self {
            config,
            ctx: SimContext::new(seed),
            topology,
            termination,
            episode: None,
        })
    }

    /// Starts a new episode with a freshly sampled swarm.
    pub fn reset(&mut self) -> Result<Observation> {
        self.topology.set_mode(self.config.comm_mode);
        self.termination = self.config.termination;

        let num_agents = self.ctx.sample_num_agents(&self.config.pool);
        let control = &self.config.raw.control;
        let agents = self
            .ctx
            .sample_agents(num_agents, control.initial_position_bound, control.speed);

        self.start_episode(agents, num_agents)
    }

    /// Starts a new episode from explicit agent states.
    ///
    /// All three slices describe the active agents and must have equal
    /// length within the configured pool bounds. Positions are wrapped into
    /// the domain on a periodic boundary. `num_agents_max`, when
    /// given, must match the configured capacity. `comm_range` switches the
    /// episode to range-limited communication.
    pub fn custom_reset(
        &mut self,
        positions: &[Vector2<f64>],
        velocities: &[Vector2<f64>],
        headings: &[f64],
        num_agents_max: Option<usize>,
        comm_range: Option<f64>,
    ) -> Result<Observation> {
        let num_agents = positions.len();
        if velocities.len() != num_agents || headings.len() != num_agents {
            return Err(FlockError::ScenarioShape(format!(
                "positions ({}), velocities ({}) and headings ({}) must have equal length",
                num_agents,
                velocities.len(),
                headings.len()
            )));
        }
        if num_agents < self.config.num_agents_min || num_agents > self.config.num_agents_max {
            return Err(FlockError::ScenarioShape(format!(
                "{} agents outside the configured range {}..={}",
                num_agents, self.config.num_agents_min, self.config.num_agents_max
            )));
        }
        if let Some(max) = num_agents_max {
            if max != self.config.num_agents_max {
                return Err(FlockError::ScenarioShape(format!(
                    "num_agents_max {} does not match the configured {}",
                    max, self.config.num_agents_max
                )));
            }
        }

        let mode = match comm_range {
            Some(_) if matches!(self.config.comm_mode, CommMode::Fixed(_)) => {
                return Err(FlockError::IncompatibleTopology(
                    "comm_range cannot be set while a fixed topology is configured".into(),
                ));
            }
            Some(range) if range < 0.0 || range.is_nan() => {
                return Err(FlockError::config(format!("comm_range must be >= 0, got {}", range)));
            }
            Some(range) => CommMode::Range(range),
            None => self.config.comm_mode,
        };
        self.topology.set_mode(mode);
        self.termination = TerminationEngine {
            isolation: isolation_rule(mode, self.config.raw.env.ignore_comm_lost_agents),
            ..self.config.termination
        };

        let boundary = self.config.boundary();
        let agents = positions
            .iter()
            .zip(velocities)
            .zip(headings)
            .map(|((p, &v), &h)| AgentState::with_velocity(boundary.wrap_position(p), v, h))
            .collect();

        debug!("custom_reset: {} agents, comm={:?}", num_agents, mode);
        self.start_episode(agents, num_agents)
    }

    fn start_episode(&mut self, agents: Vec<AgentState>, num_agents: usize) -> Result<Observation> {
        let boundary = self.config.boundary();
        let padding = PaddingMask::prefix(num_agents, self.config.num_agents_max);
        let mut state = SwarmState::new(agents, padding);

        let update = self
            .topology
            .initialize(&state.agents, &state.padding_mask, self.ctx.rng_mut())?;
        state.neighbor_masks = update.adjacency;

        let rel = relative_state(&state, boundary);
        let observation = build_observation(&state, &rel, boundary);

        let env = &self.config.raw.env;
        let recorder = (env.get_state_hist || env.get_action_hist).then(|| {
            EpisodeRecorder::new(
                self.config.task().name(),
                self.ctx.seed(),
                env.get_state_hist,
                env.get_action_hist,
                &state.agents,
                &state.neighbor_masks,
                num_agents,
            )
        });

        debug!("Episode reset: {} of {} slots active", num_agents, self.config.num_agents_max);

        self.episode = Some(Episode {
            initial_state: state.clone(),
            state,
            rel,
            num_agents,
            time_step: 0,
            status: EpisodeStatus::Running,
            history: EpisodeHistory::new(self.config.raw.env.max_time_steps),
            lost_comm_step: None,
            recorder,
        });

        Ok(observation)
    }

    /// Applies one laziness vector and advances the swarm by `dt`.
    ///
    /// A rejected action leaves the episode untouched.
    pub fn step(&mut self, action: &[f64]) -> Result<StepOutcome> {
        let episode = self.episode.as_mut().ok_or(FlockError::EpisodeNotStarted)?;
        if episode.status == EpisodeStatus::Done {
            return Err(FlockError::EpisodeFinished(episode.time_step.saturating_sub(1)));
        }

        let capacity = self.config.num_agents_max;
        if action.len() != capacity {
            return Err(FlockError::ActionShape {
                expected: capacity,
                got: action.len(),
            });
        }
        if let Some(index) = action.iter().position(|a| !a.is_finite()) {
            return Err(FlockError::NonFiniteAction { index });
        }

        let clipped = action.iter().filter(|a| !(0.0..=1.0).contains(*a)).count();
        if clipped > 0 {
            warn!("Laziness outside [0, 1] clipped for {} slot(s)", clipped);
        }
        let laziness: Vec<f64> = action.iter().map(|a| a.clamp(0.0, 1.0)).collect();

        let kinematics = &self.config.kinematics;
        let boundary = kinematics.boundary;
        let t = episode.time_step;

        let mut controls = self
            .config
            .control_law
            .compute(&episode.state, &episode.rel, kinematics);
        apply_laziness(&mut controls, &laziness);

        let mut next = advance(&episode.state, &controls, kinematics);
        let update = self
            .topology
            .update(&next.agents, &next.padding_mask, self.ctx.rng_mut())?;
        next.neighbor_masks = update.adjacency;
        let next_rel = relative_state(&next, boundary);

        let (agent_rewards, alignment) = match self.config.reward_policy {
            RewardPolicy::Alignment => {
                let alignment = reward::alignment(&episode.state, kinematics.speed);
                episode.history.record_alignment(t, alignment);
                (reward::broadcast(alignment, &next.padding_mask), Some(alignment))
            }
            RewardPolicy::ControlCost { rho } => (
                reward::control_cost_rewards(
                    &controls,
                    &next.padding_mask,
                    kinematics.dt,
                    kinematics.speed,
                    rho,
                ),
                None,
            ),
        };

        let entropy: Option<Entropy> = match self.config.task() {
            Task::Acs => {
                let e = reward::entropy(&next);
                episode.history.record_entropy(t, e.spatial, e.velocity);
                Some(e)
            }
            Task::Vicsek => None,
        };

        let observation = build_observation(&next, &next_rel, boundary);

        let check = self.termination.check(&episode.history, t, &update.isolated);
        if check.isolation_observed && episode.lost_comm_step.is_none() {
            warn!("Communication lost at step {}", t);
            episode.lost_comm_step = Some(t);
        }

        let original_reward = reward::mean_reward(&agent_rewards, episode.num_agents);
        let reward = match (self.config.shaped_reward, entropy) {
            (Some(shaped), Some(e)) => shaped.compute(e, &agent_rewards, episode.num_agents),
            _ => original_reward,
        };

        if let Some(recorder) = episode.recorder.as_mut() {
            recorder.record(t, &next.agents, &next.neighbor_masks, &laziness);
        }

        if check.done {
            episode.status = EpisodeStatus::Done;
            if let Some(recorder) = episode.recorder.as_mut() {
                recorder.finalize(t, episode.lost_comm_step);
            }
            info!(
                "Episode done at step {} (goal={}, comm_lost={})",
                t, check.goal_reached, check.isolation_observed
            );
        }

        let info = StepInfo {
            alignment,
            spatial_entropy: entropy.map(|e| e.spatial),
            velocity_entropy: entropy.map(|e| e.velocity),
            original_reward,
            comm_loss_agents: update.isolated,
            time_step: t,
        };

        episode.state = next;
        episode.rel = next_rel;
        episode.time_step += 1;

        Ok(StepOutcome {
            observation,
            reward,
            agent_rewards,
            done: check.done,
            info,
        })
    }

    /// Turn rates the control law asks for with every agent fully active.
    pub fn fully_active_controls(&self) -> Option<Vec<f64>> {
        self.episode.as_ref().map(|e| {
            self.config
                .control_law
                .compute(&e.state, &e.rel, &self.config.kinematics)
        })
    }

    /// Current adjacency restricted to active pairs, as 0/1 entries.
    pub fn vicsek_action(&self) -> Option<DMatrix<u8>> {
        self.episode.as_ref().map(|e| {
            let n = e.state.capacity();
            DMatrix::from_fn(n, n, |i, j| {
                u8::from(e.state.neighbor_masks[(i, j)] && e.state.padding_mask.pair_active(i, j))
            })
        })
    }

    /// Communication mode of the current episode; `custom_reset` may
    /// override the configured one.
    pub fn comm_mode(&self) -> CommMode {
        self.topology.mode()
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.ctx.seed()
    }

    pub fn state(&self) -> Option<&SwarmState> {
        self.episode.as_ref().map(|e| &e.state)
    }

    pub fn relative_state(&self) -> Option<&RelativeState> {
        self.episode.as_ref().map(|e| &e.rel)
    }

    /// State right after the last reset.
    pub fn initial_state(&self) -> Option<&SwarmState> {
        self.episode.as_ref().map(|e| &e.initial_state)
    }

    /// Active agents this episode; 0 before the first reset.
    pub fn num_agents(&self) -> usize {
        self.episode.as_ref().map_or(0, |e| e.num_agents)
    }

    pub fn num_agents_min(&self) -> usize {
        self.config.num_agents_min
    }

    pub fn num_agents_max(&self) -> usize {
        self.config.num_agents_max
    }

    /// Steps taken in the current episode.
    pub fn time_step(&self) -> usize {
        self.episode.as_ref().map_or(0, |e| e.time_step)
    }

    pub fn status(&self) -> Option<EpisodeStatus> {
        self.episode.as_ref().map(|e| e.status)
    }

    pub fn is_done(&self) -> bool {
        self.status() == Some(EpisodeStatus::Done)
    }

    pub fn history(&self) -> Option<&EpisodeHistory> {
        self.episode.as_ref().map(|e| &e.history)
    }

    /// First step at which an isolated agent was observed.
    pub fn lost_comm_step(&self) -> Option<usize> {
        self.episode.as_ref().and_then(|e| e.lost_comm_step)
    }

    pub fn has_lost_comm(&self) -> bool {
        self.lost_comm_step().is_some()
    }

    /// Recorded history, when state or action capture is enabled.
    pub fn recording(&self) -> Option<&EpisodeRecording> {
        self.episode
            .as_ref()
            .and_then(|e| e.recorder.as_ref())
            .map(|r| r.recording())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazyflock_core::{AgentPool, BoundaryMode, FixedTopology};

    fn vicsek_config(pool: AgentPool) -> FlockConfig {
        let mut config = FlockConfig::default();
        config.env.task_type = Task::Vicsek;
        config.env.num_agents_pool = pool;
        config.env.max_time_steps = 200;
        config
    }

    fn acs_config(pool: AgentPool) -> FlockConfig {
        let mut config = FlockConfig::default();
        config.env.task_type = Task::Acs;
        config.env.num_agents_pool = pool;
        config.env.max_time_steps = 200;
        config
    }

    #[test]
    fn test_step_before_reset() {
        let mut env = FlockingEnv::new(vicsek_config(AgentPool::Single(4)), 1).unwrap();
        assert_eq!(env.step(&[0.0; 4]).unwrap_err(), FlockError::EpisodeNotStarted);
        assert!(env.state().is_none());
        assert_eq!(env.num_agents(), 0);
    }

    #[test]
    fn test_reset_respects_padding() {
        let mut env = FlockingEnv::new(acs_config(AgentPool::Span { min: 3, max: 8 }), 9).unwrap();

        for _ in 0..10 {
            let obs = env.reset().unwrap();
            let n = env.num_agents();
            let state = env.state().unwrap();

            assert!((3..=8).contains(&n));
            assert_eq!(state.capacity(), 8);
            assert_eq!(state.padding_mask, PaddingMask::prefix(n, 8));
            assert!(state.adjacency_respects_padding());
            assert_eq!(obs.shape(), (8, 8, 4));
            for slot in n..8 {
                assert_eq!(state.agents[slot], AgentState::padding());
            }
        }
    }

    #[test]
    fn test_invalid_action_leaves_state_untouched() {
        let mut env = FlockingEnv::new(acs_config(AgentPool::Single(5)), 3).unwrap();
        env.reset().unwrap();
        let before = env.state().unwrap().clone();

        let err = env.step(&[0.0; 4]).unwrap_err();
        assert_eq!(err, FlockError::ActionShape { expected: 5, got: 4 });

        let err = env.step(&[0.0, 0.0, f64::NAN, 0.0, 0.0]).unwrap_err();
        assert_eq!(err, FlockError::NonFiniteAction { index: 2 });

        assert_eq!(env.state().unwrap(), &before);
        assert_eq!(env.time_step(), 0);
    }

    #[test]
    fn test_out_of_range_action_is_clipped() {
        let mut clipped = FlockingEnv::new(acs_config(AgentPool::Single(5)), 21).unwrap();
        let mut exact = FlockingEnv::new(acs_config(AgentPool::Single(5)), 21).unwrap();
        clipped.reset().unwrap();
        exact.reset().unwrap();

        let a = clipped.step(&[-3.0, 0.5, 7.0, 1.0, 0.0]).unwrap();
        let b = exact.step(&[0.0, 0.5, 1.0, 1.0, 0.0]).unwrap();

        assert_eq!(a.reward, b.reward);
        assert_eq!(clipped.state(), exact.state());
    }

    #[test]
    fn test_fully_lazy_agents_fly_straight() {
        let mut env = FlockingEnv::new(acs_config(AgentPool::Single(6)), 5).unwrap();
        env.reset().unwrap();
        let before: Vec<f64> = env.state().unwrap().agents.iter().map(|a| a.heading).collect();

        let outcome = env.step(&[1.0; 6]).unwrap();
        let after: Vec<f64> = env.state().unwrap().agents.iter().map(|a| a.heading).collect();

        assert_eq!(before, after);
        // Zero control effort leaves only the cruise cost
        let rho_dt = 1.0 * 0.1;
        assert!((outcome.reward + rho_dt).abs() < 1e-12);
    }

    #[test]
    fn test_step_after_done_rejected() {
        let mut config = acs_config(AgentPool::Single(3));
        config.env.max_time_steps = 3;
        let mut env = FlockingEnv::new(config, 2).unwrap();
        env.reset().unwrap();

        let dones: Vec<bool> = (0..3).map(|_| env.step(&[0.0; 3]).unwrap().done).collect();
        assert_eq!(dones, vec![false, false, true]);
        assert!(env.is_done());
        assert_eq!(env.step(&[0.0; 3]).unwrap_err(), FlockError::EpisodeFinished(2));

        env.reset().unwrap();
        assert!(env.step(&[0.0; 3]).is_ok());
    }

    #[test]
    fn test_same_seed_same_episode() {
        let run = |seed: u64| {
            let config = acs_config(AgentPool::Span { min: 4, max: 9 });
            let mut env = FlockingEnv::new(config, seed).unwrap();
            let mut observations = vec![env.reset().unwrap()];
            let mut rewards = Vec::new();
            let mut dones = Vec::new();
            for _ in 0..20 {
                let n = env.num_agents_max();
                let outcome = env.step(&vec![0.25; n]).unwrap();
                observations.push(outcome.observation);
                rewards.push(outcome.reward);
                dones.push(outcome.done);
            }
            (env.state().unwrap().clone(), observations, rewards, dones)
        };

        let (state, observations, rewards, dones) = run(77);
        let (state_b, observations_b, rewards_b, dones_b) = run(77);
        assert_eq!(state, state_b);
        assert_eq!(observations, observations_b);
        assert_eq!(rewards, rewards_b);
        assert_eq!(dones, dones_b);
        assert_ne!(state, run(78).0);
    }

    #[test]
    fn test_fully_active_controls_match_zero_laziness() {
        let mut env = FlockingEnv::new(acs_config(AgentPool::Span { min: 3, max: 7 }), 12).unwrap();
        assert!(env.fully_active_controls().is_none());
        env.reset().unwrap();

        let n = env.num_agents();
        let controls = env.fully_active_controls().unwrap();
        let before: Vec<f64> = env.state().unwrap().agents.iter().map(|a| a.heading).collect();
        assert_eq!(controls.len(), env.num_agents_max());
        assert!(controls[n..].iter().all(|&u| u == 0.0));

        env.step(&vec![0.0; env.num_agents_max()]).unwrap();
        let after = &env.state().unwrap().agents;
        for i in 0..n {
            let turned = after[i].heading - before[i];
            assert!((turned - controls[i] * 0.1).abs() < 1e-12);
        }
    }

    #[test]
    fn test_vicsek_info_and_rewards() {
        let config = vicsek_config(AgentPool::Span { min: 3, max: 5 });
        let mut env = FlockingEnv::new(config, 4).unwrap();
        env.reset().unwrap();
        let n = env.num_agents();
        let outcome = env.step(&[0.0; 5]).unwrap();

        let alignment = outcome.info.alignment.unwrap();
        assert!((0.0..=1.0 + 1e-12).contains(&alignment));
        assert!(outcome.info.spatial_entropy.is_none());
        assert_eq!(env.history().unwrap().alignment()[0], alignment);
        for (slot, r) in outcome.agent_rewards.iter().enumerate() {
            let expected = if slot < n { alignment } else { 0.0 };
            assert_eq!(*r, expected);
        }
        assert!((outcome.reward - alignment).abs() < 1e-12);
    }

    #[test]
    fn test_shaped_reward_overrides_step_reward() {
        let mut config = acs_config(AgentPool::Single(5));
        config.env.is_training = true;
        let mut env = FlockingEnv::new(config, 8).unwrap();
        env.reset().unwrap();

        let outcome = env.step(&[0.0; 5]).unwrap();
        assert!(outcome.info.spatial_entropy.is_some());
        assert_ne!(outcome.reward, outcome.info.original_reward);
    }

    #[test]
    fn test_custom_reset_validation() {
        let mut env = FlockingEnv::new(acs_config(AgentPool::Span { min: 3, max: 5 }), 1).unwrap();
        let p = vec![Vector2::zeros(); 3];
        let v = vec![Vector2::new(15.0, 0.0); 3];

        let err = env.custom_reset(&p, &v, &[0.0; 2], None, None).unwrap_err();
        assert!(matches!(err, FlockError::ScenarioShape(_)));

        let too_many = vec![Vector2::zeros(); 6];
        let err = env
            .custom_reset(&too_many, &vec![Vector2::zeros(); 6], &[0.0; 6], None, None)
            .unwrap_err();
        assert!(matches!(err, FlockError::ScenarioShape(_)));

        let err = env.custom_reset(&p, &v, &[0.0; 3], Some(7), None).unwrap_err();
        assert!(matches!(err, FlockError::ScenarioShape(_)));

        assert!(env.custom_reset(&p, &v, &[0.0; 3], Some(5), Some(10.0)).is_ok());
        assert_eq!(env.num_agents(), 3);
    }

    #[test]
    fn test_custom_reset_wraps_positions_on_torus() {
        let mut config = vicsek_config(AgentPool::Single(2));
        config.env.boundary = BoundaryMode::Periodic;
        config.control.initial_position_bound = 100.0;
        let mut env = FlockingEnv::new(config, 1).unwrap();

        let p = [Vector2::new(70.0, 0.0), Vector2::new(-10.0, -130.0)];
        let v = [Vector2::new(15.0, 0.0); 2];
        env.custom_reset(&p, &v, &[0.0; 2], None, None).unwrap();

        let agents = &env.state().unwrap().agents;
        assert!((agents[0].position.x - -30.0).abs() < 1e-12);
        assert!((agents[1].position.y - -30.0).abs() < 1e-12);
        assert_eq!(env.initial_state().unwrap().agents[0].position, agents[0].position);
        assert_eq!(crate::runner::audit_env(&env), 0);
    }

    #[test]
    fn test_custom_reset_range_lasts_one_episode() {
        let mut env = FlockingEnv::new(acs_config(AgentPool::Single(3)), 8).unwrap();
        assert_eq!(env.comm_mode(), CommMode::Unbounded);

        let p = [Vector2::new(0.0, 0.0), Vector2::new(10.0, 0.0), Vector2::new(90.0, 0.0)];
        let v = [Vector2::new(15.0, 0.0); 3];
        env.custom_reset(&p, &v, &[0.0; 3], Some(3), Some(20.0)).unwrap();
        assert!(env.comm_mode().is_range());
        assert!(!env.state().unwrap().neighbor_masks[(1, 2)]);

        env.reset().unwrap();
        assert_eq!(env.comm_mode(), CommMode::Unbounded);
        assert!(!env.comm_mode().is_range());
    }

    #[test]
    fn test_custom_reset_range_with_fixed_topology() {
        let mut config = acs_config(AgentPool::Single(4));
        config.env.enable_custom_topology = true;
        config.env.custom_topology = Some(FixedTopology::Ring);
        let mut env = FlockingEnv::new(config, 1).unwrap();

        let p = vec![Vector2::zeros(); 4];
        let v = vec![Vector2::zeros(); 4];
        let err = env.custom_reset(&p, &v, &[0.0; 4], None, Some(30.0)).unwrap_err();
        assert!(matches!(err, FlockError::IncompatibleTopology(_)));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_vicsek_action_masks_padding() {
        let mut env = FlockingEnv::new(vicsek_config(AgentPool::List(vec![3, 6])), 12).unwrap();
        env.reset().unwrap();
        let n = env.num_agents();
        let action = env.vicsek_action().unwrap();

        assert_eq!(action.nrows(), 6);
        for i in 0..6 {
            for j in 0..6 {
                let expected = u8::from(i < n && j < n);
                assert_eq!(action[(i, j)], expected);
            }
        }
    }

    #[test]
    fn test_recording_collects_frames() {
        let mut config = vicsek_config(AgentPool::Single(4));
        config.env.get_state_hist = true;
        config.env.get_action_hist = true;
        config.env.max_time_steps = 5;
        config.env.boundary = BoundaryMode::Periodic;
        let mut env = FlockingEnv::new(config, 6).unwrap();
        env.reset().unwrap();

        while !env.step(&[0.5; 4]).unwrap().done {}

        let recording = env.recording().unwrap();
        assert_eq!(recording.len(), 5);
        assert_eq!(recording.done_step, Some(4));
        assert_eq!(recording.frames[2].action.as_deref(), Some(&[0.5; 4][..]));
        assert_eq!(recording.initial_agents, env.initial_state().unwrap().agents);
    }

    #[test]
    fn test_no_recording_by_default() {
        let mut env = FlockingEnv::new(acs_config(AgentPool::Single(3)), 1).unwrap();
        env.reset().unwrap();
        env.step(&[0.0; 3]).unwrap();
        assert!(env.recording().is_none());
    }
}

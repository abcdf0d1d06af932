//! Scenario runner - executes deterministic flocking scenarios.

use crate::env::FlockingEnv;
use crate::recorder::EpisodeRecording;
use crate::scenarios::ScenarioId;

use lazyflock_core::geometry::wrap_to_domain;
use lazyflock_core::{
    AgentPool, BoundaryMode, FixedTopology, FlockConfig, FlockError, Result, SwarmState, Task,
};
use nalgebra::Vector2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Uniform};
use rayon::prelude::*;
use std::f64::consts::PI;
use tracing::{debug, info, warn};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,

    /// Episode history, when recording is enabled
    pub recording: Option<EpisodeRecording>,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default)]
pub struct ScenarioMetrics {
    /// Steps taken until DONE
    pub steps: usize,

    /// Active agents in the episode
    pub num_agents: usize,

    pub final_alignment: Option<f64>,
    pub final_spatial_entropy: Option<f64>,
    pub final_velocity_entropy: Option<f64>,

    /// Sum of step rewards
    pub total_reward: f64,

    /// First step with an isolated agent
    pub lost_comm_step: Option<usize>,

    /// Invariant violations found by the per-step audit
    pub invariant_violations: u64,
}

/// Runs flocking scenarios.
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Episode length for the open-ended scenarios
    max_steps: usize,

    /// Capture state and action history
    record: bool,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            max_steps: 300,
            record: false,
        }
    }

    /// Sets the episode length of the isolation and audit scenarios.
    pub fn with_max_steps(mut self, steps: usize) -> Self {
        self.max_steps = steps.max(1);
        self
    }

    /// Enables state and action recording.
    pub fn with_recording(mut self, record: bool) -> Self {
        self.record = record;
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let outcome = match scenario {
            ScenarioId::Consensus => self.run_consensus(),
            ScenarioId::Isolation => self.run_isolation(),
            ScenarioId::StarHub => self.run_star_hub(),
            ScenarioId::WrapAround => self.run_wrap_around(),
            ScenarioId::VicsekFlock => self.run_vicsek_flock(),
            ScenarioId::AcsFlock => self.run_acs_flock(),
        };

        outcome.unwrap_or_else(|err| {
            warn!("Scenario {} aborted: {}", scenario.name(), err);
            ScenarioResult {
                scenario,
                seed: self.seed,
                passed: false,
                failure_reason: Some(err.to_string()),
                metrics: ScenarioMetrics::default(),
                recording: None,
            }
        })
    }

    /// Runs one scenario for every seed on the rayon pool, one environment
    /// per seed. Results keep the order of `seeds`.
    pub fn run_parallel(&self, scenario: ScenarioId, seeds: &[u64]) -> Vec<ScenarioResult> {
        seeds
            .par_iter()
            .map(|&seed| ScenarioRunner { seed, ..self.clone() }.run(scenario))
            .collect()
    }

    fn base_config(&self, task: Task, pool: AgentPool) -> FlockConfig {
        let mut config = FlockConfig::default();
        config.env.task_type = task;
        config.env.num_agents_pool = pool;
        config.env.max_time_steps = self.max_steps;
        config.env.get_state_hist = self.record;
        config.env.get_action_hist = self.record;
        config
    }

    fn finish(
        &self,
        scenario: ScenarioId,
        env: &FlockingEnv,
        metrics: ScenarioMetrics,
        failures: Vec<String>,
    ) -> ScenarioResult {
        let passed = failures.is_empty();
        if passed {
            info!(
                "✓ {} complete: {} steps, {} agents",
                scenario.name(),
                metrics.steps,
                metrics.num_agents
            );
        } else {
            warn!("✗ {} failed: {}", scenario.name(), failures.join("; "));
        }

        ScenarioResult {
            scenario,
            seed: self.seed,
            passed,
            failure_reason: (!passed).then(|| failures.join("; ")),
            metrics,
            recording: env.recording().cloned(),
        }
    }

    /// FLK-001: Consensus - an already aligned swarm.
    ///
    /// **Assertion**: alignment is 1 on every step and the episode ends on
    /// the first step the 32-step stability window is full.
    fn run_consensus(&self) -> Result<ScenarioResult> {
        let mut config = self.base_config(Task::Vicsek, AgentPool::Single(4));
        config.control.max_turn_rate = 0.0;
        config.env.max_time_steps = 100;
        let window = config.env.alignment_window_length;
        let speed = config.control.speed;

        let mut env = FlockingEnv::new(config, self.seed)?;
        let positions = [
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, 0.0),
            Vector2::new(0.0, 10.0),
            Vector2::new(10.0, 10.0),
        ];
        let velocities = [Vector2::new(speed, 0.0); 4];
        env.custom_reset(&positions, &velocities, &[0.0; 4], None, None)?;

        let metrics = drive(&mut env, |_| vec![0.0; 4], false)?;

        let mut failures = Vec::new();
        if metrics.steps != window {
            failures.push(format!("expected DONE after {} steps, got {}", window, metrics.steps));
        }
        if let Some(history) = env.history() {
            if let Some(t) = history.alignment()[..metrics.steps]
                .iter()
                .position(|a| (a - 1.0).abs() > 1e-12)
            {
                failures.push(format!("alignment {} at step {}", history.alignment()[t], t));
            }
        }

        Ok(self.finish(ScenarioId::Consensus, &env, metrics, failures))
    }

    /// FLK-002: Isolation - zero communication range.
    ///
    /// **Assertion**: comm loss ends the episode on step 0 and flags every
    /// agent; with `ignore_comm_lost_agents` the same swarm runs to the cutoff.
    fn run_isolation(&self) -> Result<ScenarioResult> {
        let mut config = self.base_config(Task::Acs, AgentPool::Single(5));
        config.env.comm_range = Some(0.0);

        let mut env = FlockingEnv::new(config.clone(), self.seed)?;
        env.reset()?;
        let first = env.step(&[0.0; 5])?;
        let mut metrics = drive(&mut env, |_| vec![0.0; 5], false)?;
        metrics.steps += 1;
        metrics.total_reward += first.reward;

        let mut failures = Vec::new();
        if !first.done {
            failures.push("episode survived total comm loss".to_string());
        }
        if env.lost_comm_step() != Some(0) {
            failures.push(format!("lost_comm_step {:?}, expected Some(0)", env.lost_comm_step()));
        }
        if !first.info.comm_loss_agents.iter().all(|&lost| lost) {
            failures.push("not every agent flagged as isolated".to_string());
        }

        config.env.ignore_comm_lost_agents = true;
        let mut tolerant = FlockingEnv::new(config, self.seed)?;
        tolerant.reset()?;
        let tolerant_metrics = drive(&mut tolerant, |_| vec![0.0; 5], false)?;
        debug!("  ignore_comm_lost_agents: {} steps", tolerant_metrics.steps);

        if tolerant_metrics.steps != self.max_steps {
            failures.push(format!(
                "ignored comm loss ran {} steps, expected {}",
                tolerant_metrics.steps, self.max_steps
            ));
        }
        if tolerant.lost_comm_step() != Some(0) {
            failures.push("ignored comm loss not recorded".to_string());
        }

        Ok(self.finish(ScenarioId::Isolation, &env, metrics, failures))
    }

    /// FLK-003: StarHub - fixed star topology.
    ///
    /// **Assertion**: one row of degree 6 and five of degree 2 (self-loops
    /// included), and the adjacency is identical on every step.
    fn run_star_hub(&self) -> Result<ScenarioResult> {
        let mut config = self.base_config(Task::Vicsek, AgentPool::Single(6));
        config.env.enable_custom_topology = true;
        config.env.custom_topology = Some(FixedTopology::Star);
        config.env.max_time_steps = self.max_steps.min(50);

        let mut env = FlockingEnv::new(config, self.seed)?;
        env.reset()?;
        let initial = env
            .state()
            .map(|s| s.neighbor_masks.clone())
            .ok_or(FlockError::EpisodeNotStarted)?;

        let mut failures = Vec::new();
        let degrees: Vec<usize> = (0..initial.nrows())
            .map(|i| initial.row(i).iter().filter(|&&linked| linked).count())
            .collect();
        let hubs = degrees.iter().filter(|&&d| d == 6).count();
        let leaves = degrees.iter().filter(|&&d| d == 2).count();
        if hubs != 1 || leaves != 5 {
            failures.push(format!("star degrees {:?}", degrees));
        }

        let mut changed = 0;
        let metrics = drive(
            &mut env,
            |env| {
                if env.state().map(|s| s.neighbor_masks != initial).unwrap_or(true) {
                    changed += 1;
                }
                vec![0.0; 6]
            },
            false,
        )?;
        if env.state().map(|s| s.neighbor_masks != initial).unwrap_or(true) {
            changed += 1;
        }
        if changed > 0 {
            failures.push(format!("star adjacency changed on {} step(s)", changed));
        }

        Ok(self.finish(ScenarioId::StarHub, &env, metrics, failures))
    }

    /// FLK-004: WrapAround - neighbors across the periodic seam.
    ///
    /// **Assertion**: agents at x=-48 and x=48 on a 100 m torus are 4 m apart
    /// and linked; after 10 straight steps agent 0 has wrapped to x=37.
    fn run_wrap_around(&self) -> Result<ScenarioResult> {
        let mut config = self.base_config(Task::Vicsek, AgentPool::Single(3));
        config.env.boundary = BoundaryMode::Periodic;
        config.env.comm_range = Some(5.0);
        config.env.ignore_comm_lost_agents = true;
        config.env.max_time_steps = 10;
        config.control.initial_position_bound = 100.0;
        config.control.max_turn_rate = 0.0;
        let speed = config.control.speed;

        let mut env = FlockingEnv::new(config, self.seed)?;
        let positions = [Vector2::new(-48.0, 0.0), Vector2::new(48.0, 0.0), Vector2::new(0.0, 0.0)];
        let headings = [PI, 0.0, PI / 2.0];
        let velocities: Vec<Vector2<f64>> = headings
            .iter()
            .map(|h| Vector2::new(h.cos(), h.sin()) * speed)
            .collect();
        env.custom_reset(&positions, &velocities, &headings, None, None)?;

        let mut failures = Vec::new();
        let distance = env.relative_state().map(|r| r.distances[(0, 1)]).unwrap_or(f64::NAN);
        if (distance - 4.0).abs() > 1e-9 {
            failures.push(format!("seam distance {:.6}, expected 4", distance));
        }
        if !env.state().map(|s| s.neighbor_masks[(0, 1)]).unwrap_or(false) {
            failures.push("agents across the seam are not neighbors".to_string());
        }

        let metrics = drive(&mut env, |_| vec![0.0; 3], true)?;
        let x0 = env.state().map(|s| s.agents[0].position.x).unwrap_or(f64::NAN);
        let expected = wrap_to_domain(-48.0 - 10.0 * speed * 0.1, 100.0);
        if (x0 - expected).abs() > 1e-9 {
            failures.push(format!("agent 0 at x={:.6}, expected {:.6}", x0, expected));
        }
        if metrics.invariant_violations > 0 {
            failures.push(format!("{} invariant violation(s)", metrics.invariant_violations));
        }

        Ok(self.finish(ScenarioId::WrapAround, &env, metrics, failures))
    }

    /// FLK-005: VicsekFlock - random swarm with range-limited links.
    fn run_vicsek_flock(&self) -> Result<ScenarioResult> {
        let mut config = self.base_config(Task::Vicsek, AgentPool::Span { min: 10, max: 20 });
        config.env.comm_range = Some(60.0);
        config.env.ignore_comm_lost_agents = true;
        self.run_audit(ScenarioId::VicsekFlock, config)
    }

    /// FLK-006: AcsFlock - random swarm on a torus with full links.
    fn run_acs_flock(&self) -> Result<ScenarioResult> {
        let mut config = self.base_config(Task::Acs, AgentPool::Span { min: 10, max: 20 });
        config.env.boundary = BoundaryMode::Periodic;
        self.run_audit(ScenarioId::AcsFlock, config)
    }

    /// Drives a random-laziness episode and audits the state every step.
    fn run_audit(&self, scenario: ScenarioId, config: FlockConfig) -> Result<ScenarioResult> {
        let policy_seed = self.seed.wrapping_mul(0x9e3779b97f4a7c15);
        let mut policy_rng = ChaCha8Rng::seed_from_u64(policy_seed);
        let laziness = Uniform::new_inclusive(0.0, 1.0);

        let mut env = FlockingEnv::new(config, self.seed)?;
        env.reset()?;
        let capacity = env.num_agents_max();

        let metrics = drive(
            &mut env,
            |_| (0..capacity).map(|_| laziness.sample(&mut policy_rng)).collect(),
            true,
        )?;

        let failures = if metrics.invariant_violations > 0 {
            vec![format!("{} invariant violation(s)", metrics.invariant_violations)]
        } else {
            Vec::new()
        };
        Ok(self.finish(scenario, &env, metrics, failures))
    }
}

/// Steps `env` until DONE, collecting metrics and optionally auditing.
fn drive<F>(env: &mut FlockingEnv, mut policy: F, audit: bool) -> Result<ScenarioMetrics>
where
    F: FnMut(&FlockingEnv) -> Vec<f64>,
{
    let mut metrics = ScenarioMetrics {
        num_agents: env.num_agents(),
        ..Default::default()
    };
    if audit {
        metrics.invariant_violations += audit_env(env);
    }

    while !env.is_done() {
        let action = policy(env);
        let outcome = env.step(&action)?;

        metrics.steps += 1;
        metrics.total_reward += outcome.reward;
        metrics.final_alignment = outcome.info.alignment;
        metrics.final_spatial_entropy = outcome.info.spatial_entropy;
        metrics.final_velocity_entropy = outcome.info.velocity_entropy;

        if audit {
            metrics.invariant_violations += audit_env(env);
        }
        if outcome.info.time_step % 100 == 0 {
            debug!(
                "  t={} | reward={:.4} | done={}",
                outcome.info.time_step, outcome.reward, outcome.done
            );
        }
    }

    metrics.lost_comm_step = env.lost_comm_step();
    Ok(metrics)
}

/// Counts violated state invariants of the current episode.
pub fn audit_env(env: &FlockingEnv) -> u64 {
    let (Some(state), Some(rel)) = (env.state(), env.relative_state()) else {
        return 0;
    };
    let mut violations = Vec::new();
    let n = state.capacity();
    let num_agents = env.num_agents();

    if !(env.num_agents_min()..=env.num_agents_max()).contains(&num_agents) {
        violations.push(format!("num_agents {} outside pool", num_agents));
    }
    if state.padding_mask.num_active() != num_agents
        || (0..n).any(|i| state.padding_mask.is_active(i) != (i < num_agents))
    {
        violations.push("padding mask is not a prefix of num_agents".to_string());
    }
    if !state.adjacency_respects_padding() {
        violations.push("edge touches a padding slot".to_string());
    }
    for i in 0..n {
        for j in 0..n {
            if !state.padding_mask.pair_active(i, j) && !rel.is_zero_at(i, j) {
                violations.push(format!("relative state non-zero at padding pair ({}, {})", i, j));
            }
        }
    }
    if env.comm_mode().is_range() {
        violations.extend(range_violations(state));
    }
    if env.config().boundary().is_periodic() {
        let half = env.config().boundary().size() / 2.0;
        for agent in state.active_agents() {
            let p = agent.position;
            if !(-half..half).contains(&p.x) || !(-half..half).contains(&p.y) {
                violations.push(format!("position ({:.3}, {:.3}) outside the torus", p.x, p.y));
            }
        }
    }

    for v in &violations {
        debug!("  invariant violated at t={}: {}", env.time_step(), v);
    }
    violations.len() as u64
}

fn range_violations(state: &SwarmState) -> Vec<String> {
    let mut violations = Vec::new();
    if state.neighbor_masks != state.neighbor_masks.transpose() {
        violations.push("range adjacency is not symmetric".to_string());
    }
    for i in state.padding_mask.active_indices() {
        if !state.neighbor_masks[(i, i)] {
            violations.push(format!("active agent {} lacks its self-loop", i));
        }
    }
    violations
}

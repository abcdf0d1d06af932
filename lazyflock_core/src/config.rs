//! Simulation configuration and its validation into resolved strategies.
//!
//! `FlockConfig` mirrors the on-disk layout (a `control` and an `env`
//! section) and is deserializable with serde. Loading it from a file is
//! the caller's business. `FlockConfig::validate` checks every field once
//! and resolves the task, boundary and communication selectors into the
//! closed strategy enums the engine dispatches on.

use crate::control::{AcsGains, ControlLaw};
use crate::error::{FlockError, Result};
use crate::geometry::Boundary;
use crate::integrator::Kinematics;
use crate::reward::{RewardPolicy, ShapedReward};
use crate::termination::{IsolationRule, TerminationEngine, TerminationPolicy};
use crate::topology::{CommMode, FixedTopology};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Physical and control-law parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Cruise speed in m/s
    pub speed: f64,

    /// Turn-rate saturation in rad/s
    pub max_turn_rate: f64,

    /// Side of the initial square (and of the periodic domain) in meters
    pub initial_position_bound: f64,

    // ACS gains
    pub beta: f64,
    pub lam: f64,
    pub sig: f64,
    pub k1: f64,
    pub k2: f64,
    pub r0: f64,

    /// Weight of the cruise cost against control effort
    pub rho: f64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            speed: 15.0,
            max_turn_rate: 8.0 / 15.0,
            initial_position_bound: 250.0,
            beta: 1.0 / 3.0,
            lam: 5.0,
            sig: 1.0,
            k1: 1.0,
            k2: 3.0,
            r0: 60.0,
            rho: 1.0,
        }
    }
}

/// Flocking task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    Vicsek,
    Acs,
}

impl Task {
    pub fn name(&self) -> &'static str {
        match self {
            Task::Vicsek => "vicsek",
            Task::Acs => "acs",
        }
    }
}

impl FromStr for Task {
    type Err = FlockError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "vicsek" => Ok(Task::Vicsek),
            "acs" => Ok(Task::Acs),
            _ => Err(FlockError::unsupported(format!("task '{}'", s))),
        }
    }
}

/// Domain boundary selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryMode {
    Open,
    Periodic,
}

impl FromStr for BoundaryMode {
    type Err = FlockError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "open" => Ok(BoundaryMode::Open),
            "periodic" => Ok(BoundaryMode::Periodic),
            _ => Err(FlockError::unsupported(format!("boundary mode '{}'", s))),
        }
    }
}

/// Observation/action layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvMode {
    /// One centralized observation and a joint action vector
    SingleEnv,

    /// Per-agent dictionaries (not implemented)
    MultiEnv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// One laziness scalar in [0, 1] per slot
    LazinessVector,

    /// Per-agent neighbor selection (not implemented)
    BinaryVector,
}

/// Pool of agent counts sampled at each reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AgentPool {
    /// Always the same count
    Single(usize),

    /// Uniform choice among the listed counts
    List(Vec<usize>),

    /// Uniform choice in `min..=max`
    Span { min: usize, max: usize },
}

impl AgentPool {
    /// Expands the pool into the list of candidate counts.
    pub fn resolve(&self) -> Result<Vec<usize>> {
        let counts = match self {
            AgentPool::Single(n) => vec![*n],
            AgentPool::List(counts) => {
                if counts.is_empty() {
                    return Err(FlockError::InvalidAgentPool("pool must not be empty".into()));
                }
                counts.clone()
            }
            AgentPool::Span { min, max } => {
                if min > max {
                    return Err(FlockError::InvalidAgentPool(format!(
                        "min ({}) must be <= max ({})",
                        min, max
                    )));
                }
                (*min..=*max).collect()
            }
        };

        if let Some(bad) = counts.iter().find(|&&n| n < 2) {
            return Err(FlockError::InvalidAgentPool(format!(
                "every agent count must be > 1, got {}",
                bad
            )));
        }
        Ok(counts)
    }
}

/// Episode, topology, goal and reward-shaping parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Enables the shaped ACS training reward
    pub is_training: bool,
    pub env_mode: EnvMode,
    pub action_type: ActionType,
    pub num_agents_pool: AgentPool,

    /// Step length in seconds
    pub dt: f64,

    pub enable_custom_topology: bool,
    pub custom_topology: Option<FixedTopology>,

    /// Communication range in meters; `None` means unbounded
    pub comm_range: Option<f64>,

    pub max_time_steps: usize,
    pub use_fixed_episode_length: bool,
    pub get_state_hist: bool,
    pub get_action_hist: bool,
    pub ignore_comm_lost_agents: bool,
    pub boundary: BoundaryMode,
    pub task_type: Task,

    // Vicsek goals
    pub alignment_goal: f64,
    pub alignment_rate_goal: f64,
    pub alignment_window_length: usize,

    // ACS goals; `entropy_p_goal` defaults to 0.7 * r0
    pub entropy_p_goal: Option<f64>,
    pub entropy_v_goal: f64,
    pub entropy_p_rate_goal: f64,
    pub entropy_v_rate_goal: f64,
    pub entropy_rate_window_length: usize,

    // Shaped reward weights
    pub acs_train_w_pos: f64,
    pub acs_train_w_vel: f64,
    pub acs_train_w_ctrl: f64,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            is_training: false,
            env_mode: EnvMode::SingleEnv,
            action_type: ActionType::LazinessVector,
            num_agents_pool: AgentPool::Single(20),
            dt: 0.1,
            enable_custom_topology: false,
            custom_topology: None,
            comm_range: None,
            max_time_steps: 1000,
            use_fixed_episode_length: false,
            get_state_hist: false,
            get_action_hist: false,
            ignore_comm_lost_agents: false,
            boundary: BoundaryMode::Open,
            task_type: Task::Acs,
            alignment_goal: 0.97,
            alignment_rate_goal: 0.03,
            alignment_window_length: 32,
            entropy_p_goal: None,
            entropy_v_goal: 0.1,
            entropy_p_rate_goal: 0.1,
            entropy_v_rate_goal: 0.2,
            entropy_rate_window_length: 50,
            acs_train_w_pos: 1.0,
            acs_train_w_vel: 0.2,
            acs_train_w_ctrl: 0.02,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockConfig {
    pub control: ControlConfig,
    pub env: EnvConfig,
}

fn require_positive(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(FlockError::config(format!("{} must be > 0, got {}", name, value)))
    }
}

impl FlockConfig {
    /// Resolves the communication mode from the range/topology fields.
    fn comm_mode(&self) -> Result<CommMode> {
        let env = &self.env;
        if env.enable_custom_topology {
            let kind = env.custom_topology.ok_or_else(|| {
                FlockError::config(
                    "custom_topology must be set when enable_custom_topology is true",
                )
            })?;
            if env.comm_range.is_some() {
                return Err(FlockError::IncompatibleTopology(format!(
                    "comm_range cannot be combined with the {} topology",
                    kind.name()
                )));
            }
            return Ok(CommMode::Fixed(kind));
        }

        match env.comm_range {
            Some(range) if range < 0.0 || range.is_nan() => {
                Err(FlockError::config(format!("comm_range must be >= 0, got {}", range)))
            }
            Some(range) => Ok(CommMode::Range(range)),
            None => Ok(CommMode::Unbounded),
        }
    }

    /// Validates every field and resolves the engine strategies.
    pub fn validate(mut self) -> Result<ValidatedConfig> {
        if self.env.env_mode == EnvMode::MultiEnv {
            return Err(FlockError::unsupported("multi_env observation layout"));
        }
        if self.env.action_type != ActionType::LazinessVector {
            return Err(FlockError::unsupported("action_type other than laziness_vector"));
        }

        let pool = self.env.num_agents_pool.resolve()?;
        let num_agents_min = pool.iter().copied().min().unwrap_or(0);
        let num_agents_max = pool.iter().copied().max().unwrap_or(0);

        let control = &self.control;
        require_positive("dt", self.env.dt)?;
        require_positive("speed", control.speed)?;
        require_positive("initial_position_bound", control.initial_position_bound)?;
        if !(control.max_turn_rate >= 0.0) {
            return Err(FlockError::config("max_turn_rate must be >= 0"));
        }
        if self.env.max_time_steps == 0 {
            return Err(FlockError::config("max_time_steps must be > 0"));
        }

        let comm_mode = self.comm_mode()?;

        let termination_policy = match self.env.task_type {
            Task::Vicsek => {
                if self.env.alignment_window_length == 0 {
                    return Err(FlockError::config("alignment_window_length must be > 0"));
                }
                TerminationPolicy::Alignment {
                    goal: self.env.alignment_goal,
                    rate_goal: self.env.alignment_rate_goal,
                    window: self.env.alignment_window_length,
                }
            }
            Task::Acs => {
                let p_goal = *self
                    .env
                    .entropy_p_goal
                    .get_or_insert(0.7 * self.control.r0);
                require_positive("entropy_p_goal", p_goal)?;
                require_positive("entropy_v_goal", self.env.entropy_v_goal)?;
                require_positive("entropy_p_rate_goal", self.env.entropy_p_rate_goal)?;
                require_positive("entropy_v_rate_goal", self.env.entropy_v_rate_goal)?;
                if self.env.entropy_rate_window_length == 0 {
                    return Err(FlockError::config("entropy_rate_window_length must be > 0"));
                }
                TerminationPolicy::Entropy {
                    p_goal,
                    v_goal: self.env.entropy_v_goal,
                    p_rate_goal: self.env.entropy_p_rate_goal,
                    v_rate_goal: self.env.entropy_v_rate_goal,
                    window: self.env.entropy_rate_window_length,
                }
            }
        };

        let size = self.control.initial_position_bound;
        let boundary = match self.env.boundary {
            BoundaryMode::Open => Boundary::Open { size },
            BoundaryMode::Periodic => Boundary::Periodic { size },
        };

        let control_law = match self.env.task_type {
            Task::Vicsek => ControlLaw::Vicsek,
            Task::Acs => ControlLaw::Acs(AcsGains {
                beta: self.control.beta,
                lam: self.control.lam,
                sig: self.control.sig,
                k1: self.control.k1,
                k2: self.control.k2,
                r0: self.control.r0,
            }),
        };

        let reward_policy = match self.env.task_type {
            Task::Vicsek => RewardPolicy::Alignment,
            Task::Acs => RewardPolicy::ControlCost {
                rho: self.control.rho,
            },
        };

        let shaped_reward = match (self.env.task_type, self.env.is_training) {
            (Task::Acs, true) => Some(ShapedReward {
                spatial_goal: self.env.entropy_p_goal.unwrap_or(0.7 * self.control.r0),
                velocity_goal: self.env.entropy_v_goal,
                w_pos: self.env.acs_train_w_pos,
                w_vel: self.env.acs_train_w_vel,
                w_ctrl: self.env.acs_train_w_ctrl,
                rho: self.control.rho,
                dt: self.env.dt,
            }),
            _ => None,
        };

        let termination = TerminationEngine {
            policy: termination_policy,
            fixed_length: self.env.use_fixed_episode_length,
            max_time_steps: self.env.max_time_steps,
            isolation: isolation_rule(comm_mode, self.env.ignore_comm_lost_agents),
        };

        let kinematics = Kinematics {
            dt: self.env.dt,
            speed: self.control.speed,
            max_turn_rate: self.control.max_turn_rate,
            boundary,
        };

        Ok(ValidatedConfig {
            raw: self,
            pool,
            num_agents_min,
            num_agents_max,
            comm_mode,
            control_law,
            reward_policy,
            shaped_reward,
            termination,
            kinematics,
        })
    }
}

/// Isolation handling implied by a communication mode.
pub fn isolation_rule(comm_mode: CommMode, ignore_comm_lost_agents: bool) -> IsolationRule {
    match (comm_mode, ignore_comm_lost_agents) {
        (CommMode::Range(_), false) => IsolationRule::Terminate,
        (CommMode::Range(_), true) => IsolationRule::Ignore,
        _ => IsolationRule::NotApplicable,
    }
}

/// Immutable configuration with every selector resolved.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    /// Source configuration, with defaults filled in
    pub raw: FlockConfig,

    /// Candidate agent counts
    pub pool: Vec<usize>,
    pub num_agents_min: usize,
    pub num_agents_max: usize,

    pub comm_mode: CommMode,
    pub control_law: ControlLaw,
    pub reward_policy: RewardPolicy,
    pub shaped_reward: Option<ShapedReward>,
    pub termination: TerminationEngine,
    pub kinematics: Kinematics,
}

impl ValidatedConfig {
    pub fn task(&self) -> Task {
        self.raw.env.task_type
    }

    pub fn boundary(&self) -> Boundary {
        self.kinematics.boundary
    }
}

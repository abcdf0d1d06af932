//! Task rewards and swarm dispersion measures.

use crate::state::{PaddingMask, SwarmState};
use nalgebra::Vector2;

/// Reward policy, selected once from the task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RewardPolicy {
    /// Vicsek: every active agent receives the swarm alignment
    Alignment,

    /// ACS: negative control effort plus a per-step cruise cost weighted by `rho`
    ControlCost { rho: f64 },
}

/// Dispersion of positions and velocities across active agents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entropy {
    pub spatial: f64,
    pub velocity: f64,
}

/// Polarization `‖mean velocity‖ / speed` over active agents, in `[0, 1]`.
pub fn alignment(state: &SwarmState, speed: f64) -> f64 {
    let n = state.num_active();
    if n == 0 {
        return 0.0;
    }

    let sum: Vector2<f64> = state.active_agents().map(|a| a.velocity).sum();
    (sum / n as f64).norm() / speed
}

/// Root of the summed per-axis population variance of `samples`.
fn dispersion(samples: &[Vector2<f64>]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let n = samples.len() as f64;
    let mean: Vector2<f64> = samples.iter().sum::<Vector2<f64>>() / n;
    let variance: Vector2<f64> = samples
        .iter()
        .map(|s| (s - mean).component_mul(&(s - mean)))
        .sum::<Vector2<f64>>()
        / n;

    (variance.x + variance.y).sqrt()
}

/// Spatial and velocity entropy of the active agents.
pub fn entropy(state: &SwarmState) -> Entropy {
    let positions: Vec<Vector2<f64>> = state.active_agents().map(|a| a.position).collect();
    let velocities: Vec<Vector2<f64>> = state.active_agents().map(|a| a.velocity).collect();

    Entropy {
        spatial: dispersion(&positions),
        velocity: dispersion(&velocities),
    }
}

/// Broadcasts a swarm-level value to active slots; padding gets zero.
pub fn broadcast(value: f64, padding: &PaddingMask) -> Vec<f64> {
    padding
        .as_slice()
        .iter()
        .map(|&live| if live { value } else { 0.0 })
        .collect()
}

/// Per-agent ACS reward `-(dt·speed·|u| + rho·dt)`.
pub fn control_cost_rewards(
    control_inputs: &[f64],
    padding: &PaddingMask,
    dt: f64,
    speed: f64,
    rho: f64,
) -> Vec<f64> {
    control_inputs
        .iter()
        .zip(padding.as_slice())
        .map(|(u, &live)| {
            if live {
                -(dt * speed * u.abs() + rho * dt)
            } else {
                0.0
            }
        })
        .collect()
}

/// Mean reward per active agent.
pub fn mean_reward(rewards: &[f64], num_agents: usize) -> f64 {
    if num_agents == 0 {
        return 0.0;
    }
    rewards.iter().sum::<f64>() / num_agents as f64
}

/// Shaped ACS training reward.
///
/// Quadratic penalties pull spatial and velocity entropy toward bands just
/// under their goals; the control term is the mean effort cost without the
/// cruise component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapedReward {
    pub spatial_goal: f64,
    pub velocity_goal: f64,
    pub w_pos: f64,
    pub w_vel: f64,
    pub w_ctrl: f64,
    pub rho: f64,
    pub dt: f64,
}

impl ShapedReward {
    const SPATIAL_MARGIN: f64 = 2.5;
    const VELOCITY_MARGIN: f64 = 0.05;
    const SPATIAL_SCALE: f64 = 3600.0;
    const VELOCITY_SCALE: f64 = 220.0;

    /// Combines the entropy penalties with the control cost.
    pub fn compute(&self, entropy: Entropy, agent_rewards: &[f64], num_agents: usize) -> f64 {
        let spatial_error = (entropy.spatial - (self.spatial_goal - Self::SPATIAL_MARGIN)).powi(2);
        let velocity_target = self.velocity_goal - Self::VELOCITY_MARGIN;
        let velocity_error = (entropy.velocity - velocity_target).powi(2);
        let pos_reward = -spatial_error / Self::SPATIAL_SCALE;
        let vel_reward = -velocity_error / Self::VELOCITY_SCALE;

        let control_cost = mean_reward(agent_rewards, num_agents) + self.rho * self.dt;

        self.w_pos * pos_reward + self.w_vel * vel_reward - self.w_ctrl * control_cost
    }
}

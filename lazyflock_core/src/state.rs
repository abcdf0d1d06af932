//! Swarm state for a fixed-capacity arena holding a variable number of agents.
//!
//! Every per-agent array has length `num_agents_max`. Slots `0..num_agents`
//! are live; the rest are padding and stay zeroed for the whole episode.

use nalgebra::{DMatrix, Vector2};
use serde::{Deserialize, Serialize};

/// Neighbor adjacency over agent slots; `adjacency[(i, j)]` means i hears j.
pub type Adjacency = DMatrix<bool>;

/// Kinematic state of a single agent slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    /// Position [x, y] in meters
    pub position: Vector2<f64>,

    /// Velocity [vx, vy] in m/s
    pub velocity: Vector2<f64>,

    /// Heading in radians (never wrapped)
    pub heading: f64,
}

impl AgentState {
    /// Creates an agent moving at `speed` along `heading`.
    pub fn new(position: Vector2<f64>, heading: f64, speed: f64) -> Self {
        Self {
            position,
            velocity: heading_vector(heading) * speed,
            heading,
        }
    }

    /// Creates an agent with an explicit velocity.
    pub fn with_velocity(position: Vector2<f64>, velocity: Vector2<f64>, heading: f64) -> Self {
        Self {
            position,
            velocity,
            heading,
        }
    }

    /// The all-zero record stored in padding slots.
    pub fn padding() -> Self {
        Self {
            position: Vector2::zeros(),
            velocity: Vector2::zeros(),
            heading: 0.0,
        }
    }
}

/// Unit vector pointing along `heading`.
pub fn heading_vector(heading: f64) -> Vector2<f64> {
    Vector2::new(heading.cos(), heading.sin())
}

/// Liveness flag per slot; always a contiguous prefix of `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaddingMask(Vec<bool>);

impl PaddingMask {
    /// Marks the first `num_active` of `capacity` slots as live.
    pub fn prefix(num_active: usize, capacity: usize) -> Self {
        Self((0..capacity).map(|i| i < num_active).collect())
    }

    /// Arena capacity (`num_agents_max`).
    pub fn capacity(&self) -> usize {
        self.0.len()
    }

    /// Number of live slots.
    pub fn num_active(&self) -> usize {
        self.0.iter().filter(|&&live| live).count()
    }

    pub fn is_active(&self, slot: usize) -> bool {
        self.0.get(slot).copied().unwrap_or(false)
    }

    /// Indices of live slots in ascending order.
    pub fn active_indices(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, &live)| live.then_some(i))
            .collect()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    /// True when both endpoints of a pair are live.
    pub fn pair_active(&self, i: usize, j: usize) -> bool {
        self.is_active(i) && self.is_active(j)
    }
}

/// Full simulation state: agent records, adjacency and padding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmState {
    /// One record per slot, length `num_agents_max`
    pub agents: Vec<AgentState>,

    /// Communication graph computed for this state
    pub neighbor_masks: Adjacency,

    /// Live slots
    pub padding_mask: PaddingMask,
}

impl SwarmState {
    /// Builds a state with an empty adjacency.
    ///
    /// Padding slots in `agents` are overwritten with [`AgentState::padding`].
    pub fn new(mut agents: Vec<AgentState>, padding_mask: PaddingMask) -> Self {
        let capacity = padding_mask.capacity();
        agents.resize(capacity, AgentState::padding());
        for (slot, agent) in agents.iter_mut().enumerate() {
            if !padding_mask.is_active(slot) {
                *agent = AgentState::padding();
            }
        }

        Self {
            agents,
            neighbor_masks: DMatrix::from_element(capacity, capacity, false),
            padding_mask,
        }
    }

    /// Arena capacity (`num_agents_max`).
    pub fn capacity(&self) -> usize {
        self.agents.len()
    }

    /// Number of live agents.
    pub fn num_active(&self) -> usize {
        self.padding_mask.num_active()
    }

    /// Live agent records in slot order.
    pub fn active_agents(&self) -> impl Iterator<Item = &AgentState> {
        self.agents
            .iter()
            .enumerate()
            .filter(|(slot, _)| self.padding_mask.is_active(*slot))
            .map(|(_, agent)| agent)
    }

    /// True if no edge touches a padding slot.
    pub fn adjacency_respects_padding(&self) -> bool {
        let n = self.capacity();
        (0..n).all(|i| {
            (0..n).all(|j| !self.neighbor_masks[(i, j)] || self.padding_mask.pair_active(i, j))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_mask_prefix() {
        let mask = PaddingMask::prefix(3, 5);

        assert_eq!(mask.capacity(), 5);
        assert_eq!(mask.num_active(), 3);
        assert_eq!(mask.active_indices(), vec![0, 1, 2]);
        assert!(mask.is_active(2));
        assert!(!mask.is_active(3));
        assert!(!mask.is_active(99));
    }

    #[test]
    fn test_swarm_state_zeroes_padding() {
        let agents = vec![
            AgentState::new(Vector2::new(1.0, 2.0), 0.5, 15.0),
            AgentState::new(Vector2::new(3.0, 4.0), 1.0, 15.0),
        ];
        let state = SwarmState::new(agents, PaddingMask::prefix(1, 4));

        assert_eq!(state.capacity(), 4);
        assert_eq!(state.num_active(), 1);
        assert_eq!(state.agents[1], AgentState::padding());
        assert_eq!(state.agents[3], AgentState::padding());
        assert_eq!(state.active_agents().count(), 1);
    }

    #[test]
    fn test_agent_velocity_from_heading() {
        let agent = AgentState::new(Vector2::zeros(), std::f64::consts::FRAC_PI_2, 10.0);

        assert!(agent.velocity.x.abs() < 1e-12);
        assert!((agent.velocity.y - 10.0).abs() < 1e-12);
    }
}

//! Deterministic kinematic update: unicycle agents at constant speed.

use crate::geometry::Boundary;
use crate::state::{heading_vector, AgentState, SwarmState};
use nalgebra::Vector2;

/// Physical constants shared by the control laws and the integrator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kinematics {
    /// Step length in seconds
    pub dt: f64,

    /// Cruise speed in m/s, identical for every agent
    pub speed: f64,

    /// Turn-rate saturation in rad/s
    pub max_turn_rate: f64,

    pub boundary: Boundary,
}

/// Advances the state by one step of length `dt`.
///
/// Positions move with the *current* velocity, then headings integrate the
/// control input and velocities are rebuilt from the new headings. The
/// adjacency is carried over unchanged; recomputing it is the topology
/// engine's job.
pub fn advance(state: &SwarmState, control_inputs: &[f64], kinematics: &Kinematics) -> SwarmState {
    let agents = state
        .agents
        .iter()
        .enumerate()
        .map(|(slot, agent)| {
            let position = kinematics
                .boundary
                .wrap_position(&(agent.position + agent.velocity * kinematics.dt));
            let input = control_inputs.get(slot).copied().unwrap_or(0.0);
            let heading = agent.heading + input * kinematics.dt;
            let velocity = if state.padding_mask.is_active(slot) {
                heading_vector(heading) * kinematics.speed
            } else {
                Vector2::zeros()
            };

            AgentState::with_velocity(position, velocity, heading)
        })
        .collect();

    SwarmState {
        agents,
        neighbor_masks: state.neighbor_masks.clone(),
        padding_mask: state.padding_mask.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PaddingMask;
    use approx::assert_relative_eq;

    fn kinematics(boundary: Boundary) -> Kinematics {
        Kinematics {
            dt: 0.1,
            speed: 10.0,
            max_turn_rate: 1.0,
            boundary,
        }
    }

    #[test]
    fn test_advance_straight_line() {
        let agents = vec![AgentState::new(Vector2::new(0.0, 0.0), 0.0, 10.0)];
        let state = SwarmState::new(agents, PaddingMask::prefix(1, 2));

        let next = advance(&state, &[0.0, 0.0], &kinematics(Boundary::Open { size: 250.0 }));

        assert_relative_eq!(next.agents[0].position.x, 1.0);
        assert_relative_eq!(next.agents[0].position.y, 0.0);
        assert_eq!(next.agents[1], AgentState::padding());
    }

    #[test]
    fn test_advance_turns_heading_without_wrapping() {
        let agents = vec![AgentState::new(Vector2::zeros(), 3.1, 10.0)];
        let state = SwarmState::new(agents, PaddingMask::prefix(1, 1));

        let next = advance(&state, &[1.0], &kinematics(Boundary::Open { size: 250.0 }));

        assert_relative_eq!(next.agents[0].heading, 3.2);
        assert_relative_eq!(next.agents[0].velocity.norm(), 10.0);
        assert_relative_eq!(next.agents[0].velocity.x, 10.0 * 3.2f64.cos());
    }

    #[test]
    fn test_advance_wraps_periodic() {
        let agents = vec![AgentState::new(Vector2::new(49.5, 0.0), 0.0, 10.0)];
        let state = SwarmState::new(agents, PaddingMask::prefix(1, 1));

        let next = advance(&state, &[0.0], &kinematics(Boundary::Periodic { size: 100.0 }));

        assert_relative_eq!(next.agents[0].position.x, -49.5);
    }
}

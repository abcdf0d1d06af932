//! Flocking control laws producing one turn-rate command per agent slot.
//!
//! Both laws read the relative state of the *current* step together with
//! the adjacency computed for it, work on the active block only, and leave
//! padding slots at zero.

use crate::geometry::RelativeState;
use crate::integrator::Kinematics;
use crate::state::SwarmState;
use serde::{Deserialize, Serialize};

/// Gains of the alignment-cohesion-separation law.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcsGains {
    /// Communication decay exponent of psi(r) = (1 + r²)^-beta
    pub beta: f64,

    /// Alignment gain
    pub lam: f64,

    /// Cohesion/separation gain
    pub sig: f64,

    /// Relative-velocity coupling
    pub k1: f64,

    /// Spacing coupling
    pub k2: f64,

    /// Desired inter-agent distance in meters
    pub r0: f64,
}

/// Control law, selected once at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlLaw {
    /// Average relative heading of neighbors
    Vicsek,

    /// Alignment plus cohesion/separation
    Acs(AcsGains),
}

impl ControlLaw {
    /// Computes saturated turn rates for every slot.
    pub fn compute(
        &self,
        state: &SwarmState,
        rel: &RelativeState,
        kinematics: &Kinematics,
    ) -> Vec<f64> {
        let mut inputs = vec![0.0; state.capacity()];
        let active = state.padding_mask.active_indices();
        let u_max = kinematics.max_turn_rate;

        for &i in &active {
            let raw = match self {
                ControlLaw::Vicsek => vicsek_input(i, &active, state, rel, kinematics.dt),
                ControlLaw::Acs(gains) => {
                    acs_input(i, &active, state, rel, gains, kinematics.speed)
                }
            };
            inputs[i] = raw.clamp(-u_max, u_max);
        }

        inputs
    }
}

/// Neighbor count of slot `i`, with an epsilon on the diagonal so isolated
/// agents never divide by zero.
fn neighbor_count(i: usize, active: &[usize], state: &SwarmState) -> f64 {
    let linked = active
        .iter()
        .filter(|&&j| state.neighbor_masks[(i, j)])
        .count();
    linked as f64 + f64::EPSILON
}

fn vicsek_input(
    i: usize,
    active: &[usize],
    state: &SwarmState,
    rel: &RelativeState,
    dt: f64,
) -> f64 {
    let n = neighbor_count(i, active, state);
    let heading_sum: f64 = active
        .iter()
        .filter(|&&j| state.neighbor_masks[(i, j)])
        .map(|&j| rel.headings[(i, j)])
        .sum();

    heading_sum / n / dt
}

fn acs_input(
    i: usize,
    active: &[usize],
    state: &SwarmState,
    rel: &RelativeState,
    gains: &AcsGains,
    speed: f64,
) -> f64 {
    let n = neighbor_count(i, active, state);
    let theta_i = state.agents[i].heading;
    // Left normal of agent i's heading
    let (lateral_x, lateral_y) = (-theta_i.sin(), theta_i.cos());

    let mut alignment = 0.0;
    let mut cohesion = 0.0;
    for &j in active {
        if !state.neighbor_masks[(i, j)] {
            continue;
        }

        // Self pairs and coincident agents have zero offset; keep the terms finite
        let r = rel.distances[(i, j)].max(f64::EPSILON);
        let p = rel.positions[(i, j)];
        let v = rel.velocities[(i, j)];

        let psi = (1.0 + r * r).powf(-gains.beta);
        alignment += psi * rel.headings[(i, j)].sin();

        let velocity_term = gains.k1 / (2.0 * r * r) * v.dot(&p);
        let spacing_term = gains.k2 / (2.0 * r) * (r - gains.r0);
        let lateral = lateral_x * p.x + lateral_y * p.y;
        cohesion += (velocity_term + spacing_term) * lateral;
    }

    gains.lam / n * alignment + gains.sig / (n * speed) * cohesion
}

/// Gates each agent's own control authority by its laziness `a ∈ [0, 1]`.
pub fn apply_laziness(control_inputs: &mut [f64], laziness: &[f64]) {
    for (u, a) in control_inputs.iter_mut().zip(laziness) {
        *u *= 1.0 - a;
    }
}

//! Per-pair observation tensor handed to the policy.
//!
//! Feature layout of entry `(i, j)`:
//! - open boundary: `[dx/(L/2), dy/(L/2), cos Δθ, sin Δθ]`
//! - periodic boundary: `[cos φx, sin φx, cos φy, sin φy, cos Δθ, sin Δθ]`
//!   with `φ = 2π·d/L`, which is continuous across the wrap seam.

use crate::geometry::{Boundary, RelativeState};
use crate::state::{Adjacency, PaddingMask, SwarmState};
use std::f64::consts::PI;

/// Observation of the whole arena at one step.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Row-major `(num_agents_max, num_agents_max, obs_dim)` feature tensor
    pub local_agent_infos: Vec<f64>,

    pub neighbor_masks: Adjacency,

    pub padding_mask: PaddingMask,

    /// Source tag used when merging observations from several environments
    pub is_from_my_env: bool,

    num_agents_max: usize,
    obs_dim: usize,
}

impl Observation {
    /// Tensor shape `(num_agents_max, num_agents_max, obs_dim)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.num_agents_max, self.num_agents_max, self.obs_dim)
    }

    pub fn obs_dim(&self) -> usize {
        self.obs_dim
    }

    /// Feature vector of pair `(i, j)`.
    pub fn features(&self, i: usize, j: usize) -> &[f64] {
        let start = (i * self.num_agents_max + j) * self.obs_dim;
        &self.local_agent_infos[start..start + self.obs_dim]
    }
}

/// Feature width for the given boundary.
pub fn obs_dim(boundary: Boundary) -> usize {
    if boundary.is_periodic() {
        6
    } else {
        4
    }
}

/// Builds the observation of `state`; padding pairs stay zero.
pub fn build_observation(
    state: &SwarmState,
    rel: &RelativeState,
    boundary: Boundary,
) -> Observation {
    let n = state.capacity();
    let dim = obs_dim(boundary);
    let size = boundary.size();
    let mut infos = vec![0.0; n * n * dim];
    let active = state.padding_mask.active_indices();

    for &i in &active {
        for &j in &active {
            let offset = rel.positions[(i, j)];
            let dtheta = rel.headings[(i, j)];
            let start = (i * n + j) * dim;
            let cell = &mut infos[start..start + dim];

            match boundary {
                Boundary::Periodic { .. } => {
                    let phase_x = 2.0 * PI * offset.x / size;
                    let phase_y = 2.0 * PI * offset.y / size;
                    cell[..4].copy_from_slice(&[
                        phase_x.cos(),
                        phase_x.sin(),
                        phase_y.cos(),
                        phase_y.sin(),
                    ]);
                }
                Boundary::Open { .. } => {
                    let half = size / 2.0;
                    cell[..2].copy_from_slice(&[offset.x / half, offset.y / half]);
                }
            }
            cell[dim - 2] = dtheta.cos();
            cell[dim - 1] = dtheta.sin();
        }
    }

    Observation {
        local_agent_infos: infos,
        neighbor_masks: state.neighbor_masks.clone(),
        padding_mask: state.padding_mask.clone(),
        is_from_my_env: true,
        num_agents_max: n,
        obs_dim: dim,
    }
}

//! Relative geometry between agent pairs, optionally on a periodic domain.
//!
//! On the torus every displacement is reduced with the minimum-image
//! convention so that two agents on opposite edges see the short path
//! across the seam.

use crate::state::SwarmState;
use nalgebra::{DMatrix, Vector2};
use serde::{Deserialize, Serialize};

/// Spatial domain of the simulation.
///
/// `size` is the side length `L` of the square domain. Open domains only use
/// it for observation normalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Boundary {
    /// Unbounded plane
    Open { size: f64 },

    /// Torus of side `size`, coordinates kept in `[-L/2, L/2)`
    Periodic { size: f64 },
}

impl Boundary {
    pub fn size(&self) -> f64 {
        match self {
            Boundary::Open { size } | Boundary::Periodic { size } => *size,
        }
    }

    pub fn is_periodic(&self) -> bool {
        matches!(self, Boundary::Periodic { .. })
    }

    /// Displacement from `from` to `to`, minimum-image on a torus.
    pub fn displacement(&self, from: &Vector2<f64>, to: &Vector2<f64>) -> Vector2<f64> {
        let raw = to - from;
        match self {
            Boundary::Open { .. } => raw,
            Boundary::Periodic { size } => {
                Vector2::new(minimum_image(raw.x, *size), minimum_image(raw.y, *size))
            }
        }
    }

    /// Maps a position back into the domain (identity on open domains).
    pub fn wrap_position(&self, position: &Vector2<f64>) -> Vector2<f64> {
        match self {
            Boundary::Open { .. } => *position,
            Boundary::Periodic { size } => Vector2::new(
                wrap_to_domain(position.x, *size),
                wrap_to_domain(position.y, *size),
            ),
        }
    }
}

/// Wraps a coordinate into `[-size/2, size/2)`.
///
/// Values already inside the interval are returned bit-for-bit, which makes
/// the wrap idempotent.
pub fn wrap_to_domain(x: f64, size: f64) -> f64 {
    let half = size / 2.0;
    if (-half..half).contains(&x) {
        return x;
    }

    let wrapped = (x + half).rem_euclid(size) - half;
    // rem_euclid may round up to `size` for tiny negative inputs
    if wrapped >= half {
        wrapped - size
    } else if wrapped < -half {
        wrapped + size
    } else {
        wrapped
    }
}

/// Reduces a displacement component to its representative in `(-size/2, size/2]`.
pub fn minimum_image(d: f64, size: f64) -> f64 {
    let half = size / 2.0;
    if d > -half && d <= half {
        return d;
    }

    let reduced = half - (half - d).rem_euclid(size);
    if reduced <= -half {
        reduced + size
    } else if reduced > half {
        reduced - size
    } else {
        reduced
    }
}

/// Pairwise relative quantities; entry `(i, j)` is "j as seen from i".
///
/// Every entry touching a padding slot is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct RelativeState {
    pub positions: DMatrix<Vector2<f64>>,
    pub velocities: DMatrix<Vector2<f64>>,
    pub headings: DMatrix<f64>,
    pub distances: DMatrix<f64>,
}

impl RelativeState {
    /// All-zero relative state for an arena of `capacity` slots.
    pub fn zeros(capacity: usize) -> Self {
        Self {
            positions: DMatrix::from_element(capacity, capacity, Vector2::zeros()),
            velocities: DMatrix::from_element(capacity, capacity, Vector2::zeros()),
            headings: DMatrix::zeros(capacity, capacity),
            distances: DMatrix::zeros(capacity, capacity),
        }
    }

    /// True if entry `(i, j)` is exactly zero in every field.
    pub fn is_zero_at(&self, i: usize, j: usize) -> bool {
        self.positions[(i, j)] == Vector2::zeros()
            && self.velocities[(i, j)] == Vector2::zeros()
            && self.headings[(i, j)] == 0.0
            && self.distances[(i, j)] == 0.0
    }
}

/// Computes the relative state of every active pair.
///
/// Headings are differenced without wrapping.
pub fn relative_state(state: &SwarmState, boundary: Boundary) -> RelativeState {
    let mut rel = RelativeState::zeros(state.capacity());
    let active = state.padding_mask.active_indices();

    for &i in &active {
        let a = &state.agents[i];
        for &j in &active {
            let b = &state.agents[j];
            let offset = boundary.displacement(&a.position, &b.position);

            rel.positions[(i, j)] = offset;
            rel.distances[(i, j)] = offset.norm();
            rel.velocities[(i, j)] = b.velocity - a.velocity;
            rel.headings[(i, j)] = b.heading - a.heading;
        }
    }

    rel
}

//! LazyFlock Core - flocking swarm simulation engine
//!
//! A fixed-capacity arena of point agents moves under local flocking
//! control laws over a partial communication graph. Each agent carries a
//! "laziness" gate that scales down its own control authority.
//!
//! # Step pipeline
//!
//! ```text
//!  SwarmState ──► geometry::relative_state ──► ControlLaw::compute
//!                                                   │ (prior-step adjacency)
//!                                                   ▼
//!                                      control::apply_laziness(action)
//!                                                   │
//!                                                   ▼
//!                                          integrator::advance
//!                                                   │
//!                                                   ▼
//!                                        TopologyEngine::update
//!                                                   │
//!                          ┌────────────────────────┼─────────────────────┐
//!                          ▼                        ▼                     ▼
//!                   observation             reward / entropy        termination
//! ```
//!
//! Every function in the pipeline is pure apart from the topology engine's
//! fixed-graph cache; the episode driver owns the single mutable state.

pub mod config;
pub mod control;
pub mod error;
pub mod geometry;
pub mod integrator;
pub mod observation;
pub mod reward;
pub mod state;
pub mod termination;
pub mod topology;

// Re-export key types for convenience
pub use config::{
    AgentPool, BoundaryMode, ControlConfig, EnvConfig, FlockConfig, Task, ValidatedConfig,
};
pub use control::{AcsGains, ControlLaw};
pub use error::{FlockError, Result};
pub use geometry::{Boundary, RelativeState};
pub use integrator::Kinematics;
pub use observation::Observation;
pub use reward::{Entropy, RewardPolicy, ShapedReward};
pub use state::{Adjacency, AgentState, PaddingMask, SwarmState};
pub use termination::{
    EpisodeHistory, EpisodeStatus, IsolationRule, TerminationEngine, TerminationPolicy,
};
pub use topology::{CommMode, FixedTopology, TopologyEngine, TopologyUpdate};

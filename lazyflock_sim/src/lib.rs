//! LazyFlock episode driver and deterministic scenario harness
//!
//! Wraps the pure engine in `lazyflock_core` into a stateful environment:
//! one seeded random stream per instance, a reset/step episode API, and an
//! optional recorder. The scenario runner drives environments through
//! fixed set-ups and audits the state invariants on every step.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    FlockingEnv                       │
//! │  ┌────────────┐   ┌──────────────────────────────┐   │
//! │  │ SimContext │──►│ reset: agent count, agents,  │   │
//! │  │ (ChaCha8)  │   │        fixed topology draw   │   │
//! │  └────────────┘   └──────────────────────────────┘   │
//! │        step(laziness) ──► lazyflock_core pipeline    │
//! │                              │                       │
//! │                     EpisodeRecorder (optional)       │
//! └──────────────────────────────────────────────────────┘
//!            ▲
//!            │ one env per seed
//!     ScenarioRunner ──► ScenarioResult
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use lazyflock_core::FlockConfig;
//! use lazyflock_sim::FlockingEnv;
//!
//! let mut env = FlockingEnv::new(FlockConfig::default(), 42)?;
//! env.reset()?;
//! let outcome = env.step(&vec![0.0; env.num_agents_max()])?;
//! ```

mod context;
mod env;
mod recorder;
mod runner;
pub mod scenarios;

pub use context::SimContext;
pub use env::{FlockingEnv, StepInfo, StepOutcome};
pub use recorder::{EpisodeRecorder, EpisodeRecording, StepFrame};
pub use runner::{audit_env, ScenarioMetrics, ScenarioResult, ScenarioRunner};

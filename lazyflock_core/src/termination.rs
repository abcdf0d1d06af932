//! Episode termination: task goals held stable over a trailing window,
//! the step cutoff, and communication loss.
//!
//! The episode is a two-state machine, RUNNING → DONE. DONE is terminal;
//! only a reset starts a new episode.

use serde::{Deserialize, Serialize};

/// Episode status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpisodeStatus {
    Running,
    Done,
}

/// Rolling per-step metric buffers, one slot per step of the episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeHistory {
    alignment: Vec<f64>,
    spatial_entropy: Vec<f64>,
    velocity_entropy: Vec<f64>,
}

impl EpisodeHistory {
    /// Zeroed buffers for an episode of at most `max_time_steps` steps.
    pub fn new(max_time_steps: usize) -> Self {
        Self {
            alignment: vec![0.0; max_time_steps],
            spatial_entropy: vec![0.0; max_time_steps],
            velocity_entropy: vec![0.0; max_time_steps],
        }
    }

    pub fn capacity(&self) -> usize {
        self.alignment.len()
    }

    pub fn record_alignment(&mut self, time_step: usize, value: f64) {
        if let Some(slot) = self.alignment.get_mut(time_step) {
            *slot = value;
        }
    }

    pub fn record_entropy(&mut self, time_step: usize, spatial: f64, velocity: f64) {
        if let Some(slot) = self.spatial_entropy.get_mut(time_step) {
            *slot = spatial;
        }
        if let Some(slot) = self.velocity_entropy.get_mut(time_step) {
            *slot = velocity;
        }
    }

    pub fn alignment(&self) -> &[f64] {
        &self.alignment
    }

    pub fn spatial_entropy(&self) -> &[f64] {
        &self.spatial_entropy
    }

    pub fn velocity_entropy(&self) -> &[f64] {
        &self.velocity_entropy
    }
}

/// Trailing window of `length` values ending at `time_step`, once enough
/// steps exist.
fn trailing_window(values: &[f64], time_step: usize, length: usize) -> Option<&[f64]> {
    if length == 0 || time_step + 1 < length || time_step >= values.len() {
        return None;
    }
    Some(&values[time_step + 1 - length..=time_step])
}

fn window_max(window: &[f64]) -> f64 {
    window.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn window_spread(window: &[f64]) -> f64 {
    let min = window.iter().copied().fold(f64::INFINITY, f64::min);
    window_max(window) - min
}

/// Task-specific stability test, selected once from the task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TerminationPolicy {
    /// Vicsek: alignment above `goal`, window spread below `rate_goal`
    Alignment {
        goal: f64,
        rate_goal: f64,
        window: usize,
    },

    /// ACS: both entropies below their goals and stable over the window
    Entropy {
        p_goal: f64,
        v_goal: f64,
        p_rate_goal: f64,
        v_rate_goal: f64,
        window: usize,
    },
}

impl TerminationPolicy {
    /// True when the task goal is reached at `time_step`.
    pub fn goal_reached(
        &self,
        history: &EpisodeHistory,
        time_step: usize,
        fixed_length: bool,
    ) -> bool {
        match *self {
            TerminationPolicy::Alignment {
                goal,
                rate_goal,
                window,
            } => {
                let current = history.alignment.get(time_step).copied().unwrap_or(0.0);
                if current <= goal || fixed_length {
                    return false;
                }
                trailing_window(&history.alignment, time_step, window)
                    .map(|w| window_spread(w) < rate_goal)
                    .unwrap_or(false)
            }
            TerminationPolicy::Entropy {
                p_goal,
                v_goal,
                p_rate_goal,
                v_rate_goal,
                window,
            } => {
                let at = |series: &[f64]| series.get(time_step).copied().unwrap_or(f64::INFINITY);
                let spatial = at(&history.spatial_entropy);
                let velocity = at(&history.velocity_entropy);
                if !(spatial < p_goal && velocity < v_goal) || fixed_length {
                    return false;
                }
                let spatial_window = trailing_window(&history.spatial_entropy, time_step, window);
                let velocity_window = trailing_window(&history.velocity_entropy, time_step, window);
                match (spatial_window, velocity_window) {
                    // Velocity uses the window maximum, not its spread
                    (Some(sw), Some(vw)) => {
                        window_spread(sw) < p_rate_goal && window_max(vw) < v_rate_goal
                    }
                    _ => false,
                }
            }
        }
    }
}

/// How isolated agents affect termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationRule {
    /// Topology cannot isolate agents (unbounded or fixed graphs)
    NotApplicable,

    /// Any isolated agent ends the episode
    Terminate,

    /// Isolation is recorded but the episode continues
    Ignore,
}

/// Result of a termination check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationCheck {
    pub done: bool,

    /// Task goal satisfied (stability window included)
    pub goal_reached: bool,

    /// At least one active agent was isolated this step
    pub isolation_observed: bool,
}

/// Full termination test evaluated after every step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminationEngine {
    pub policy: TerminationPolicy,
    pub fixed_length: bool,
    pub max_time_steps: usize,
    pub isolation: IsolationRule,
}

impl TerminationEngine {
    pub fn check(
        &self,
        history: &EpisodeHistory,
        time_step: usize,
        isolated: &[bool],
    ) -> TerminationCheck {
        let goal_reached = self.policy.goal_reached(history, time_step, self.fixed_length);
        let mut done = goal_reached || time_step + 1 >= self.max_time_steps;

        let isolation_observed = match self.isolation {
            IsolationRule::NotApplicable => false,
            IsolationRule::Terminate | IsolationRule::Ignore => isolated.iter().any(|&lost| lost),
        };
        if isolation_observed && self.isolation == IsolationRule::Terminate {
            done = true;
        }

        TerminationCheck {
            done,
            goal_reached,
            isolation_observed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alignment_engine(window: usize, fixed_length: bool) -> TerminationEngine {
        TerminationEngine {
            policy: TerminationPolicy::Alignment {
                goal: 0.97,
                rate_goal: 0.03,
                window,
            },
            fixed_length,
            max_time_steps: 100,
            isolation: IsolationRule::NotApplicable,
        }
    }

    fn entropy_engine(window: usize) -> TerminationEngine {
        TerminationEngine {
            policy: TerminationPolicy::Entropy {
                p_goal: 42.0,
                v_goal: 0.1,
                p_rate_goal: 0.1,
                v_rate_goal: 0.2,
                window,
            },
            fixed_length: false,
            max_time_steps: 100,
            isolation: IsolationRule::NotApplicable,
        }
    }

    #[test]
    fn test_trailing_window() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(trailing_window(&values, 1, 3), None);
        assert_eq!(trailing_window(&values, 2, 3), Some(&values[0..3]));
        assert_eq!(trailing_window(&values, 3, 2), Some(&values[2..4]));
    }

    #[test]
    fn test_alignment_waits_for_window() {
        let engine = alignment_engine(4, false);
        let mut history = EpisodeHistory::new(100);
        for t in 0..4 {
            history.record_alignment(t, 0.99);
        }

        assert!(!engine.check(&history, 2, &[]).done);
        assert!(engine.check(&history, 3, &[]).done);
    }

    #[test]
    fn test_alignment_unstable_window() {
        let engine = alignment_engine(3, false);
        let mut history = EpisodeHistory::new(100);
        history.record_alignment(0, 0.5);
        history.record_alignment(1, 0.98);
        history.record_alignment(2, 0.99);

        assert!(!engine.check(&history, 2, &[]).done);
    }

    #[test]
    fn test_fixed_length_ignores_goal() {
        let engine = alignment_engine(1, true);
        let mut history = EpisodeHistory::new(100);
        history.record_alignment(5, 1.0);

        assert!(!engine.check(&history, 5, &[]).done);
        assert!(engine.check(&history, 99, &[]).done);
    }

    #[test]
    fn test_entropy_velocity_uses_window_max() {
        let engine = entropy_engine(2);
        let mut history = EpisodeHistory::new(100);
        history.record_entropy(0, 30.0, 0.05);
        history.record_entropy(1, 30.05, 0.08);
        assert!(engine.check(&history, 1, &[]).done);

        // Flat but high velocity window never passes the max check
        let engine = TerminationEngine {
            policy: TerminationPolicy::Entropy {
                p_goal: 42.0,
                v_goal: 1.0,
                p_rate_goal: 0.1,
                v_rate_goal: 0.2,
                window: 2,
            },
            ..entropy_engine(2)
        };
        let mut history = EpisodeHistory::new(100);
        history.record_entropy(0, 30.0, 0.5);
        history.record_entropy(1, 30.0, 0.5);
        assert!(!engine.check(&history, 1, &[]).done);
    }

    #[test]
    fn test_isolation_rules() {
        let history = EpisodeHistory::new(100);
        let isolated = [false, true, false];

        let terminate = TerminationEngine {
            isolation: IsolationRule::Terminate,
            ..alignment_engine(4, false)
        };
        let check = terminate.check(&history, 0, &isolated);
        assert!(check.done);
        assert!(check.isolation_observed);

        let ignore = TerminationEngine {
            isolation: IsolationRule::Ignore,
            ..alignment_engine(4, false)
        };
        let check = ignore.check(&history, 0, &isolated);
        assert!(!check.done);
        assert!(check.isolation_observed);
    }
}

//! Episode recorder with JSON export for offline trajectory plots.

use lazyflock_core::{Adjacency, AgentState, FlockError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

/// Snapshot of a single step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepFrame {
    pub time_step: usize,

    /// Post-step agent records (state history)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agents: Option<Vec<AgentState>>,

    /// Post-step adjacency (state history)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighbor_masks: Option<Adjacency>,

    /// Clipped laziness vector applied this step (action history)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Vec<f64>>,
}

/// Complete episode recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecording {
    pub task: String,
    pub seed: u64,
    pub num_agents: usize,
    pub num_agents_max: usize,

    /// State right after reset
    pub initial_agents: Vec<AgentState>,
    pub initial_neighbor_masks: Adjacency,

    pub frames: Vec<StepFrame>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub done_step: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lost_comm_step: Option<usize>,
}

/// Collects frames while an episode runs.
#[derive(Debug, Clone)]
pub struct EpisodeRecorder {
    capture_state: bool,
    capture_action: bool,
    recording: EpisodeRecording,
}

impl EpisodeRecorder {
    /// Starts a recording from the post-reset state.
    pub fn new(
        task: &str,
        seed: u64,
        capture_state: bool,
        capture_action: bool,
        initial_agents: &[AgentState],
        initial_neighbor_masks: &Adjacency,
        num_agents: usize,
    ) -> Self {
        Self {
            capture_state,
            capture_action,
            recording: EpisodeRecording {
                task: task.to_string(),
                seed,
                num_agents,
                num_agents_max: initial_agents.len(),
                initial_agents: initial_agents.to_vec(),
                initial_neighbor_masks: initial_neighbor_masks.clone(),
                frames: Vec::new(),
                done_step: None,
                lost_comm_step: None,
            },
        }
    }

    /// Adds a frame, keeping only the enabled parts.
    pub fn record(
        &mut self,
        time_step: usize,
        agents: &[AgentState],
        neighbor_masks: &Adjacency,
        action: &[f64],
    ) {
        self.recording.frames.push(StepFrame {
            time_step,
            agents: self.capture_state.then(|| agents.to_vec()),
            neighbor_masks: self.capture_state.then(|| neighbor_masks.clone()),
            action: self.capture_action.then(|| action.to_vec()),
        });
    }

    /// Marks the end of the episode.
    pub fn finalize(&mut self, done_step: usize, lost_comm_step: Option<usize>) {
        self.recording.done_step = Some(done_step);
        self.recording.lost_comm_step = lost_comm_step;
    }

    pub fn recording(&self) -> &EpisodeRecording {
        &self.recording
    }
}

impl EpisodeRecording {
    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).map_err(|e| FlockError::Export(e.to_string()))?;
        let mut file =
            File::create(path).map_err(|e| FlockError::Export(format!("{}: {}", path, e)))?;
        file.write_all(json.as_bytes())
            .map_err(|e| FlockError::Export(format!("{}: {}", path, e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{DMatrix, Vector2};

    fn sample_agents() -> Vec<AgentState> {
        vec![
            AgentState::new(Vector2::new(1.0, 2.0), 0.5, 15.0),
            AgentState::padding(),
        ]
    }

    #[test]
    fn test_recorder_respects_capture_flags() {
        let agents = sample_agents();
        let adjacency = DMatrix::from_element(2, 2, false);
        let mut recorder = EpisodeRecorder::new("vicsek", 42, false, true, &agents, &adjacency, 1);

        recorder.record(0, &agents, &adjacency, &[0.25, 0.0]);
        recorder.finalize(0, None);

        let frame = &recorder.recording().frames[0];
        assert!(frame.agents.is_none());
        assert!(frame.neighbor_masks.is_none());
        assert_eq!(frame.action.as_deref(), Some(&[0.25, 0.0][..]));
        assert_eq!(recorder.recording().done_step, Some(0));
    }

    #[test]
    fn test_recording_json_roundtrip() {
        let agents = sample_agents();
        let adjacency = DMatrix::from_fn(2, 2, |i, j| i == 0 && j == 0);
        let mut recorder = EpisodeRecorder::new("acs", 7, true, false, &agents, &adjacency, 1);
        recorder.record(0, &agents, &adjacency, &[0.0, 0.0]);

        let json = serde_json::to_string(recorder.recording()).unwrap();
        let parsed: EpisodeRecording = serde_json::from_str(&json).unwrap();

        assert_eq!(&parsed, recorder.recording());
        assert!(!json.contains("\"action\""));
    }
}

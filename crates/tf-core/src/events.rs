//! Job lifecycle states and the events a running job streams to its caller.
//!
//! Progress is best-effort: events travel over a bounded channel and are
//! dropped when the consumer falls behind. The terminal outcome never
//! travels as an event; it is the value the job handle's `wait` resolves to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::ids::JobId;

// ---------------------------------------------------------------------------
// JobState
// ---------------------------------------------------------------------------

/// Lifecycle of a supervised job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Created,
    Running,
    Finished,
    Failed,
    Killed,
}

impl JobState {
    /// Terminal states accept no further transition.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Killed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Finished => write!(f, "finished"),
            Self::Failed => write!(f, "failed"),
            Self::Killed => write!(f, "killed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// One raw progress tick as reported by the transcoding engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub frames: u64,
    pub current_fps: f64,
    /// Output position in microseconds.
    #[serde(default)]
    pub out_time_us: Option<i64>,
    #[serde(default)]
    pub total_size: Option<u64>,
    /// Raw bitrate string, e.g. `1520.3kbits/s`.
    #[serde(default)]
    pub bitrate: Option<String>,
    /// Encode speed relative to realtime.
    #[serde(default)]
    pub speed: Option<f64>,
}

/// A progress tick with the job-level estimate attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    #[serde(flatten)]
    pub snapshot: ProgressSnapshot,
    /// Largest frame count across every track feeding an output.
    pub total_frames: u64,
    /// Seconds remaining at the current rate.
    pub eta_secs: f64,
}

impl ProgressUpdate {
    /// Attach an ETA of `(total - done) / max(fps, 1)`.
    pub fn estimate(snapshot: ProgressSnapshot, total_frames: u64) -> Self {
        let remaining = total_frames.saturating_sub(snapshot.frames) as f64;
        let fps = if snapshot.current_fps >= 1.0 {
            snapshot.current_fps
        } else {
            1.0
        };
        Self {
            eta_secs: remaining / fps,
            total_frames,
            snapshot,
        }
    }

    /// Completion in percent, when the frame total is known.
    pub fn percent(&self) -> Option<f64> {
        (self.total_frames > 0)
            .then(|| (self.snapshot.frames as f64 / self.total_frames as f64 * 100.0).min(100.0))
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// What happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    JobStarted {
        job_id: JobId,
        name: String,
        file: PathBuf,
        /// Caller data, passed through untouched.
        transit: serde_json::Value,
    },
    JobProgress {
        job_id: JobId,
        progress: ProgressUpdate,
    },
}

/// A timestamped job event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl JobEvent {
    /// Create a new event with a fresh UUID and the current timestamp.
    pub fn new(payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            payload,
        }
    }
}

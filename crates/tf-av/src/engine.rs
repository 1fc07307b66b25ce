//! The transcoding engine seam.

use std::path::Path;

use async_trait::async_trait;
use tf_core::events::ProgressSnapshot;
use tf_core::{MediaDescriptor, Result};
use tf_plan::JobPlan;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Captured output of a failed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineFailure {
    /// Launch or exit description from the adapter.
    pub error: Option<String>,
    pub stdout: String,
    pub stderr: String,
}

impl EngineFailure {
    /// The most useful text: stderr, then the adapter's error, then stdout.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        if let Some(error) = self.error.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            return error.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        "engine failed without output".to_string()
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineExit {
    Success,
    /// The run stopped because its cancellation token fired.
    Cancelled,
    Failure(EngineFailure),
}

/// Runs job plans and probes media.
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// Tool name used in process errors.
    fn name(&self) -> &str {
        "engine"
    }

    /// Probe `path` into a [`MediaDescriptor`].
    async fn probe(&self, path: &Path) -> Result<MediaDescriptor>;

    /// Run `plan` to completion, sending a snapshot per progress block.
    ///
    /// Implementations must not block on `progress`; snapshots that do not
    /// fit are dropped. When `cancel` fires the process is killed and the
    /// run returns [`EngineExit::Cancelled`].
    async fn run(
        &self,
        plan: &JobPlan,
        progress: mpsc::Sender<ProgressSnapshot>,
        cancel: CancellationToken,
    ) -> EngineExit;
}

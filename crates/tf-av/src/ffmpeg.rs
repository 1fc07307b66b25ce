//! [`TranscodeEngine`] backed by the ffmpeg and ffprobe CLIs.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tf_core::events::ProgressSnapshot;
use tf_core::{Error, MediaDescriptor, Result};
use tf_plan::JobPlan;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::command::{LineTail, ToolCommand, STDERR_TAIL_LINES};
use crate::engine::{EngineExit, EngineFailure, TranscodeEngine};
use crate::probe::FfprobeProber;
use crate::progress::ProgressParser;
use crate::tools::ToolRegistry;

/// Flags placed ahead of every plan's arguments.
const REPORTING_ARGS: &[&str] = &["-hide_banner", "-nostats", "-progress", "pipe:2"];

/// Splits ffmpeg's stderr into progress snapshots and a bounded log of
/// everything else.
#[derive(Debug)]
struct StderrRouter {
    parser: ProgressParser,
    log: LineTail,
}

impl StderrRouter {
    fn new() -> Self {
        Self {
            parser: ProgressParser::new(),
            log: LineTail::new(STDERR_TAIL_LINES),
        }
    }

    fn route(&mut self, line: &str) -> Option<ProgressSnapshot> {
        let snapshot = self.parser.feed(line);
        if snapshot.is_none() && !ProgressParser::is_progress_line(line) {
            self.log.push(line.to_string());
        }
        snapshot
    }

    fn diagnostic(&self) -> String {
        self.log.join()
    }
}

/// Runs plans with ffmpeg, reporting progress over stderr.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    ffmpeg_path: PathBuf,
    prober: FfprobeProber,
}

impl FfmpegEngine {
    pub fn new(ffmpeg_path: PathBuf, prober: FfprobeProber) -> Self {
        Self { ffmpeg_path, prober }
    }

    /// Build from discovered tools. Both ffmpeg and ffprobe are required.
    pub fn from_registry(tools: &ToolRegistry) -> Result<Self> {
        let ffmpeg = tools.require("ffmpeg")?;
        let ffprobe = tools.require("ffprobe")?;
        Ok(Self::new(
            ffmpeg.path.clone(),
            FfprobeProber::new(ffprobe.path.clone()).with_timeout(ffprobe.timeout),
        ))
    }

    /// The full ffmpeg command line for `plan`, without the program name.
    pub fn command_args(plan: &JobPlan) -> Vec<String> {
        REPORTING_ARGS
            .iter()
            .map(|s| s.to_string())
            .chain(plan.to_args())
            .collect()
    }
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn probe(&self, path: &Path) -> Result<MediaDescriptor> {
        self.prober.probe(path).await
    }

    async fn run(
        &self,
        plan: &JobPlan,
        progress: mpsc::Sender<ProgressSnapshot>,
        cancel: CancellationToken,
    ) -> EngineExit {
        let mut cmd = ToolCommand::new(self.ffmpeg_path.clone());
        cmd.no_timeout().args(Self::command_args(plan));

        tracing::info!(
            input = %plan.input.display(),
            outputs = plan.branch_count(),
            "Starting ffmpeg"
        );
        tracing::debug!(args = ?cmd.get_args(), "ffmpeg command line");

        let mut router = StderrRouter::new();
        let result = cmd
            .execute_with_stderr_callback(
                |line| {
                    if let Some(snapshot) = router.route(line) {
                        // A full channel means the consumer is behind.
                        let _ = progress.try_send(snapshot);
                    }
                },
                Some(cancel),
            )
            .await;

        match result {
            Ok(output) if output.status.success() => EngineExit::Success,
            Ok(output) => EngineExit::Failure(EngineFailure {
                error: Some(format!("ffmpeg exited with {}", output.status)),
                stdout: output.stdout,
                stderr: router.diagnostic(),
            }),
            Err(Error::Cancelled) => EngineExit::Cancelled,
            Err(e) => EngineExit::Failure(EngineFailure {
                error: Some(e.to_string()),
                stdout: String::new(),
                stderr: router.diagnostic(),
            }),
        }
    }
}

//! Job supervision.
//!
//! [`JobSupervisor::start`] turns a [`JobPlan`] into a running job: it owns
//! the engine invocation, relays progress with an ETA, honours kill
//! requests, and aggregates the finished outputs into a
//! [`TranscodeResult`].
//!
//! State moves `Created -> Running -> {Finished | Failed | Killed}` and never
//! leaves a terminal state. A kill wins over every other outcome: once
//! requested, the job resolves to [`Error::Cancelled`] even if the engine
//! failed or finalization already ran.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tf_av::{Compositor, EngineExit, FrameWorkspace, TranscodeEngine};
use tf_core::config::SupervisorConfig;
use tf_core::events::{EventPayload, JobEvent, JobState, ProgressSnapshot, ProgressUpdate};
use tf_core::{Error, JobId, Result, TranscodeResult};
use tf_plan::JobPlan;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::finalize::finalize;
use crate::shutdown::{ProcessRegistry, Registration};

/// Caller-supplied identity of a job.
#[derive(Debug, Clone, Default)]
pub struct JobMeta {
    pub name: String,
    /// The source file, echoed into the result.
    pub file: PathBuf,
    /// Opaque caller data, passed through to events and the result.
    pub transit: serde_json::Value,
}

/// Starts and supervises transcoding jobs.
#[derive(Clone)]
pub struct JobSupervisor {
    engine: Arc<dyn TranscodeEngine>,
    compositor: Arc<dyn Compositor>,
    registry: Option<ProcessRegistry>,
    buffer: usize,
}

impl std::fmt::Debug for JobSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobSupervisor")
            .field("engine", &self.engine.name())
            .field("registry", &self.registry)
            .field("buffer", &self.buffer)
            .finish_non_exhaustive()
    }
}

impl JobSupervisor {
    pub fn new(engine: Arc<dyn TranscodeEngine>, compositor: Arc<dyn Compositor>) -> Self {
        Self {
            engine,
            compositor,
            registry: None,
            buffer: SupervisorConfig::default().progress_buffer,
        }
    }

    /// Apply supervisor tuning. A zero buffer is raised to one.
    pub fn with_config(mut self, config: &SupervisorConfig) -> Self {
        self.buffer = config.progress_buffer.max(1);
        self
    }

    /// Track running jobs in `registry` for shutdown.
    pub fn with_registry(mut self, registry: ProcessRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn engine(&self) -> &Arc<dyn TranscodeEngine> {
        &self.engine
    }

    /// Start `plan`. Must be called from within a tokio runtime.
    ///
    /// The job is `Running` and its `JobStarted` event is queued by the time
    /// this returns.
    pub fn start(&self, plan: JobPlan, meta: JobMeta) -> JobHandle {
        let job_id = JobId::new();
        let (state_tx, state_rx) = watch::channel(JobState::Created);
        let (events_tx, events_rx) = mpsc::channel(self.buffer);
        let cancel = CancellationToken::new();
        let kill = KillSwitch {
            cancel: cancel.clone(),
            requested: Arc::new(AtomicBool::new(false)),
        };

        transition(&state_tx, job_id, JobState::Running);
        let started = JobEvent::new(EventPayload::JobStarted {
            job_id,
            name: meta.name.clone(),
            file: meta.file.clone(),
            transit: meta.transit.clone(),
        });
        if events_tx.try_send(started).is_err() {
            tracing::debug!(%job_id, "JobStarted event dropped");
        }

        tracing::info!(
            %job_id,
            name = %meta.name,
            input = %plan.input.display(),
            total_frames = plan.total_frames,
            "Job started"
        );

        let job = Job {
            job_id,
            plan: Arc::new(plan),
            meta,
            engine: Arc::clone(&self.engine),
            compositor: Arc::clone(&self.compositor),
            events: events_tx,
            cancel: cancel.clone(),
            buffer: self.buffer,
            registration: self.registry.as_ref().map(|r| r.register(job_id, cancel)),
        };
        let task = tokio::spawn(job.run(state_tx));

        JobHandle {
            job_id,
            state: state_rx,
            events: Some(events_rx),
            kill,
            task,
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Kill control of one job. Cheap to clone.
#[derive(Debug, Clone)]
pub struct KillSwitch {
    cancel: CancellationToken,
    requested: Arc<AtomicBool>,
}

impl KillSwitch {
    /// Request termination. Calling it again has no further effect.
    pub fn kill(&self) {
        if !self.requested.swap(true, Ordering::SeqCst) {
            self.cancel.cancel();
        }
    }

    pub fn is_killed(&self) -> bool {
        self.requested.load(Ordering::SeqCst) || self.cancel.is_cancelled()
    }
}

/// The caller's view of a started job.
#[derive(Debug)]
pub struct JobHandle {
    job_id: JobId,
    state: watch::Receiver<JobState>,
    events: Option<mpsc::Receiver<JobEvent>>,
    kill: KillSwitch,
    task: JoinHandle<Result<TranscodeResult>>,
}

impl JobHandle {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> JobState {
        *self.state.borrow()
    }

    /// A receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<JobState> {
        self.state.clone()
    }

    /// Take the event stream. Returns `None` after the first call.
    pub fn events(&mut self) -> Option<mpsc::Receiver<JobEvent>> {
        self.events.take()
    }

    /// Request termination. Idempotent.
    pub fn kill(&self) {
        if !self.kill.is_killed() {
            tracing::info!(job_id = %self.job_id, "Kill requested");
        }
        self.kill.kill();
    }

    pub fn kill_switch(&self) -> KillSwitch {
        self.kill.clone()
    }

    /// Wait for the terminal outcome.
    pub async fn wait(self) -> Result<TranscodeResult> {
        self.task
            .await
            .map_err(|e| Error::Internal(format!("job task failed: {e}")))?
    }
}

// ---------------------------------------------------------------------------
// Job task
// ---------------------------------------------------------------------------

struct Job {
    job_id: JobId,
    plan: Arc<JobPlan>,
    meta: JobMeta,
    engine: Arc<dyn TranscodeEngine>,
    compositor: Arc<dyn Compositor>,
    events: mpsc::Sender<JobEvent>,
    cancel: CancellationToken,
    buffer: usize,
    registration: Option<Registration>,
}

impl Job {
    async fn run(self, state: watch::Sender<JobState>) -> Result<TranscodeResult> {
        let outcome = self.execute().await;
        let job_id = self.job_id;

        // A kill overrides whatever the run produced.
        let outcome = if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            outcome
        };

        match &outcome {
            Ok(result) => {
                transition(&state, job_id, JobState::Finished);
                tracing::info!(
                    %job_id,
                    outputs = result.transcoded.len(),
                    subtitles = result.subtitles.len(),
                    thumbnails = result.thumbnails.is_some(),
                    "Job finished"
                );
            }
            Err(Error::Cancelled) => {
                transition(&state, job_id, JobState::Killed);
                tracing::info!(%job_id, "Job killed");
            }
            Err(e) => {
                transition(&state, job_id, JobState::Failed);
                tracing::error!(%job_id, "Job failed: {e}");
            }
        }

        drop(self.registration);
        outcome
    }

    async fn execute(&self) -> Result<TranscodeResult> {
        let frames = self
            .plan
            .thumbnails
            .as_ref()
            .map(|t| FrameWorkspace::create(&t.frame_dir))
            .transpose()?;

        let (progress_tx, progress_rx) = mpsc::channel(self.buffer);
        let (exit, ()) = tokio::join!(
            self.engine.run(&self.plan, progress_tx, self.cancel.clone()),
            self.relay_progress(progress_rx),
        );

        match exit {
            EngineExit::Success => {}
            EngineExit::Cancelled => return Err(Error::Cancelled),
            EngineExit::Failure(failure) => {
                if self.cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                return Err(Error::process(self.engine.name(), failure.diagnostic()));
            }
        }

        let finalized = finalize(
            self.job_id,
            &self.plan,
            self.engine.as_ref(),
            self.compositor.as_ref(),
            frames.as_ref(),
        )
        .await;
        drop(frames);

        Ok(TranscodeResult {
            job_id: self.job_id,
            name: self.meta.name.clone(),
            file: self.meta.file.clone(),
            transit: self.meta.transit.clone(),
            transcoded: finalized.transcoded,
            subtitles: finalized.subtitles,
            thumbnails: finalized.thumbnails,
        })
    }

    /// Forward engine snapshots as progress events until the engine drops
    /// its sender. Never waits on the consumer.
    async fn relay_progress(&self, mut snapshots: mpsc::Receiver<ProgressSnapshot>) {
        let mut dropped = 0u64;
        while let Some(snapshot) = snapshots.recv().await {
            let progress = ProgressUpdate::estimate(snapshot, self.plan.total_frames);
            let event = JobEvent::new(EventPayload::JobProgress {
                job_id: self.job_id,
                progress,
            });
            if self.events.try_send(event).is_err() {
                dropped += 1;
            }
        }
        if dropped > 0 {
            tracing::debug!(job_id = %self.job_id, dropped, "Progress events dropped");
        }
    }
}

/// Move to `next` unless the job already reached a terminal state.
fn transition(state: &watch::Sender<JobState>, job_id: JobId, next: JobState) -> bool {
    let moved = state.send_if_modified(|current| {
        if current.is_terminal() || *current == next {
            return false;
        }
        *current = next;
        true
    });
    if moved {
        tracing::debug!(%job_id, state = %next, "Job state changed");
    }
    moved
}

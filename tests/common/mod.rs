//! Shared test harness for integration tests.
//!
//! [`FakeEngine`] stands in for ffmpeg: it probes to a scripted
//! [`MediaDescriptor`], writes placeholder files for every branch of the
//! plan it is given, emits scripted progress, and ends the way its
//! [`Script`] says. [`FakeCompositor`] records sprite-sheet requests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tf_av::{Compositor, EngineExit, EngineFailure, SpriteLayout, TranscodeEngine};
use tf_core::config::Config;
use tf_core::events::ProgressSnapshot;
use tf_core::{
    AudioPreset, Error, MediaDescriptor, PresetSpec, Resolution, Result, SubtitlePreset,
    ThumbnailSpec, Track, TrackKind, VideoPreset,
};
use tf_plan::JobPlan;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use transforged::Transcoder;

/// How a [`FakeEngine`] run ends.
#[derive(Debug, Clone)]
pub enum Script {
    /// Write every output and exit cleanly.
    Succeed,
    /// Exit with the given failure without writing outputs.
    Fail(EngineFailure),
    /// Block until cancelled, then report cancellation.
    WaitForCancel,
    /// Block until cancelled, then report a failure instead.
    FailOnCancel(EngineFailure),
}

pub struct FakeEngine {
    media: MediaDescriptor,
    snapshots: Vec<ProgressSnapshot>,
    script: Script,
    /// Duration reported when an output file is probed. `None` fails the probe.
    output_duration: Option<f64>,
    frames: usize,
    runs: AtomicUsize,
    probes: Mutex<Vec<PathBuf>>,
}

impl FakeEngine {
    pub fn new(media: MediaDescriptor) -> Self {
        Self {
            media,
            snapshots: Vec::new(),
            script: Script::Succeed,
            output_duration: Some(42.0),
            frames: 3,
            runs: AtomicUsize::new(0),
            probes: Mutex::new(Vec::new()),
        }
    }

    pub fn with_script(mut self, script: Script) -> Self {
        self.script = script;
        self
    }

    pub fn with_snapshots(mut self, snapshots: Vec<ProgressSnapshot>) -> Self {
        self.snapshots = snapshots;
        self
    }

    pub fn with_output_duration(mut self, duration: Option<f64>) -> Self {
        self.output_duration = duration;
        self
    }

    pub fn with_frames(mut self, frames: usize) -> Self {
        self.frames = frames;
        self
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    /// Every path passed to `probe`, source included.
    pub fn probed(&self) -> Vec<PathBuf> {
        self.probes.lock().clone()
    }

    async fn write_outputs(&self, plan: &JobPlan) -> std::io::Result<()> {
        for output in &plan.outputs {
            tokio::fs::write(&output.spec.file, b"av output").await?;
        }
        for subtitle in &plan.subtitles {
            tokio::fs::write(&subtitle.spec.file, b"WEBVTT\n").await?;
        }
        if let Some(thumbs) = &plan.thumbnails {
            for n in 1..=self.frames {
                let frame = thumbs.frame_dir.join(format!("{n:05}.jpg"));
                tokio::fs::write(frame, b"jpg").await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TranscodeEngine for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }

    async fn probe(&self, path: &Path) -> Result<MediaDescriptor> {
        self.probes.lock().push(path.to_path_buf());
        if path == self.media.path {
            return Ok(self.media.clone());
        }
        match self.output_duration {
            Some(secs) => Ok(MediaDescriptor::from_tracks(
                path,
                vec![Track::new(0, TrackKind::Video, "h264").with_duration(secs)],
            )),
            None => Err(Error::Probe(format!("{} is unreadable", path.display()))),
        }
    }

    async fn run(
        &self,
        plan: &JobPlan,
        progress: mpsc::Sender<ProgressSnapshot>,
        cancel: CancellationToken,
    ) -> EngineExit {
        self.runs.fetch_add(1, Ordering::SeqCst);
        for snapshot in &self.snapshots {
            let _ = progress.try_send(snapshot.clone());
        }

        match &self.script {
            Script::Succeed => match self.write_outputs(plan).await {
                Ok(()) => EngineExit::Success,
                Err(e) => EngineExit::Failure(EngineFailure {
                    error: Some(e.to_string()),
                    ..Default::default()
                }),
            },
            Script::Fail(failure) => EngineExit::Failure(failure.clone()),
            Script::WaitForCancel => {
                cancel.cancelled().await;
                EngineExit::Cancelled
            }
            Script::FailOnCancel(failure) => {
                cancel.cancelled().await;
                EngineExit::Failure(failure.clone())
            }
        }
    }
}

/// One recorded [`Compositor::compose`] call.
#[derive(Debug, Clone)]
pub struct ComposeCall {
    pub frames: Vec<PathBuf>,
    pub columns: u32,
    pub output: PathBuf,
    /// Whether every frame still existed when compose ran.
    pub frames_present: bool,
}

#[derive(Default)]
pub struct FakeCompositor {
    calls: Mutex<Vec<ComposeCall>>,
    fail: bool,
}

impl FakeCompositor {
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<ComposeCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Compositor for FakeCompositor {
    async fn compose(
        &self,
        frames: &[PathBuf],
        layout: &SpriteLayout,
        output: &Path,
    ) -> Result<Resolution> {
        self.calls.lock().push(ComposeCall {
            frames: frames.to_vec(),
            columns: layout.columns,
            output: output.to_path_buf(),
            frames_present: frames.iter().all(|f| f.exists()),
        });
        if self.fail {
            return Err(Error::tool("montage", "exit status 1"));
        }
        tokio::fs::write(output, b"sheet").await?;
        Ok(Resolution::new(160, 90))
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// 1080p source with English audio and two text subtitles.
pub fn movie(path: &Path) -> MediaDescriptor {
    MediaDescriptor::from_tracks(
        path,
        vec![
            Track::new(0, TrackKind::Video, "h264")
                .with_dimensions(1920, 1080)
                .with_bitrate(8_000_000)
                .with_frame_count(2400)
                .with_duration(100.0),
            Track::new(1, TrackKind::Audio, "aac")
                .with_language("eng")
                .with_frame_count(4700),
            Track::new(2, TrackKind::Subtitle, "subrip")
                .with_language("eng")
                .with_frame_count(900),
            Track::new(3, TrackKind::Subtitle, "subrip")
                .with_language("fre")
                .with_title("Français")
                .with_frame_count(850),
        ],
    )
}

pub fn video_preset(name: &str, width: u32, height: u32, bitrate: u64) -> PresetSpec {
    PresetSpec {
        name: name.into(),
        is_default: false,
        format: "mp4".into(),
        extension: "mp4".into(),
        video: Some(VideoPreset {
            width,
            height,
            bitrate,
            max_bitrate: None,
            encoder: "h264".into(),
            preset: Some("veryfast".into()),
        }),
        audio: Some(AudioPreset {
            bitrate: 128_000,
            channels: Some(2),
            encoder: "aac".into(),
            all_tracks: false,
        }),
        subtitle: None,
        thumbnails: None,
    }
}

/// Default presets plus a 720p output carrying thumbnails and WebVTT
/// extraction.
pub fn full_config() -> Config {
    let mut config = Config::default();
    let mut extras = video_preset("720p-extras", 1280, 720, 2_000_000);
    extras.thumbnails = Some(ThumbnailSpec {
        columns: Some(4),
        ..ThumbnailSpec::default()
    });
    extras.subtitle = Some(SubtitlePreset {
        encoder: "webvtt".into(),
        format: Some("webvtt".into()),
        extension: Some("vtt".into()),
    });
    config.presets.push(extras);
    config
}

pub fn snapshot(frames: u64, fps: f64) -> ProgressSnapshot {
    ProgressSnapshot {
        frames,
        current_fps: fps,
        ..Default::default()
    }
}

pub fn transcoder(config: Config, engine: Arc<FakeEngine>, compositor: Arc<FakeCompositor>) -> Transcoder {
    Transcoder::new(config, engine, compositor).unwrap()
}

//! # tf-av
//!
//! External collaborators of the transcoding core.
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg,
//!   ffprobe, montage and identify.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout,
//!   stderr streaming and cancellation.
//! - **Probing** ([`FfprobeProber`]) -- maps `ffprobe` JSON onto
//!   [`tf_core::MediaDescriptor`].
//! - **Engine** ([`TranscodeEngine`], [`FfmpegEngine`]) -- runs a
//!   [`tf_plan::JobPlan`] and streams progress snapshots.
//! - **Compositing** ([`Compositor`], [`MontageCompositor`]) -- tiles
//!   thumbnail frames into one sprite sheet.
//! - **Frame workspace** ([`FrameWorkspace`]) -- the thumbnail frame
//!   directory, removed when dropped.

pub mod command;
pub mod compositor;
pub mod engine;
pub mod ffmpeg;
pub mod fsutil;
pub mod probe;
pub mod progress;
pub mod tools;
pub mod workspace;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use compositor::{Compositor, MontageCompositor, SpriteLayout};
pub use engine::{EngineExit, EngineFailure, TranscodeEngine};
pub use ffmpeg::FfmpegEngine;
pub use fsutil::stat_size;
pub use probe::FfprobeProber;
pub use progress::ProgressParser;
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
pub use workspace::FrameWorkspace;

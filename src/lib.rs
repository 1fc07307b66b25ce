//! transforged: track selection, preset planning and supervised
//! multi-output transcoding on top of ffmpeg.
//!
//! The [`Transcoder`] façade chains the stages: probe the source, select
//! tracks, plan presets, gate them against the capability profile, build
//! one job plan, and hand it to the supervisor.

pub mod transcoder;

pub use transcoder::{PreparedJob, Transcoder};

pub use tf_av as av;
pub use tf_core as core;
pub use tf_pipeline as pipeline;
pub use tf_plan as plan;

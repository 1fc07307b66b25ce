//! # tf-pipeline
//!
//! Supervision of running transcode jobs: the job state machine, progress
//! relay with ETA, kill handling, and parallel finalization into one
//! [`tf_core::TranscodeResult`].
//!
//! - [`JobSupervisor`] starts jobs and hands back a [`JobHandle`].
//! - [`ProcessRegistry`] tracks running jobs so a shutdown handler can kill
//!   them all.

mod finalize;
pub mod shutdown;
pub mod supervisor;

pub use shutdown::{ProcessRegistry, Registration};
pub use supervisor::{JobHandle, JobMeta, JobSupervisor, KillSwitch};

//! tf-plan: the decision core.
//!
//! Each stage is a pure function over the previous stage's output type:
//!
//! 1. [`TrackSelector`] picks audio, subtitle and video tracks from a
//!    [`MediaDescriptor`](tf_core::MediaDescriptor).
//! 2. [`planner::plan`] resolves presets against the selection into
//!    [`PlannedOutput`]s.
//! 3. [`gate`] keeps the outputs the capability profile can produce,
//!    wrapping them as [`AcceptedOutput`]s.
//! 4. [`JobBuilder`] turns accepted outputs into one multi-output
//!    [`JobPlan`].

pub mod builder;
pub mod gate;
pub mod job;
pub mod planner;
pub mod selector;

pub use builder::{BuildRequest, JobBuilder, OutputLayout};
pub use gate::{can_process, AcceptedOutput, GateOutcome};
pub use job::{AvOutput, FilterEntry, JobPlan, OutputSpec, SubtitleBranch, ThumbnailBranch};
pub use planner::{
    default_preset, effective_bitrate, plan, PlannedAudio, PlannedOutput, PlannedSubtitle,
    PlannedThumbnails, PlannedVideo,
};
pub use selector::{
    AudioSubtitle, ForcedHeuristic, ForcedSubtitlePolicy, SelectedTracks, TrackSelector,
};

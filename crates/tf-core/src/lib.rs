//! tf-core: shared types, IDs, errors, configuration, and job events.
//!
//! Every other tf-* crate depends on this one. It holds the probed track
//! model, preset templates, the capability profile, the result types a
//! finished job resolves to, and the embedded ISO 639 language table.

pub mod capability;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod language;
pub mod preset;
pub mod result;

// Re-export the most commonly used items at the crate root.
pub use capability::{CapabilityProfile, DecoderLookup, DecoderTable};
pub use catalog::{
    is_image_subtitle_codec, Disposition, MediaDescriptor, Track, TrackKind,
};
pub use error::{Error, Result};
pub use ids::*;
pub use preset::{
    AudioPreset, PresetSpec, SubtitlePreset, ThumbnailSpec, VideoPreset,
};
pub use result::{OutputInfo, Resolution, SpriteSheetInfo, SubtitleTrackInfo, TranscodeResult};

//! Output preset templates.
//!
//! A [`PresetSpec`] describes a desired output: target geometry and bitrate
//! ceilings per stream kind. Encoder fields name codec keys that are
//! resolved through the capability profile's encoder table at build time.

use serde::{Deserialize, Serialize};

/// A named output template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetSpec {
    pub name: String,
    /// Exactly one preset of a set carries this flag.
    #[serde(default)]
    pub is_default: bool,
    /// Muxer passed to `-f`.
    pub format: String,
    /// File extension of the produced output.
    pub extension: String,
    #[serde(default)]
    pub video: Option<VideoPreset>,
    #[serde(default)]
    pub audio: Option<AudioPreset>,
    #[serde(default)]
    pub subtitle: Option<SubtitlePreset>,
    #[serde(default)]
    pub thumbnails: Option<ThumbnailSpec>,
}

/// Video section of a preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoPreset {
    pub width: u32,
    pub height: u32,
    /// Target bits per second.
    pub bitrate: u64,
    /// Rate-control ceiling. Falls back to the effective bitrate.
    #[serde(default)]
    pub max_bitrate: Option<u64>,
    pub encoder: String,
    /// Encoder speed preset (e.g. "veryfast").
    #[serde(default)]
    pub preset: Option<String>,
}

/// Audio section of a preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioPreset {
    /// Target bits per second.
    pub bitrate: u64,
    #[serde(default)]
    pub channels: Option<u32>,
    pub encoder: String,
    /// Keep every audio track, selected one first.
    #[serde(default)]
    pub all_tracks: bool,
}

/// Subtitle section of a preset.
///
/// With both `format` and `extension` set the section requests standalone
/// extraction, one file per track. Otherwise subtitles are muxed into the
/// AV output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitlePreset {
    pub encoder: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub extension: Option<String>,
}

impl SubtitlePreset {
    pub fn is_standalone(&self) -> bool {
        self.format.is_some() && self.extension.is_some()
    }
}

/// Thumbnail sprite-sheet section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailSpec {
    /// Frame sampling rate handed to the `fps` filter, e.g. `1/10`.
    #[serde(default = "default_thumbnail_delay")]
    pub delay: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub columns: Option<u32>,
    /// Encoder key of the still frames.
    #[serde(default = "default_thumbnail_encoder")]
    pub encoder: String,
    #[serde(default = "default_thumbnail_format")]
    pub format: String,
    #[serde(default = "default_thumbnail_extension")]
    pub extension: String,
}

/// Sprite-sheet column count when none is configured.
pub const DEFAULT_THUMBNAIL_COLUMNS: u32 = 6;

impl ThumbnailSpec {
    pub fn columns(&self) -> u32 {
        self.columns.filter(|c| *c > 0).unwrap_or(DEFAULT_THUMBNAIL_COLUMNS)
    }
}

impl Default for ThumbnailSpec {
    fn default() -> Self {
        Self {
            delay: default_thumbnail_delay(),
            width: Some(160),
            height: None,
            columns: None,
            encoder: default_thumbnail_encoder(),
            format: default_thumbnail_format(),
            extension: default_thumbnail_extension(),
        }
    }
}

fn default_thumbnail_delay() -> String {
    "1/10".into()
}

fn default_thumbnail_encoder() -> String {
    "mjpeg".into()
}

fn default_thumbnail_format() -> String {
    "image2".into()
}

fn default_thumbnail_extension() -> String {
    "jpg".into()
}

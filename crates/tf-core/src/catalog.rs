//! Probed track model and the per-kind track catalog.
//!
//! A [`MediaDescriptor`] is the result of probing one file: its streams,
//! bucketed by kind, in probe order. Probe order matters because every
//! "first match" rule in track selection breaks ties by it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Bitmap subtitle codecs. These cannot be muxed next to text streams and
/// have to be burned into the picture instead.
pub const IMAGE_SUBTITLE_CODECS: &[&str] = &[
    "hdmv_pgs_subtitle",
    "pgssub",
    "dvd_subtitle",
    "dvdsub",
    "dvb_subtitle",
    "dvbsub",
    "xsub",
];

/// Whether `codec` is an image-based subtitle codec.
pub fn is_image_subtitle_codec(codec: &str) -> bool {
    IMAGE_SUBTITLE_CODECS
        .iter()
        .any(|c| c.eq_ignore_ascii_case(codec))
}

// ---------------------------------------------------------------------------
// TrackKind
// ---------------------------------------------------------------------------

/// Media type of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
    Subtitle,
}

impl TrackKind {
    /// Map an ffprobe `codec_type` to a kind. Data and attachment streams
    /// have no kind and are dropped by the catalog.
    pub fn from_codec_type(codec_type: &str) -> Option<Self> {
        match codec_type {
            "audio" => Some(Self::Audio),
            "video" => Some(Self::Video),
            "subtitle" => Some(Self::Subtitle),
            _ => None,
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::Video => write!(f, "video"),
            Self::Subtitle => write!(f, "subtitle"),
        }
    }
}

// ---------------------------------------------------------------------------
// Track
// ---------------------------------------------------------------------------

/// Disposition flags of a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disposition {
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub forced: bool,
}

/// One stream of a probed media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Stream index, stable within the file.
    pub index: u32,
    pub kind: TrackKind,
    pub codec_name: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub disposition: Disposition,
    #[serde(default)]
    pub frame_count: Option<u64>,
    #[serde(default)]
    pub duration_secs: Option<f64>,
    /// Bits per second.
    #[serde(default)]
    pub bitrate: Option<u64>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub channels: Option<u32>,
}

impl Track {
    /// Create a track with only identity fields set.
    pub fn new(index: u32, kind: TrackKind, codec_name: impl Into<String>) -> Self {
        Self {
            index,
            kind,
            codec_name: codec_name.into(),
            language: None,
            title: None,
            disposition: Disposition::default(),
            frame_count: None,
            duration_secs: None,
            bitrate: None,
            width: None,
            height: None,
            channels: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_default(mut self) -> Self {
        self.disposition.default = true;
        self
    }

    pub fn with_forced(mut self) -> Self {
        self.disposition.forced = true;
        self
    }

    pub fn with_frame_count(mut self, frames: u64) -> Self {
        self.frame_count = Some(frames);
        self
    }

    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    pub fn with_bitrate(mut self, bits_per_sec: u64) -> Self {
        self.bitrate = Some(bits_per_sec);
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_channels(mut self, channels: u32) -> Self {
        self.channels = Some(channels);
        self
    }

    /// Bitrate if known and non-zero.
    pub fn known_bitrate(&self) -> Option<u64> {
        self.bitrate.filter(|b| *b > 0)
    }

    /// Whether this is a bitmap subtitle stream.
    pub fn is_image_subtitle(&self) -> bool {
        self.kind == TrackKind::Subtitle && is_image_subtitle_codec(&self.codec_name)
    }

    /// The `-map` specifier for this stream of the first input.
    pub fn map_specifier(&self) -> String {
        format!("0:{}", self.index)
    }
}

// ---------------------------------------------------------------------------
// MediaDescriptor
// ---------------------------------------------------------------------------

/// A probed media file with its streams bucketed by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    pub path: PathBuf,
    pub audio: Vec<Track>,
    pub video: Vec<Track>,
    pub subtitle: Vec<Track>,
}

impl MediaDescriptor {
    /// Classify `tracks` into buckets, keeping probe order inside each one.
    pub fn from_tracks(path: impl Into<PathBuf>, tracks: impl IntoIterator<Item = Track>) -> Self {
        let mut media = Self {
            path: path.into(),
            audio: Vec::new(),
            video: Vec::new(),
            subtitle: Vec::new(),
        };
        for track in tracks {
            match track.kind {
                TrackKind::Audio => media.audio.push(track),
                TrackKind::Video => media.video.push(track),
                TrackKind::Subtitle => media.subtitle.push(track),
            }
        }
        media
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The bucket for `kind`.
    pub fn tracks(&self, kind: TrackKind) -> &[Track] {
        match kind {
            TrackKind::Audio => &self.audio,
            TrackKind::Video => &self.video,
            TrackKind::Subtitle => &self.subtitle,
        }
    }

    /// Look up a track by stream index across all buckets.
    pub fn track(&self, index: u32) -> Option<&Track> {
        self.audio
            .iter()
            .chain(&self.video)
            .chain(&self.subtitle)
            .find(|t| t.index == index)
    }

    /// Duration of the first video track that reports one.
    pub fn video_duration(&self) -> Option<f64> {
        self.video.iter().find_map(|t| t.duration_secs)
    }
}

//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! tool paths, the capability profile, the preset set, track-selection
//! preferences and supervisor tuning. Every section defaults sensibly so a
//! completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::capability::CapabilityProfile;
use crate::error::Result;
use crate::preset::{AudioPreset, PresetSpec, VideoPreset};
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub capabilities: CapabilityProfile,
    #[serde(default = "default_presets")]
    pub presets: Vec<PresetSpec>,
    pub selection: SelectionConfig,
    pub supervisor: SupervisorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tools: ToolsConfig::default(),
            capabilities: CapabilityProfile::default(),
            presets: default_presets(),
            selection: SelectionConfig::default(),
            supervisor: SupervisorConfig::default(),
        }
    }
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Load configuration strictly: a missing or malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.presets.is_empty() {
            warnings.push("presets is empty; nothing can be planned".into());
        }

        match self.presets.iter().filter(|p| p.is_default).count() {
            0 => warnings.push("no preset is marked is_default".into()),
            1 => {}
            n => warnings.push(format!("{n} presets are marked is_default; exactly one is allowed")),
        }

        for (i, preset) in self.presets.iter().enumerate() {
            if preset.name.is_empty() {
                warnings.push(format!("presets[{i}].name is empty"));
            }
            let encoders = [
                preset.video.as_ref().map(|v| ("video", v.encoder.as_str())),
                preset.audio.as_ref().map(|a| ("audio", a.encoder.as_str())),
                preset.subtitle.as_ref().map(|s| ("subtitle", s.encoder.as_str())),
                preset.thumbnails.as_ref().map(|t| ("thumbnails", t.encoder.as_str())),
            ];
            for (section, encoder) in encoders.into_iter().flatten() {
                if !self.capabilities.can_encode(encoder) {
                    warnings.push(format!(
                        "presets[{i}] ({}) {section} encoder '{encoder}' is not in capabilities.encoders",
                        preset.name
                    ));
                }
            }
            if let Some(video) = &preset.video {
                if video.width == 0 || video.height == 0 {
                    warnings.push(format!("presets[{i}] ({}) has a zero video dimension", preset.name));
                }
            }
        }

        if let Err(e) = regex::Regex::new(&self.selection.preferred_language) {
            warnings.push(format!("selection.preferred_language is not a valid regex: {e}"));
        }
        if let Err(e) = regex::Regex::new(&self.selection.forced.title_pattern) {
            warnings.push(format!("selection.forced.title_pattern is not a valid regex: {e}"));
        }

        if self.supervisor.progress_buffer == 0 {
            warnings.push("supervisor.progress_buffer is 0; progress events will be dropped".into());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Paths to external tools. Unset entries are looked up on `PATH`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    pub montage_path: Option<PathBuf>,
    pub identify_path: Option<PathBuf>,
}

/// Track-selection preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Regex matched against a track's language or title tag.
    #[serde(default = "default_preferred_language")]
    pub preferred_language: String,
    pub forced: ForcedSubtitleConfig,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            preferred_language: default_preferred_language(),
            forced: ForcedSubtitleConfig::default(),
        }
    }
}

/// Thresholds of the forced-subtitle heuristic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForcedSubtitleConfig {
    /// Subtitle tracks with at most this many frames count as forced.
    #[serde(default = "default_forced_max_frames")]
    pub max_frames: u64,
    /// Regex matched against the title tag.
    #[serde(default = "default_forced_title_pattern")]
    pub title_pattern: String,
}

impl Default for ForcedSubtitleConfig {
    fn default() -> Self {
        Self {
            max_frames: default_forced_max_frames(),
            title_pattern: default_forced_title_pattern(),
        }
    }
}

/// Job supervision tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Capacity of each job's event channel.
    #[serde(default = "default_progress_buffer")]
    pub progress_buffer: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            progress_buffer: default_progress_buffer(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_preferred_language() -> String {
    "^(en|eng)$".into()
}

fn default_forced_max_frames() -> u64 {
    50
}

fn default_forced_title_pattern() -> String {
    "(?i)force".into()
}

fn default_progress_buffer() -> usize {
    64
}

fn default_presets() -> Vec<PresetSpec> {
    let preset = |name: &str, width, height, bitrate, is_default| PresetSpec {
        name: name.into(),
        is_default,
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
    };

    vec![
        preset("480p", 854, 480, 1_200_000, true),
        preset("720p", 1280, 720, 2_500_000, false),
        preset("1080p", 1920, 1080, 5_000_000, false),
    ]
}

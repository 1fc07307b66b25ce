//! Result types a finished job resolves to.

use crate::ids::JobId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One produced audio/video file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputInfo {
    /// Preset name the output was planned from.
    pub name: String,
    pub file: PathBuf,
    pub duration: Option<f64>,
    pub resolution: Option<Resolution>,
    pub size: Option<u64>,
}

/// Display metadata of one extracted subtitle file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleTrackInfo {
    pub label: String,
    /// ISO 639-2 code as tagged on the stream.
    pub language: Option<String>,
    pub language_639_1: Option<String>,
    pub language_name: Option<String>,
    pub is_default: bool,
    pub is_forced: bool,
    pub file: PathBuf,
    pub size: Option<u64>,
}

/// The composed thumbnail sprite sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteSheetInfo {
    pub file: PathBuf,
    pub columns: u32,
    pub frame_count: usize,
    /// Size of one tile.
    pub frame_size: Resolution,
    pub size: Option<u64>,
    /// Sampling rate the frames were taken at.
    pub delay: String,
}

/// Aggregated result of a finished job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscodeResult {
    pub job_id: JobId,
    pub name: String,
    /// The source file.
    pub file: PathBuf,
    /// Caller data passed through untouched.
    pub transit: serde_json::Value,
    pub transcoded: Vec<OutputInfo>,
    pub subtitles: Vec<SubtitleTrackInfo>,
    pub thumbnails: Option<SpriteSheetInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_display() {
        assert_eq!(Resolution::new(1280, 720).to_string(), "1280x720");
    }

    #[test]
    fn result_serializes_missing_fields_as_null() {
        let result = TranscodeResult {
            job_id: JobId::new(),
            name: "movie".into(),
            file: "/in/movie.mkv".into(),
            transit: serde_json::json!({"request": 7}),
            transcoded: vec![OutputInfo {
                name: "480p".into(),
                file: "/out/movie.480p.mp4".into(),
                duration: None,
                resolution: Some(Resolution::new(854, 480)),
                size: Some(1024),
            }],
            subtitles: Vec::new(),
            thumbnails: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["transcoded"][0]["duration"], serde_json::Value::Null);
        assert_eq!(json["transcoded"][0]["resolution"]["width"], 854);
        assert_eq!(json["transit"]["request"], 7);
    }
}

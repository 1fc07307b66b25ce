//! Default-track selection.
//!
//! Picks the audio track to feature, the subtitle track to burn in or flag
//! as default, and the video track to encode. Ties always break by probe
//! order: the first matching track wins.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tf_core::config::{ForcedSubtitleConfig, SelectionConfig};
use tf_core::{Error, MediaDescriptor, Result, Track};

// ---------------------------------------------------------------------------
// Forced-subtitle policy
// ---------------------------------------------------------------------------

/// Decides whether a subtitle track carries forced (foreign-dialogue-only)
/// cues.
pub trait ForcedSubtitlePolicy: Send + Sync {
    fn is_forced(&self, track: &Track) -> bool;
}

/// Forced when any of: the forced disposition is set, the frame count is at
/// most `max_frames`, or the title matches `title_pattern`.
#[derive(Debug, Clone)]
pub struct ForcedHeuristic {
    max_frames: u64,
    title_pattern: Regex,
}

impl ForcedHeuristic {
    pub fn new(max_frames: u64, title_pattern: &str) -> Result<Self> {
        let title_pattern = Regex::new(title_pattern)
            .map_err(|e| Error::validation(format!("invalid forced title pattern: {e}")))?;
        Ok(Self {
            max_frames,
            title_pattern,
        })
    }

    pub fn from_config(config: &ForcedSubtitleConfig) -> Result<Self> {
        Self::new(config.max_frames, &config.title_pattern)
    }
}

impl Default for ForcedHeuristic {
    fn default() -> Self {
        let config = ForcedSubtitleConfig::default();
        Self {
            max_frames: config.max_frames,
            title_pattern: Regex::new(&config.title_pattern)
                .expect("default forced title pattern compiles"),
        }
    }
}

impl ForcedSubtitlePolicy for ForcedHeuristic {
    fn is_forced(&self, track: &Track) -> bool {
        track.disposition.forced
            || track.frame_count.is_some_and(|n| n <= self.max_frames)
            || track
                .title
                .as_deref()
                .is_some_and(|t| self.title_pattern.is_match(t))
    }
}

// ---------------------------------------------------------------------------
// Selection results
// ---------------------------------------------------------------------------

/// Outcome of audio/subtitle selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSubtitle {
    pub audio: Track,
    pub subtitle: Option<Track>,
}

/// Tracks featured by default in every output of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedTracks {
    pub audio: Track,
    pub video: Option<Track>,
    pub subtitle: Option<Track>,
}

// ---------------------------------------------------------------------------
// TrackSelector
// ---------------------------------------------------------------------------

/// Language-preference track selection.
pub struct TrackSelector {
    preferred: Regex,
    forced: Box<dyn ForcedSubtitlePolicy>,
}

impl std::fmt::Debug for TrackSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackSelector")
            .field("preferred", &self.preferred.as_str())
            .finish_non_exhaustive()
    }
}

impl TrackSelector {
    /// Selector matching `preferred` against language and title tags, with
    /// the default forced heuristic.
    pub fn new(preferred: Regex) -> Self {
        Self {
            preferred,
            forced: Box::new(ForcedHeuristic::default()),
        }
    }

    pub fn from_config(config: &SelectionConfig) -> Result<Self> {
        let preferred = Regex::new(&config.preferred_language)
            .map_err(|e| Error::validation(format!("invalid preferred language pattern: {e}")))?;
        let forced = ForcedHeuristic::from_config(&config.forced)?;
        Ok(Self::new(preferred).with_forced_policy(forced))
    }

    /// Replace the forced-subtitle policy.
    pub fn with_forced_policy(mut self, policy: impl ForcedSubtitlePolicy + 'static) -> Self {
        self.forced = Box::new(policy);
        self
    }

    fn is_preferred(&self, track: &Track) -> bool {
        [track.language.as_deref(), track.title.as_deref()]
            .into_iter()
            .flatten()
            .any(|tag| self.preferred.is_match(tag))
    }

    /// Pick the audio track and, optionally, a subtitle track.
    ///
    /// With a preferred-language audio track, only a forced preferred
    /// subtitle is chosen. Without one, the first non-forced preferred
    /// subtitle is chosen, falling back to the first preferred subtitle.
    pub fn select_audio_and_subtitle(&self, media: &MediaDescriptor) -> Result<AudioSubtitle> {
        let first_audio = media.audio.first().ok_or_else(|| {
            Error::validation(format!("{} has no audio tracks", media.path.display()))
        })?;

        let preferred_audio = media.audio.iter().find(|t| self.is_preferred(t));
        let preferred_subtitles: Vec<&Track> = media
            .subtitle
            .iter()
            .filter(|t| self.is_preferred(t))
            .collect();

        let subtitle = if preferred_audio.is_some() {
            preferred_subtitles
                .iter()
                .find(|t| self.forced.is_forced(t))
                .copied()
        } else {
            preferred_subtitles
                .iter()
                .find(|t| !self.forced.is_forced(t))
                .or_else(|| preferred_subtitles.first())
                .copied()
        };

        let audio = preferred_audio.unwrap_or(first_audio);
        tracing::debug!(
            audio = audio.index,
            subtitle = ?subtitle.map(|t| t.index),
            "Selected default tracks"
        );

        Ok(AudioSubtitle {
            audio: audio.clone(),
            subtitle: subtitle.cloned(),
        })
    }

    /// Pick the first video track.
    pub fn select_video(&self, media: &MediaDescriptor) -> Result<Track> {
        media.video.first().cloned().ok_or_else(|| {
            Error::validation(format!("{} has no video tracks", media.path.display()))
        })
    }

    /// Run both selections. A missing video track is an error only when
    /// `video_required` is set.
    pub fn select(&self, media: &MediaDescriptor, video_required: bool) -> Result<SelectedTracks> {
        let AudioSubtitle { audio, subtitle } = self.select_audio_and_subtitle(media)?;
        let video = if video_required {
            Some(self.select_video(media)?)
        } else {
            media.video.first().cloned()
        };
        Ok(SelectedTracks {
            audio,
            video,
            subtitle,
        })
    }
}

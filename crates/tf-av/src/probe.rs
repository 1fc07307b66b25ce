//! FFprobe-backed media probing.
//!
//! Shells out to `ffprobe -v quiet -print_format json -show_format -show_streams`
//! and maps the JSON onto a [`MediaDescriptor`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tf_core::{Disposition, Error, MediaDescriptor, Result, Track, TrackKind};

use crate::command::ToolCommand;

/// A prober backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe_path: PathBuf,
    timeout: Duration,
}

impl FfprobeProber {
    pub fn new(ffprobe_path: PathBuf) -> Self {
        Self {
            ffprobe_path,
            timeout: Duration::from_secs(60),
        }
    }

    /// Create a prober that finds ffprobe on `PATH`.
    pub fn from_path() -> Option<Self> {
        which::which("ffprobe").ok().map(Self::new)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Probe `path`.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the file does not exist, [`Error::Probe`]
    /// when ffprobe fails or prints something unparseable.
    pub async fn probe(&self, path: &Path) -> Result<MediaDescriptor> {
        if !path.exists() {
            return Err(Error::not_found("media file", path.display()));
        }

        let output = ToolCommand::new(self.ffprobe_path.clone())
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path.to_string_lossy())
            .timeout(self.timeout)
            .execute()
            .await
            .map_err(|e| Error::Probe(format!("{}: {e}", path.display())))?;

        let parsed: FfprobeOutput = serde_json::from_str(&output.stdout)
            .map_err(|e| Error::Probe(format!("ffprobe JSON parse error: {e}")))?;

        let media = descriptor_from_output(path, parsed);
        tracing::debug!(
            path = %path.display(),
            video = media.video.len(),
            audio = media.audio.len(),
            subtitle = media.subtitle.len(),
            "Probed media"
        );
        Ok(media)
    }
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: u32,
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    channels: Option<u32>,
    nb_frames: Option<String>,
    duration: Option<String>,
    bit_rate: Option<String>,
    #[serde(default)]
    disposition: FfprobeDisposition,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeDisposition {
    #[serde(default)]
    default: u8,
    #[serde(default)]
    forced: u8,
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// Parse a numeric field, treating `N/A` and garbage as unknown.
fn number<T: std::str::FromStr>(value: Option<&str>) -> Option<T> {
    value.map(str::trim).filter(|v| *v != "N/A").and_then(|v| v.parse().ok())
}

/// A tag by name, ignoring case and any `-<lang>` suffix mkvmerge appends
/// (`NUMBER_OF_FRAMES-eng`). An unsuffixed key wins; ties go to the
/// smallest key.
fn tag<'a>(tags: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    tags.iter()
        .filter_map(|(key, value)| {
            let (base, suffixed) = match key.split_once('-') {
                Some((base, _)) => (base, true),
                None => (key.as_str(), false),
            };
            base.eq_ignore_ascii_case(name).then_some(((suffixed, key), value))
        })
        .min_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, value)| value.as_str())
}

fn track_from_stream(stream: FfprobeStream, container_duration: Option<f64>) -> Option<Track> {
    let kind = TrackKind::from_codec_type(stream.codec_type.as_deref()?)?;

    let frame_count = number(stream.nb_frames.as_deref())
        .or_else(|| number(tag(&stream.tags, "NUMBER_OF_FRAMES")));
    let bitrate = number(stream.bit_rate.as_deref()).or_else(|| number(tag(&stream.tags, "BPS")));
    let duration_secs = number(stream.duration.as_deref()).or(match kind {
        TrackKind::Video => container_duration,
        _ => None,
    });

    Some(Track {
        index: stream.index,
        kind,
        codec_name: stream.codec_name.unwrap_or_default(),
        language: tag(&stream.tags, "language").map(str::to_string),
        title: tag(&stream.tags, "title").map(str::to_string),
        disposition: Disposition {
            default: stream.disposition.default == 1,
            forced: stream.disposition.forced == 1,
        },
        frame_count,
        duration_secs,
        bitrate,
        width: stream.width,
        height: stream.height,
        channels: stream.channels,
    })
}

fn descriptor_from_output(path: &Path, output: FfprobeOutput) -> MediaDescriptor {
    let container_duration = number(output.format.duration.as_deref());
    MediaDescriptor::from_tracks(
        path,
        output
            .streams
            .into_iter()
            .filter_map(|s| track_from_stream(s, container_duration)),
    )
}

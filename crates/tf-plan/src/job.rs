//! The job plan handed to the transcoding engine.
//!
//! A [`JobPlan`] is static data: one input, one filter graph, and every
//! output branch the engine writes in a single run. It is shared read-only
//! between the supervisor and the engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tf_core::{Resolution, SubtitleTrackInfo};

/// One `[in]filter[out]` entry of a filter graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterEntry {
    pub inputs: Vec<String>,
    pub filter: String,
    pub outputs: Vec<String>,
}

impl FilterEntry {
    pub fn new(
        inputs: impl IntoIterator<Item = impl Into<String>>,
        filter: impl Into<String>,
        outputs: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            filter: filter.into(),
            outputs: outputs.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for FilterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for input in &self.inputs {
            write!(f, "[{input}]")?;
        }
        write!(f, "{}", self.filter)?;
        for output in &self.outputs {
            write!(f, "[{output}]")?;
        }
        Ok(())
    }
}

/// Stream mappings, codec options and destination of one output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub file: PathBuf,
    /// `-map` arguments: `[label]` for graph outputs, `0:N` for streams.
    pub maps: Vec<String>,
    pub options: Vec<String>,
    /// Muxer passed to `-f`.
    pub format: String,
}

impl OutputSpec {
    fn push_args(&self, args: &mut Vec<String>) {
        for map in &self.maps {
            args.push("-map".into());
            args.push(map.clone());
        }
        args.extend(self.options.iter().cloned());
        args.push("-f".into());
        args.push(self.format.clone());
        args.push(self.file.to_string_lossy().into_owned());
    }
}

/// An audio/video output planned from a preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvOutput {
    /// Preset name.
    pub name: String,
    pub spec: OutputSpec,
    /// Present when the output carries video.
    pub resolution: Option<Resolution>,
    /// Source duration, when the probe reported one.
    pub duration: Option<f64>,
}

impl AvOutput {
    pub fn has_video(&self) -> bool {
        self.resolution.is_some()
    }
}

/// Numbered still frames for the sprite sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailBranch {
    pub spec: OutputSpec,
    /// Directory the frames are written to. Removed after composition.
    pub frame_dir: PathBuf,
    /// Sprite sheet destination.
    pub sheet: PathBuf,
    pub columns: u32,
    pub delay: String,
}

/// One extracted subtitle file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleBranch {
    pub spec: OutputSpec,
    pub track_index: u32,
    pub info: SubtitleTrackInfo,
}

/// Everything the engine writes in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPlan {
    pub input: PathBuf,
    /// Options placed before `-i`, e.g. decoder selection.
    pub input_options: Vec<String>,
    pub filter_graph: Vec<FilterEntry>,
    pub outputs: Vec<AvOutput>,
    pub thumbnails: Option<ThumbnailBranch>,
    pub subtitles: Vec<SubtitleBranch>,
    /// Largest frame count across every track feeding an output.
    pub total_frames: u64,
}

impl JobPlan {
    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Number of files the engine writes, counting the frame sequence once.
    pub fn branch_count(&self) -> usize {
        self.outputs.len() + self.subtitles.len() + usize::from(self.thumbnails.is_some())
    }

    /// The `-filter_complex` value.
    pub fn filter_complex(&self) -> Option<String> {
        (!self.filter_graph.is_empty()).then(|| {
            self.filter_graph
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(";")
        })
    }

    /// Render the ffmpeg arguments for this plan, without the program name
    /// or progress reporting flags.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["-y".to_string()];
        args.extend(self.input_options.iter().cloned());
        args.push("-i".into());
        args.push(self.input.to_string_lossy().into_owned());

        if let Some(graph) = self.filter_complex() {
            args.push("-filter_complex".into());
            args.push(graph);
        }

        for output in &self.outputs {
            output.spec.push_args(&mut args);
        }
        if let Some(thumbnails) = &self.thumbnails {
            thumbnails.spec.push_args(&mut args);
        }
        for subtitle in &self.subtitles {
            subtitle.spec.push_args(&mut args);
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(file: &str, maps: &[&str], options: &[&str], format: &str) -> OutputSpec {
        OutputSpec {
            file: file.into(),
            maps: maps.iter().map(|s| s.to_string()).collect(),
            options: options.iter().map(|s| s.to_string()).collect(),
            format: format.into(),
        }
    }

    #[test]
    fn filter_entry_display() {
        let entry = FilterEntry::new(["0:0", "0:3"], "overlay", ["composited"]);
        assert_eq!(entry.to_string(), "[0:0][0:3]overlay[composited]");

        let split = FilterEntry::new(["composited"], "split=2", ["vsrc0", "vsrc1"]);
        assert_eq!(split.to_string(), "[composited]split=2[vsrc0][vsrc1]");
    }

    #[test]
    fn args_order() {
        let plan = JobPlan {
            input: "/in/movie.mkv".into(),
            input_options: vec!["-c:v".into(), "h264_cuvid".into()],
            filter_graph: vec![FilterEntry::new(["0:0"], "scale=1280:720", ["vout0"])],
            outputs: vec![AvOutput {
                name: "720p".into(),
                spec: spec("/out/movie.720p.mp4", &["[vout0]", "0:1"], &["-c:v", "libx264"], "mp4"),
                resolution: Some(Resolution::new(1280, 720)),
                duration: None,
            }],
            thumbnails: None,
            subtitles: vec![SubtitleBranch {
                spec: spec("/out/movie.2.vtt", &["0:2"], &["-c:s", "webvtt", "-an", "-vn"], "webvtt"),
                track_index: 2,
                info: SubtitleTrackInfo {
                    label: "English".into(),
                    language: Some("eng".into()),
                    language_639_1: Some("en".into()),
                    language_name: Some("English".into()),
                    is_default: false,
                    is_forced: false,
                    file: "/out/movie.2.vtt".into(),
                    size: None,
                },
            }],
            total_frames: 100,
        };

        let args = plan.to_args();
        let expected: Vec<&str> = vec![
            "-y", "-c:v", "h264_cuvid", "-i", "/in/movie.mkv",
            "-filter_complex", "[0:0]scale=1280:720[vout0]",
            "-map", "[vout0]", "-map", "0:1", "-c:v", "libx264", "-f", "mp4", "/out/movie.720p.mp4",
            "-map", "0:2", "-c:s", "webvtt", "-an", "-vn", "-f", "webvtt", "/out/movie.2.vtt",
        ];
        assert_eq!(args, expected);
        assert_eq!(plan.branch_count(), 2);
    }

    #[test]
    fn no_graph_without_entries() {
        let plan = JobPlan {
            input: "a.mka".into(),
            input_options: Vec::new(),
            filter_graph: Vec::new(),
            outputs: Vec::new(),
            thumbnails: None,
            subtitles: Vec::new(),
            total_frames: 0,
        };
        assert!(plan.filter_complex().is_none());
        assert!(!plan.to_args().iter().any(|a| a == "-filter_complex"));
    }
}

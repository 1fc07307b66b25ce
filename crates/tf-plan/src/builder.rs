//! Job construction.
//!
//! Turns accepted outputs into a single [`JobPlan`]: one filter graph fed
//! by the selected video, one output per preset, plus the optional
//! thumbnail and subtitle-extraction branches.
//!
//! A filter-graph label can be consumed once, so whenever the main video
//! feeds several consumers it goes through a `split` first.

use std::path::{Path, PathBuf};
use tf_core::language::{Iso639Table, LanguageTable};
use tf_core::{
    CapabilityProfile, DecoderLookup, Error, MediaDescriptor, Resolution, Result,
    SubtitlePreset, SubtitleTrackInfo, ThumbnailSpec, Track, TrackKind,
};

use crate::gate::AcceptedOutput;
use crate::job::{AvOutput, FilterEntry, JobPlan, OutputSpec, SubtitleBranch, ThumbnailBranch};
use crate::selector::SelectedTracks;

/// Label of subtitle files with no usable title or language.
pub const UNNAMED_SUBTITLE: &str = "No Name";

/// Render bits per second as ffmpeg kilobits (`floor(bits / 1024)k`).
pub fn to_kb(bits: u64) -> String {
    format!("{}k", bits / 1024)
}

// ---------------------------------------------------------------------------
// OutputLayout
// ---------------------------------------------------------------------------

/// Where a job writes its files and how they are named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub directory: PathBuf,
    pub prefix: String,
}

impl OutputLayout {
    pub fn new(directory: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.into(),
        }
    }

    /// `{prefix}.{name}.{extension}`
    pub fn av_file(&self, name: &str, extension: &str) -> PathBuf {
        self.directory.join(format!("{}.{name}.{extension}", self.prefix))
    }

    /// `{prefix}.{index}.{extension}`
    pub fn subtitle_file(&self, index: u32, extension: &str) -> PathBuf {
        self.directory.join(format!("{}.{index}.{extension}", self.prefix))
    }

    /// `{prefix}.thumbs.{extension}`
    pub fn sheet_file(&self, extension: &str) -> PathBuf {
        self.directory.join(format!("{}.thumbs.{extension}", self.prefix))
    }

    pub fn frame_dir(&self) -> PathBuf {
        self.directory.join("thumbs")
    }
}

/// Image-sequence pattern inside `dir`. A literal `%` in the directory is
/// doubled so the muxer does not read it as a sequence marker.
fn frame_pattern(dir: &Path, extension: &str) -> PathBuf {
    let escaped = dir.to_string_lossy().replace('%', "%%");
    PathBuf::from(format!("{escaped}/%05d.{extension}"))
}

// ---------------------------------------------------------------------------
// BuildRequest
// ---------------------------------------------------------------------------

/// Inputs of one [`JobBuilder::build`] call.
#[derive(Debug, Clone)]
pub struct BuildRequest<'a> {
    pub media: &'a MediaDescriptor,
    pub selection: &'a SelectedTracks,
    pub outputs: &'a [AcceptedOutput],
    pub layout: &'a OutputLayout,
    pub thumbnails: Option<&'a ThumbnailSpec>,
    /// Standalone extraction; needs both format and extension.
    pub subtitles: Option<&'a SubtitlePreset>,
}

impl<'a> BuildRequest<'a> {
    /// Request taking the thumbnail and subtitle-extraction sections from
    /// the first accepted output that declares them.
    pub fn new(
        media: &'a MediaDescriptor,
        selection: &'a SelectedTracks,
        outputs: &'a [AcceptedOutput],
        layout: &'a OutputLayout,
    ) -> Self {
        let thumbnails = outputs
            .iter()
            .find_map(|o| o.thumbnails.as_ref().map(|t| &t.spec));
        let subtitles = outputs
            .iter()
            .filter_map(|o| o.subtitle.as_ref().map(|s| &s.spec))
            .find(|spec| spec.is_standalone());
        Self {
            media,
            selection,
            outputs,
            layout,
            thumbnails,
            subtitles,
        }
    }
}

// ---------------------------------------------------------------------------
// Graph assembly
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Graph {
    entries: Vec<FilterEntry>,
}

impl Graph {
    /// Labels for `consumers` readers of `label`, splitting when more than
    /// one reads it.
    fn fan_out(&mut self, label: &str, consumers: usize, split: &str, stem: &str) -> Vec<String> {
        if consumers <= 1 {
            return vec![label.to_string()];
        }
        let outputs: Vec<String> = (0..consumers).map(|i| format!("{stem}{i}")).collect();
        self.entries.push(FilterEntry::new(
            [label],
            format!("{split}={consumers}"),
            outputs.iter().cloned(),
        ));
        outputs
    }

    fn push(&mut self, entry: FilterEntry) {
        self.entries.push(entry);
    }
}

// ---------------------------------------------------------------------------
// JobBuilder
// ---------------------------------------------------------------------------

/// Builds [`JobPlan`]s against one capability profile.
pub struct JobBuilder<'a> {
    profile: &'a CapabilityProfile,
    languages: &'a dyn LanguageTable,
}

impl std::fmt::Debug for JobBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobBuilder")
            .field("profile", self.profile)
            .finish_non_exhaustive()
    }
}

impl<'a> JobBuilder<'a> {
    pub fn new(profile: &'a CapabilityProfile) -> Self {
        Self {
            profile,
            languages: &Iso639Table,
        }
    }

    pub fn with_languages(mut self, languages: &'a dyn LanguageTable) -> Self {
        self.languages = languages;
        self
    }

    fn encoder(&self, key: &str) -> Result<&'a str> {
        self.profile
            .encoder(key)
            .ok_or_else(|| Error::validation(format!("no encoder configured for '{key}'")))
    }

    fn required_filter(&self, name: &'static str) -> Result<&'a str> {
        self.profile
            .filter(name)
            .ok_or_else(|| Error::validation(format!("filter '{name}' is not available")))
    }

    fn usable<'t>(&self, track: &'t Track) -> Option<&'t Track> {
        (!self.profile.is_blacklisted(&track.codec_name)).then_some(track)
    }

    pub fn build(&self, request: &BuildRequest<'_>) -> Result<JobPlan> {
        let BuildRequest {
            media,
            selection,
            layout,
            ..
        } = *request;

        let mut ordered: Vec<&AcceptedOutput> = request.outputs.iter().collect();
        ordered.sort_by(|a, b| b.combined_bitrate().cmp(&a.combined_bitrate()));

        let video = selection.video.as_ref().and_then(|t| self.usable(t));
        if video.is_none() {
            if let Some(track) = &selection.video {
                tracing::warn!(codec = %track.codec_name, "Selected video codec is blacklisted; dropping video");
            }
        }
        if request.thumbnails.is_some() && video.is_none() {
            return Err(Error::validation("thumbnails require a selected video track"));
        }

        let video_outputs = match video {
            Some(_) => ordered.iter().filter(|o| o.video.is_some()).count(),
            None => 0,
        };
        // One pad feeds every scaled output, one feeds the thumbnail branch.
        let consumers = usize::from(video_outputs > 0) + usize::from(request.thumbnails.is_some());

        let mut total_frames = 0u64;
        let mut feed = |track: &Track| {
            total_frames = total_frames.max(track.frame_count.unwrap_or(0));
        };

        // Input options and the main video fan-out.
        let mut input_options = Vec::new();
        let mut graph = Graph::default();
        let split = self.profile.filter_or_canonical("split");
        let mut scaled_labels = Vec::new().into_iter();
        let mut thumbnail_source = None;

        if let (Some(video), true) = (video, consumers > 0) {
            feed(video);
            match self.profile.decoder(TrackKind::Video, &video.codec_name) {
                DecoderLookup::EngineDefault => {}
                DecoderLookup::Decoder(decoder) => {
                    if let Some(hw) = &self.profile.hw_decoder {
                        input_options.extend(["-hwaccel".to_string(), hw.clone()]);
                    }
                    input_options.extend(["-c:v".to_string(), decoder.to_string()]);
                }
                DecoderLookup::Unsupported => {
                    return Err(Error::validation(format!(
                        "no decoder configured for video codec '{}'",
                        video.codec_name
                    )))
                }
            }

            let mut sources = graph
                .fan_out(&video.map_specifier(), consumers, split, "main")
                .into_iter();

            if video_outputs > 0 {
                let mut base = sources.next().unwrap_or_default();
                let burn_in = ordered
                    .iter()
                    .find_map(|o| o.video.as_ref())
                    .and_then(|v| v.burn_in.as_ref())
                    .and_then(|s| self.usable(s));
                if let Some(subtitle) = burn_in {
                    if let DecoderLookup::Unsupported =
                        self.profile.decoder(TrackKind::Subtitle, &subtitle.codec_name)
                    {
                        return Err(Error::validation(format!(
                            "no decoder configured for burned-in subtitle codec '{}'",
                            subtitle.codec_name
                        )));
                    }
                    feed(subtitle);
                    let overlay = self.profile.filter_or_canonical("overlay");
                    graph.push(FilterEntry::new(
                        [base.clone(), subtitle.map_specifier()],
                        overlay,
                        ["composited"],
                    ));
                    base = "composited".to_string();
                }

                let scale = self.required_filter("scale")?;
                let inputs = graph.fan_out(&base, video_outputs, split, "vsrc");
                let mut labels = Vec::with_capacity(video_outputs);
                let mut scaled = ordered.iter().filter_map(|o| o.video.as_ref());
                for (i, input) in inputs.into_iter().enumerate() {
                    let Some(planned) = scaled.next() else { break };
                    let label = format!("vout{i}");
                    graph.push(FilterEntry::new(
                        [input],
                        format!("{scale}={}:{}", planned.width, planned.height),
                        [label.clone()],
                    ));
                    labels.push(label);
                }
                scaled_labels = labels.into_iter();
            }

            thumbnail_source = sources.next();
        }

        // One output per accepted preset.
        let mut outputs = Vec::with_capacity(ordered.len());
        for output in &ordered {
            let mut maps = Vec::new();
            let mut options = Vec::new();
            let mut resolution = None;
            let mut duration = None;
            let mut has_content = false;

            if let (Some(planned), Some(_)) = (&output.video, video) {
                let label = scaled_labels.next().ok_or_else(|| {
                    Error::Internal(format!("no scaled label for output '{}'", output.name))
                })?;
                maps.push(format!("[{label}]"));
                options.extend([
                    "-c:v".to_string(),
                    self.encoder(&planned.encoder)?.to_string(),
                    "-b:v".to_string(),
                    to_kb(planned.bitrate),
                    "-maxrate".to_string(),
                    to_kb(planned.max_bitrate),
                    "-bufsize".to_string(),
                    to_kb(planned.max_bitrate.saturating_mul(4)),
                ]);
                if let Some(preset) = &planned.preset {
                    options.extend(["-preset".to_string(), preset.clone()]);
                }
                resolution = Some(Resolution::new(planned.width, planned.height));
                duration = planned.track.duration_secs;
                has_content = true;
            }

            if let Some(audio) = &output.audio {
                let tracks: Vec<&Track> = audio.tracks.iter().filter_map(|t| self.usable(t)).collect();
                if !tracks.is_empty() {
                    for track in &tracks {
                        feed(track);
                        maps.push(track.map_specifier());
                    }
                    options.extend([
                        "-c:a".to_string(),
                        self.encoder(&audio.encoder)?.to_string(),
                        "-b:a".to_string(),
                        to_kb(audio.bitrate),
                    ]);
                    if let Some(channels) = audio.channels {
                        options.extend(["-ac".to_string(), channels.to_string()]);
                    }
                    has_content = true;
                }
            }

            if !has_content {
                // Outputs with only extraction or thumbnail sections contribute
                // through those branches.
                let branch_only = output.video.is_none()
                    && output.audio.is_none()
                    && (output.thumbnails.is_some()
                        || output.subtitle.as_ref().is_some_and(|s| s.spec.is_standalone()));
                if branch_only {
                    continue;
                }
                return Err(Error::validation(format!(
                    "output '{}' has neither video nor audio to encode",
                    output.name
                )));
            }

            if let Some(subtitle) = output.subtitle.as_ref().filter(|s| !s.spec.is_standalone()) {
                let tracks: Vec<&Track> =
                    subtitle.tracks.iter().filter_map(|t| self.usable(t)).collect();
                if !tracks.is_empty() {
                    let selected = selection.subtitle.as_ref().map(|t| t.index);
                    for (n, track) in tracks.iter().enumerate() {
                        feed(track);
                        maps.push(track.map_specifier());
                        let flag = if Some(track.index) == selected { "default" } else { "0" };
                        options.extend([format!("-disposition:s:{n}"), flag.to_string()]);
                    }
                    options.extend([
                        "-c:s".to_string(),
                        self.encoder(&subtitle.spec.encoder)?.to_string(),
                    ]);
                }
            }

            outputs.push(AvOutput {
                name: output.name.clone(),
                spec: OutputSpec {
                    file: layout.av_file(&output.name, &output.extension),
                    maps,
                    options,
                    format: output.format.clone(),
                },
                resolution,
                duration,
            });
        }

        let thumbnails = match (request.thumbnails, thumbnail_source) {
            (Some(spec), Some(source)) => Some(self.thumbnail_branch(spec, &source, layout, &mut graph)?),
            (Some(_), None) => {
                return Err(Error::Internal("thumbnail branch has no video source".into()))
            }
            (None, _) => None,
        };

        let subtitles = match request.subtitles {
            Some(spec) => self.subtitle_branches(spec, media, layout, &mut feed)?,
            None => Vec::new(),
        };

        let plan = JobPlan {
            input: media.path.clone(),
            input_options,
            filter_graph: graph.entries,
            outputs,
            thumbnails,
            subtitles,
            total_frames,
        };

        if plan.branch_count() == 0 {
            return Err(Error::validation("job plan has no outputs"));
        }

        tracing::debug!(
            input = %plan.input.display(),
            outputs = plan.outputs.len(),
            subtitles = plan.subtitles.len(),
            thumbnails = plan.thumbnails.is_some(),
            total_frames = plan.total_frames,
            "Built job plan"
        );
        Ok(plan)
    }

    fn thumbnail_branch(
        &self,
        spec: &ThumbnailSpec,
        source: &str,
        layout: &OutputLayout,
        graph: &mut Graph,
    ) -> Result<ThumbnailBranch> {
        let fps = self.required_filter("fps")?;
        let scale = self.required_filter("scale")?;
        let dimension = |d: Option<u32>| d.map_or_else(|| "-1".to_string(), |d| d.to_string());
        graph.push(FilterEntry::new(
            [source],
            format!(
                "{fps}={},{scale}={}:{}",
                spec.delay,
                dimension(spec.width),
                dimension(spec.height)
            ),
            ["thumbs"],
        ));

        let frame_dir = layout.frame_dir();
        Ok(ThumbnailBranch {
            spec: OutputSpec {
                file: frame_pattern(&frame_dir, &spec.extension),
                maps: vec!["[thumbs]".to_string()],
                options: vec!["-c:v".to_string(), self.encoder(&spec.encoder)?.to_string()],
                format: spec.format.clone(),
            },
            sheet: layout.sheet_file(&spec.extension),
            frame_dir,
            columns: spec.columns(),
            delay: spec.delay.clone(),
        })
    }

    fn subtitle_branches(
        &self,
        spec: &SubtitlePreset,
        media: &MediaDescriptor,
        layout: &OutputLayout,
        feed: &mut impl FnMut(&Track),
    ) -> Result<Vec<SubtitleBranch>> {
        let (Some(format), Some(extension)) = (&spec.format, &spec.extension) else {
            return Err(Error::validation(
                "subtitle extraction needs both a format and an extension",
            ));
        };
        let encoder = self.encoder(&spec.encoder)?;

        let mut branches = Vec::new();
        for track in media
            .subtitle
            .iter()
            .filter(|t| !t.is_image_subtitle())
            .filter_map(|t| self.usable(t))
        {
            feed(track);
            let file = layout.subtitle_file(track.index, extension);
            branches.push(SubtitleBranch {
                spec: OutputSpec {
                    file: file.clone(),
                    maps: vec![track.map_specifier()],
                    options: vec![
                        "-c:s".to_string(),
                        encoder.to_string(),
                        "-an".to_string(),
                        "-vn".to_string(),
                    ],
                    format: format.clone(),
                },
                track_index: track.index,
                info: self.subtitle_info(track, file),
            });
        }
        Ok(branches)
    }

    fn subtitle_info(&self, track: &Track, file: PathBuf) -> SubtitleTrackInfo {
        let language = track.language.as_deref().and_then(|code| self.languages.lookup(code));
        let label = track
            .title
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| language.map(|l| l.name.to_string()))
            .unwrap_or_else(|| UNNAMED_SUBTITLE.to_string());

        SubtitleTrackInfo {
            label,
            language: language.map(|l| l.code_639_2.to_string()),
            language_639_1: language.map(|l| l.code_639_1.to_string()),
            language_name: language.map(|l| l.name.to_string()),
            is_default: track.disposition.default,
            is_forced: track.disposition.forced,
            file,
            size: None,
        }
    }
}

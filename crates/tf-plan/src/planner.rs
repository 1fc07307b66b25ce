//! Preset planning.
//!
//! Resolves each [`PresetSpec`] against the selected tracks into a
//! [`PlannedOutput`] with concrete geometry and bitrates. Presets the source
//! cannot fill are skipped; when none remain the default preset is used at
//! the source's own dimensions, so the result is never empty.

use serde::{Deserialize, Serialize};
use tf_core::{Error, PresetSpec, Result, SubtitlePreset, ThumbnailSpec, Track, VideoPreset};

use crate::selector::SelectedTracks;

/// Video section of a planned output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedVideo {
    pub track: Track,
    pub width: u32,
    pub height: u32,
    pub bitrate: u64,
    pub max_bitrate: u64,
    /// Codec key, resolved through the capability profile at build time.
    pub encoder: String,
    pub preset: Option<String>,
    /// Image subtitle overlaid on the video before scaling.
    pub burn_in: Option<Track>,
}

/// Audio section of a planned output. The selected track comes first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedAudio {
    pub tracks: Vec<Track>,
    pub bitrate: u64,
    pub channels: Option<u32>,
    pub encoder: String,
}

/// Subtitle section of a planned output. Holds every text subtitle track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedSubtitle {
    pub tracks: Vec<Track>,
    pub spec: SubtitlePreset,
}

/// Thumbnail section of a planned output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedThumbnails {
    pub track: Track,
    pub spec: ThumbnailSpec,
}

/// A preset resolved against one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedOutput {
    pub name: String,
    pub format: String,
    pub extension: String,
    pub video: Option<PlannedVideo>,
    pub audio: Option<PlannedAudio>,
    pub subtitle: Option<PlannedSubtitle>,
    pub thumbnails: Option<PlannedThumbnails>,
}

impl PlannedOutput {
    /// Video plus audio bitrate, used to order outputs.
    pub fn combined_bitrate(&self) -> u64 {
        self.video.as_ref().map_or(0, |v| v.bitrate) + self.audio.as_ref().map_or(0, |a| a.bitrate)
    }
}

/// The source bitrate when it is known and strictly below the preset's,
/// otherwise the preset's.
pub fn effective_bitrate(source: Option<u64>, preset: u64) -> u64 {
    match source {
        Some(bits) if bits > 0 && bits < preset => bits,
        _ => preset,
    }
}

/// The single preset marked `is_default`.
pub fn default_preset(presets: &[PresetSpec]) -> Result<&PresetSpec> {
    let mut defaults = presets.iter().filter(|p| p.is_default);
    match (defaults.next(), defaults.next()) {
        (Some(preset), None) => Ok(preset),
        (None, _) => Err(Error::validation("no preset is marked as default")),
        (Some(_), Some(_)) => Err(Error::validation("more than one preset is marked as default")),
    }
}

fn round_even(value: f64) -> u32 {
    let rounded = value.round() as u32;
    rounded + rounded % 2
}

/// Target geometry for `source` under a preset floor, or `None` when the
/// source is smaller than the floor in both dimensions.
fn scaled_geometry(source: (u32, u32), floor: (u32, u32)) -> Option<(u32, u32)> {
    let (src_w, src_h) = source;
    let (preset_w, preset_h) = floor;
    if src_w == 0 || src_h == 0 {
        return None;
    }
    if src_h >= preset_h {
        let width = round_even(src_w as f64 * preset_h as f64 / src_h as f64);
        Some((width, preset_h))
    } else if src_w >= preset_w {
        let height = round_even(src_h as f64 * preset_w as f64 / src_w as f64);
        Some((preset_w, height))
    } else {
        None
    }
}

fn source_dimensions(track: &Track) -> (u32, u32) {
    (track.width.unwrap_or(0), track.height.unwrap_or(0))
}

fn planned_video(
    spec: &VideoPreset,
    selection: &SelectedTracks,
    source: &Track,
    (width, height): (u32, u32),
) -> PlannedVideo {
    let bitrate = effective_bitrate(source.known_bitrate(), spec.bitrate);
    PlannedVideo {
        track: source.clone(),
        width,
        height,
        bitrate,
        max_bitrate: spec.max_bitrate.unwrap_or(bitrate),
        encoder: spec.encoder.clone(),
        preset: spec.preset.clone(),
        burn_in: selection
            .subtitle
            .as_ref()
            .filter(|s| s.is_image_subtitle())
            .cloned(),
    }
}

/// Fill the non-video sections of `preset` from the selection.
fn resolve_sections(
    preset: &PresetSpec,
    selection: &SelectedTracks,
    audio_pool: &[Track],
    subtitle_pool: &[Track],
) -> Result<PlannedOutput> {
    let audio = preset.audio.as_ref().map(|spec| {
        let mut tracks = vec![selection.audio.clone()];
        if spec.all_tracks {
            tracks.extend(
                audio_pool
                    .iter()
                    .filter(|t| t.index != selection.audio.index)
                    .cloned(),
            );
        }
        PlannedAudio {
            bitrate: effective_bitrate(selection.audio.known_bitrate(), spec.bitrate),
            tracks,
            channels: spec.channels,
            encoder: spec.encoder.clone(),
        }
    });

    // Bitmap subtitles can neither be muxed next to text nor extracted as
    // text; they only reach an output through burn-in.
    let subtitle = preset.subtitle.as_ref().map(|spec| PlannedSubtitle {
        tracks: subtitle_pool
            .iter()
            .filter(|t| !t.is_image_subtitle())
            .cloned()
            .collect(),
        spec: spec.clone(),
    });

    let thumbnails = match (&preset.thumbnails, &selection.video) {
        (None, _) => None,
        (Some(spec), Some(track)) => Some(PlannedThumbnails {
            track: track.clone(),
            spec: spec.clone(),
        }),
        (Some(_), None) => {
            return Err(Error::validation(format!(
                "preset '{}' requests thumbnails but no video track is selected",
                preset.name
            )))
        }
    };

    Ok(PlannedOutput {
        name: preset.name.clone(),
        format: preset.format.clone(),
        extension: preset.extension.clone(),
        video: None,
        audio,
        subtitle,
        thumbnails,
    })
}

/// Resolve `presets` against `selection`.
///
/// `audio_pool` and `subtitle_pool` are the source's full audio and subtitle
/// buckets, used by presets that keep every track.
pub fn plan(
    selection: &SelectedTracks,
    audio_pool: &[Track],
    subtitle_pool: &[Track],
    presets: &[PresetSpec],
    default: &PresetSpec,
) -> Result<Vec<PlannedOutput>> {
    let mut planned = Vec::with_capacity(presets.len());

    for preset in presets {
        let mut output = resolve_sections(preset, selection, audio_pool, subtitle_pool)?;

        if let Some(spec) = &preset.video {
            let source = selection.video.as_ref().ok_or_else(|| {
                Error::validation(format!(
                    "preset '{}' requests video but no video track is selected",
                    preset.name
                ))
            })?;

            let Some(geometry) =
                scaled_geometry(source_dimensions(source), (spec.width, spec.height))
            else {
                tracing::debug!(
                    preset = %preset.name,
                    source = ?source_dimensions(source),
                    "Source smaller than preset; skipping"
                );
                continue;
            };

            output.video = Some(planned_video(spec, selection, source, geometry));
        }

        planned.push(output);
    }

    if planned.is_empty() {
        tracing::info!(preset = %default.name, "No preset fits the source; using default at native size");
        let mut output = resolve_sections(default, selection, audio_pool, subtitle_pool)?;
        if let (Some(spec), Some(source)) = (&default.video, &selection.video) {
            output.video = Some(planned_video(spec, selection, source, source_dimensions(source)));
        } else if default.video.is_some() {
            return Err(Error::validation(
                "default preset requests video but no video track is selected",
            ));
        }
        planned.push(output);
    }

    Ok(planned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tf_core::{AudioPreset, TrackKind};

    fn video_preset(name: &str, width: u32, height: u32, bitrate: u64) -> PresetSpec {
        PresetSpec {
            name: name.into(),
            is_default: false,
            format: "mp4".into(),
            extension: "mp4".into(),
            video: Some(VideoPreset {
                width,
                height,
                bitrate,
                max_bitrate: None,
                encoder: "h264".into(),
                preset: None,
            }),
            audio: Some(AudioPreset {
                bitrate: 128_000,
                channels: Some(2),
                encoder: "aac".into(),
                all_tracks: false,
            }),
            subtitle: None,
            thumbnails: None,
        }
    }

    fn selection(width: u32, height: u32) -> SelectedTracks {
        SelectedTracks {
            audio: Track::new(1, TrackKind::Audio, "aac").with_bitrate(96_000),
            video: Some(
                Track::new(0, TrackKind::Video, "h264")
                    .with_dimensions(width, height)
                    .with_bitrate(8_000_000),
            ),
            subtitle: None,
        }
    }

    fn run(selection: &SelectedTracks, presets: &[PresetSpec], default: &PresetSpec) -> Vec<PlannedOutput> {
        plan(selection, &[selection.audio.clone()], &[], presets, default).unwrap()
    }

    #[test]
    fn bitrate_rule() {
        assert_eq!(effective_bitrate(None, 1000), 1000);
        assert_eq!(effective_bitrate(Some(0), 1000), 1000);
        assert_eq!(effective_bitrate(Some(999), 1000), 999);
        assert_eq!(effective_bitrate(Some(1000), 1000), 1000);
        assert_eq!(effective_bitrate(Some(5000), 1000), 1000);
    }

    #[test]
    fn height_floor_scales_width_evenly() {
        // 1920x800 scope source into a 720p preset: 1728 is already even.
        let presets = [video_preset("720p", 1280, 720, 2_500_000)];
        let out = run(&selection(1920, 800), &presets, &presets[0]);
        let video = out[0].video.as_ref().unwrap();
        assert_eq!((video.width, video.height), (1728, 720));

        // 1440x1080 into 480p gives 640. 1000x750 gives 640 as well.
        let presets = [video_preset("480p", 854, 480, 1_000_000)];
        let out = run(&selection(1000, 750), &presets, &presets[0]);
        assert_eq!(out[0].video.as_ref().unwrap().width, 640);
    }

    #[test]
    fn odd_width_is_nudged_up() {
        // 1000 * 480 / 704 = 681.8 -> 682. 1001 * 480 / 704 = 682.5 -> 683 -> 684.
        let presets = [video_preset("480p", 854, 480, 1_000_000)];
        let out = run(&selection(1001, 704), &presets, &presets[0]);
        let video = out[0].video.as_ref().unwrap();
        assert_eq!(video.width, 684);
        assert_eq!(video.width % 2, 0);
    }

    #[test]
    fn width_floor_scales_height() {
        // Wide but short source: below the height floor, above the width floor.
        let presets = [video_preset("720p", 1280, 720, 2_500_000)];
        let out = run(&selection(2560, 700), &presets, &presets[0]);
        let video = out[0].video.as_ref().unwrap();
        assert_eq!((video.width, video.height), (1280, 350));
    }

    #[test]
    fn small_source_falls_back_to_default_at_native_size() {
        let mut default = video_preset("sd", 640, 360, 800_000);
        default.is_default = true;
        let presets = [video_preset("720p", 1280, 720, 2_500_000)];
        let selection = selection(854, 480);

        let out = run(&selection, &presets, &default);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "sd");
        let video = out[0].video.as_ref().unwrap();
        assert_eq!((video.width, video.height), (854, 480));
        assert_eq!(video.bitrate, 800_000);
    }

    #[test]
    fn ineligible_presets_are_skipped() {
        let presets = [
            video_preset("480p", 854, 480, 1_000_000),
            video_preset("2160p", 3840, 2160, 20_000_000),
            video_preset("720p", 1280, 720, 2_500_000),
        ];
        let out = run(&selection(1920, 1080), &presets, &presets[0]);
        let names: Vec<&str> = out.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["480p", "720p"]);
    }

    #[test]
    fn source_bitrate_below_ceiling_is_kept() {
        let presets = [video_preset("1080p", 1920, 1080, 10_000_000)];
        let out = run(&selection(1920, 1080), &presets, &presets[0]);
        let video = out[0].video.as_ref().unwrap();
        assert_eq!(video.bitrate, 8_000_000);
        assert_eq!(video.max_bitrate, 8_000_000);
        assert_eq!(out[0].audio.as_ref().unwrap().bitrate, 96_000);
    }

    #[test]
    fn audio_only_preset_is_always_eligible() {
        let mut audio_only = video_preset("audio", 0, 0, 0);
        audio_only.video = None;
        audio_only.extension = "m4a".into();
        let mut selection = selection(0, 0);
        selection.video = None;

        let out = run(&selection, &[audio_only.clone()], &audio_only);
        assert_eq!(out.len(), 1);
        assert!(out[0].video.is_none());
        assert_eq!(out[0].audio.as_ref().unwrap().tracks[0].index, 1);
    }

    #[test]
    fn video_preset_without_video_is_error() {
        let presets = [video_preset("720p", 1280, 720, 2_500_000)];
        let mut selection = selection(1920, 1080);
        selection.video = None;
        let err = plan(&selection, &[], &[], &presets, &presets[0]).unwrap_err();
        assert_matches!(err, Error::Validation(_));
    }

    #[test]
    fn all_tracks_keeps_selected_first() {
        let mut preset = video_preset("720p", 1280, 720, 2_500_000);
        if let Some(audio) = preset.audio.as_mut() {
            audio.all_tracks = true;
        }
        let pool = vec![
            Track::new(1, TrackKind::Audio, "aac"),
            Track::new(2, TrackKind::Audio, "ac3"),
            Track::new(3, TrackKind::Audio, "dts"),
        ];
        let mut selection = selection(1280, 720);
        selection.audio = pool[1].clone();

        let out = plan(&selection, &pool, &[], std::slice::from_ref(&preset), &preset).unwrap();
        let order: Vec<u32> = out[0].audio.as_ref().unwrap().tracks.iter().map(|t| t.index).collect();
        assert_eq!(order, vec![2, 1, 3]);
    }

    #[test]
    fn default_preset_must_be_unique() {
        let mut a = video_preset("a", 1, 1, 1);
        let mut b = video_preset("b", 1, 1, 1);
        assert_matches!(default_preset(&[a.clone(), b.clone()]), Err(Error::Validation(_)));

        a.is_default = true;
        assert_eq!(default_preset(&[a.clone(), b.clone()]).unwrap().name, "a");

        b.is_default = true;
        assert_matches!(default_preset(&[a, b]), Err(Error::Validation(_)));
    }

    #[test]
    fn image_subtitle_rides_on_the_video_section() {
        let presets = [video_preset("720p", 1280, 720, 2_500_000)];
        let mut selection = selection(1920, 1080);
        selection.subtitle = Some(Track::new(2, TrackKind::Subtitle, "hdmv_pgs_subtitle"));
        let out = run(&selection, &presets, &presets[0]);
        let burn_in = out[0].video.as_ref().unwrap().burn_in.as_ref().map(|t| t.index);
        assert_eq!(burn_in, Some(2));

        selection.subtitle = Some(Track::new(3, TrackKind::Subtitle, "subrip"));
        let out = run(&selection, &presets, &presets[0]);
        assert!(out[0].video.as_ref().unwrap().burn_in.is_none());
    }

    #[test]
    fn combined_bitrate_sums_sections() {
        let presets = [video_preset("720p", 1280, 720, 2_500_000)];
        let out = run(&selection(1280, 720), &presets, &presets[0]);
        assert_eq!(out[0].combined_bitrate(), 2_500_000 + 96_000);
    }
}

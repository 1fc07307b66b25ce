//! End-to-end planning through the [`Transcoder`] façade.
//!
//! These tests stop short of running anything: they probe through the fake
//! engine and inspect the selection, gate outcome and built job plan.

mod common;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use assert_matches::assert_matches;
use common::{full_config, movie, transcoder, video_preset, FakeCompositor, FakeEngine};
use tf_av::FfmpegEngine;
use tf_core::config::Config;
use tf_core::{Error, MediaDescriptor, Resolution, Track, TrackKind};
use tf_plan::OutputLayout;

fn layout() -> OutputLayout {
    OutputLayout::new("/out", "movie")
}

fn fake(media: MediaDescriptor) -> Arc<FakeEngine> {
    Arc::new(FakeEngine::new(media))
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bilingual_source_features_english_audio_and_forced_subtitle() {
    let source = Path::new("/in/bilingual.mkv");
    let media = MediaDescriptor::from_tracks(
        source,
        vec![
            Track::new(0, TrackKind::Video, "h264").with_dimensions(1920, 1080),
            Track::new(1, TrackKind::Audio, "aac").with_language("rus").with_default(),
            Track::new(2, TrackKind::Audio, "aac").with_language("eng"),
            Track::new(3, TrackKind::Subtitle, "subrip")
                .with_language("eng")
                .with_frame_count(10),
            Track::new(4, TrackKind::Subtitle, "subrip")
                .with_language("eng")
                .with_frame_count(1200),
            Track::new(5, TrackKind::Subtitle, "subrip")
                .with_language("rus")
                .with_frame_count(1300),
        ],
    );
    let tc = transcoder(Config::default(), fake(media), Arc::new(FakeCompositor::default()));

    let prepared = tc.prepare(source).await.unwrap();
    assert_eq!(prepared.selection.audio.index, 2);
    assert_eq!(prepared.selection.subtitle.as_ref().map(|t| t.index), Some(3));
    assert_eq!(prepared.selection.video.as_ref().map(|t| t.index), Some(0));
}

#[tokio::test]
async fn foreign_audio_gets_full_english_subtitle() {
    let source = Path::new("/in/foreign.mkv");
    let media = MediaDescriptor::from_tracks(
        source,
        vec![
            Track::new(0, TrackKind::Video, "h264").with_dimensions(1280, 720),
            Track::new(1, TrackKind::Audio, "aac").with_language("jpn"),
            Track::new(2, TrackKind::Subtitle, "subrip")
                .with_language("eng")
                .with_title("Signs & Songs (Forced)"),
            Track::new(3, TrackKind::Subtitle, "subrip")
                .with_language("eng")
                .with_frame_count(1500),
        ],
    );
    let tc = transcoder(Config::default(), fake(media), Arc::new(FakeCompositor::default()));

    let prepared = tc.prepare(source).await.unwrap();
    assert_eq!(prepared.selection.audio.index, 1);
    assert_eq!(prepared.selection.subtitle.map(|t| t.index), Some(3));
}

#[tokio::test]
async fn source_without_audio_is_rejected_before_planning() {
    let source = Path::new("/in/silent.mkv");
    let media = MediaDescriptor::from_tracks(
        source,
        vec![Track::new(0, TrackKind::Video, "h264").with_dimensions(1920, 1080)],
    );
    let engine = fake(media);
    let tc = transcoder(Config::default(), engine.clone(), Arc::new(FakeCompositor::default()));

    let err = tc.prepare(source).await.unwrap_err();
    assert_matches!(err, Error::Validation(msg) if msg.contains("no audio"));
    assert_eq!(engine.runs(), 0);
}

// ---------------------------------------------------------------------------
// Planning and gating
// ---------------------------------------------------------------------------

#[tokio::test]
async fn default_presets_produce_one_output_each_highest_bitrate_first() {
    let source = Path::new("/in/movie.mkv");
    let tc = transcoder(Config::default(), fake(movie(source)), Arc::new(FakeCompositor::default()));

    let prepared = tc.prepare(source).await.unwrap();
    assert!(prepared.rejected.is_empty());
    let plan = tc.build(&prepared, &layout()).unwrap();

    let names: Vec<&str> = plan.outputs.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, ["1080p", "720p", "480p"]);
    assert_eq!(
        plan.outputs.iter().map(|o| o.resolution).collect::<Vec<_>>(),
        [
            Some(Resolution::new(1920, 1080)),
            Some(Resolution::new(1280, 720)),
            Some(Resolution::new(854, 480)),
        ]
    );
    assert_eq!(plan.outputs[1].spec.file, PathBuf::from("/out/movie.720p.mp4"));
    assert_eq!(
        plan.filter_complex().unwrap(),
        "[0:0]split=3[vsrc0][vsrc1][vsrc2];\
         [vsrc0]scale=1920:1080[vout0];\
         [vsrc1]scale=1280:720[vout1];\
         [vsrc2]scale=854:480[vout2]"
    );
    assert_eq!(plan.total_frames, 4700);
    assert!(plan.thumbnails.is_none());
    assert!(plan.subtitles.is_empty());
}

#[tokio::test]
async fn small_source_falls_back_to_default_preset_at_native_size() {
    let source = Path::new("/in/small.mkv");
    let media = MediaDescriptor::from_tracks(
        source,
        vec![
            Track::new(0, TrackKind::Video, "h264").with_dimensions(640, 360),
            Track::new(1, TrackKind::Audio, "aac").with_language("eng"),
        ],
    );
    let tc = transcoder(Config::default(), fake(media), Arc::new(FakeCompositor::default()));

    let prepared = tc.prepare(source).await.unwrap();
    assert_eq!(prepared.accepted.len(), 1);
    assert_eq!(prepared.accepted[0].name, "480p");

    let plan = tc.build(&prepared, &layout()).unwrap();
    assert_eq!(plan.outputs.len(), 1);
    assert_eq!(plan.outputs[0].resolution, Some(Resolution::new(640, 360)));
    assert_eq!(plan.outputs[0].spec.maps, ["[vout0]", "0:1"]);
}

#[tokio::test]
async fn presets_without_an_encoder_are_rejected_by_name() {
    let source = Path::new("/in/movie.mkv");
    let mut config = Config::default();
    let mut hevc = video_preset("1080p-hevc", 1920, 1080, 4_000_000);
    hevc.video.as_mut().unwrap().encoder = "hevc".into();
    config.presets.push(hevc);
    let tc = transcoder(config, fake(movie(source)), Arc::new(FakeCompositor::default()));

    let prepared = tc.prepare(source).await.unwrap();
    assert_eq!(prepared.rejected, ["1080p-hevc"]);
    assert!(prepared.accepted.iter().all(|o| o.name != "1080p-hevc"));
    assert_eq!(prepared.accepted.len(), 3);
}

#[tokio::test]
async fn nothing_producible_is_a_validation_error() {
    let source = Path::new("/in/movie.mkv");
    let mut config = Config::default();
    config.capabilities.encoders.remove("aac");
    let engine = fake(movie(source));
    let tc = transcoder(config, engine.clone(), Arc::new(FakeCompositor::default()));

    let err = tc.prepare(source).await.unwrap_err();
    assert_matches!(err, Error::Validation(msg) if msg.contains("capabilities"));
    assert_eq!(engine.runs(), 0);
}

#[tokio::test]
async fn thumbnails_and_extraction_join_the_single_run() {
    let source = Path::new("/in/movie.mkv");
    let tc = transcoder(full_config(), fake(movie(source)), Arc::new(FakeCompositor::default()));

    let prepared = tc.prepare(source).await.unwrap();
    let plan = tc.build(&prepared, &layout()).unwrap();

    assert_eq!(plan.outputs.len(), 4);
    assert_eq!(plan.branch_count(), 7);

    let graph = plan.filter_complex().unwrap();
    assert!(graph.starts_with("[0:0]split=2[main0][main1];[main0]split=4"));
    assert!(graph.ends_with("[main1]fps=1/10,scale=160:-1[thumbs]"));

    let thumbs = plan.thumbnails.as_ref().unwrap();
    assert_eq!(thumbs.columns, 4);
    assert_eq!(thumbs.frame_dir, PathBuf::from("/out/thumbs"));
    assert_eq!(thumbs.spec.file, PathBuf::from("/out/thumbs/%05d.jpg"));
    assert_eq!(thumbs.sheet, PathBuf::from("/out/movie.thumbs.jpg"));

    let labels: Vec<&str> = plan.subtitles.iter().map(|s| s.info.label.as_str()).collect();
    assert_eq!(labels, ["English", "Français"]);
    assert_eq!(plan.subtitles[0].spec.file, PathBuf::from("/out/movie.2.vtt"));
    assert_eq!(plan.subtitles[1].info.language.as_deref(), Some("fre"));
}

#[tokio::test]
async fn ffmpeg_command_line_reports_progress_on_stderr() {
    let source = Path::new("/in/movie.mkv");
    let tc = transcoder(Config::default(), fake(movie(source)), Arc::new(FakeCompositor::default()));

    let prepared = tc.prepare(source).await.unwrap();
    let plan = tc.build(&prepared, &layout()).unwrap();
    let args = FfmpegEngine::command_args(&plan);

    assert_eq!(&args[..6], ["-hide_banner", "-nostats", "-progress", "pipe:2", "-y", "-i"]);
    assert_eq!(args[6], "/in/movie.mkv");
    let outputs = args.iter().filter(|a| a.starts_with("/out/")).count();
    assert_eq!(outputs, 3);
    assert_eq!(args.last().map(String::as_str), Some("/out/movie.480p.mp4"));
}

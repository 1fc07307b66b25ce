//! Benchmarks for job planning
//!
//! Measures the pure stages between probe and spawn: track selection,
//! preset planning, capability gating and job building.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tf_core::config::{Config, SelectionConfig};
use tf_core::{
    AudioPreset, CapabilityProfile, MediaDescriptor, PresetSpec, SubtitlePreset, ThumbnailSpec,
    Track, TrackKind, VideoPreset,
};
use tf_plan::{default_preset, gate, plan, BuildRequest, JobBuilder, OutputLayout, TrackSelector};

/// 4K source with six audio and twelve subtitle tracks.
fn busy_source() -> MediaDescriptor {
    let mut tracks = vec![Track::new(0, TrackKind::Video, "hevc")
        .with_dimensions(3840, 2160)
        .with_bitrate(40_000_000)
        .with_frame_count(172_800)
        .with_duration(7200.0)];

    let languages = ["jpn", "eng", "fre", "ger", "spa", "ita"];
    for (i, lang) in languages.iter().enumerate() {
        tracks.push(
            Track::new(1 + i as u32, TrackKind::Audio, "truehd")
                .with_language(*lang)
                .with_channels(8)
                .with_frame_count(337_500),
        );
    }
    for (i, lang) in languages.iter().cycle().take(12).enumerate() {
        let codec = if i % 3 == 2 { "hdmv_pgs_subtitle" } else { "subrip" };
        let mut track = Track::new(7 + i as u32, TrackKind::Subtitle, codec)
            .with_language(*lang)
            .with_frame_count(if i < 6 { 1200 } else { 30 });
        if i >= 6 {
            track = track.with_title("Forced");
        }
        tracks.push(track);
    }

    MediaDescriptor::from_tracks("/movies/busy.mkv", tracks)
}

fn ladder(rungs: usize) -> Vec<PresetSpec> {
    let sizes = [(854, 480), (1280, 720), (1920, 1080), (2560, 1440), (3840, 2160)];
    (0..rungs)
        .map(|i| {
            let (width, height) = sizes[i % sizes.len()];
            PresetSpec {
                name: format!("rung{i}"),
                is_default: i == 0,
                format: "mp4".into(),
                extension: "mp4".into(),
                video: Some(VideoPreset {
                    width,
                    height,
                    bitrate: 1_000_000 * (i as u64 + 1),
                    max_bitrate: None,
                    encoder: "h264".into(),
                    preset: None,
                }),
                audio: Some(AudioPreset {
                    bitrate: 128_000,
                    channels: Some(2),
                    encoder: "aac".into(),
                    all_tracks: i == 0,
                }),
                subtitle: (i == 0).then(|| SubtitlePreset {
                    encoder: "webvtt".into(),
                    format: Some("webvtt".into()),
                    extension: Some("vtt".into()),
                }),
                thumbnails: (i == 0).then(ThumbnailSpec::default),
            }
        })
        .collect()
}

fn bench_selection(c: &mut Criterion) {
    let media = busy_source();
    let selector = TrackSelector::from_config(&SelectionConfig::default()).unwrap();

    c.bench_function("select/busy_source", |b| {
        b.iter(|| selector.select(black_box(&media), true).unwrap());
    });
}

fn bench_full_planning(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_gate_build");

    let media = busy_source();
    let selector = TrackSelector::from_config(&SelectionConfig::default()).unwrap();
    let profile = CapabilityProfile::default();
    let layout = OutputLayout::new("/out", "busy");

    for rungs in [1, 3, 10] {
        let presets = ladder(rungs);
        group.bench_with_input(BenchmarkId::from_parameter(rungs), &presets, |b, presets| {
            b.iter(|| {
                let selection = selector.select(&media, true).unwrap();
                let default = default_preset(presets).unwrap();
                let planned = plan(&selection, &media.audio, &media.subtitle, presets, default).unwrap();
                let outcome = gate::filter(planned, &profile);
                let request = BuildRequest::new(&media, &selection, &outcome.accepted, &layout);
                JobBuilder::new(&profile).build(black_box(&request)).unwrap()
            });
        });
    }

    group.finish();
}

fn bench_render_args(c: &mut Criterion) {
    let config = Config::default();
    let media = busy_source();
    let selector = TrackSelector::from_config(&config.selection).unwrap();
    let selection = selector.select(&media, true).unwrap();
    let presets = ladder(5);
    let default = default_preset(&presets).unwrap();
    let planned = plan(&selection, &media.audio, &media.subtitle, &presets, default).unwrap();
    let outcome = gate::filter(planned, &config.capabilities);
    let layout = OutputLayout::new("/out", "busy");
    let job = JobBuilder::new(&config.capabilities)
        .build(&BuildRequest::new(&media, &selection, &outcome.accepted, &layout))
        .unwrap();

    c.bench_function("render_args/5_outputs", |b| {
        b.iter(|| black_box(&job).to_args());
    });
}

criterion_group!(benches, bench_selection, bench_full_planning, bench_render_args);
criterion_main!(benches);

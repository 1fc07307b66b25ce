mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use tf_av::{Compositor, FfmpegEngine, FfprobeProber, MontageCompositor, ToolRegistry};
use tf_core::config::Config;
use tf_core::events::{EventPayload, JobEvent};
use tf_core::MediaDescriptor;
use tf_pipeline::ProcessRegistry;
use tokio::sync::mpsc;
use transforged::transcoder::layout_for;
use transforged::Transcoder;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise the verbose flag picks the level.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "transforged=trace,tf_pipeline=trace,tf_av=debug,tf_plan=debug,tf_core=debug".to_string()
        } else {
            "transforged=info,tf_pipeline=info,tf_av=info,tf_plan=info,tf_core=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Probe { file, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_file(&file, json, config_path))
        }
        Commands::Plan {
            file,
            output_dir,
            args,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(plan_file(&file, &output_dir, args, config_path))
        }
        Commands::Run {
            file,
            output_dir,
            json,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_file(&file, &output_dir, json, config_path))
        }
        Commands::CheckTools => check_tools(config_path),
        Commands::Validate { file } => validate_config(file.as_deref().or(config_path)),
        Commands::Version => {
            println!("transforged {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn build_transcoder(config: Config) -> Result<Transcoder> {
    let tools = ToolRegistry::discover(&config.tools);
    let engine = FfmpegEngine::from_registry(&tools)?;
    let compositor: Arc<dyn Compositor> = match MontageCompositor::from_registry(&tools) {
        Ok(compositor) => Arc::new(compositor),
        Err(e) => {
            tracing::warn!("{e}; thumbnail sheets will not be composed");
            Arc::new(MontageCompositor::new("montage".into(), "identify".into()))
        }
    };
    Ok(Transcoder::new(config, Arc::new(engine), compositor)?)
}

async fn probe_file(file: &Path, json: bool, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(config_path);
    let tools = ToolRegistry::discover(&config.tools);
    let ffprobe = tools.require("ffprobe")?;
    let media = FfprobeProber::new(ffprobe.path.clone()).probe(file).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&media)?);
    } else {
        print_media(&media);
    }
    Ok(())
}

fn print_media(media: &MediaDescriptor) {
    println!("File: {}", media.path.display());
    if let Some(duration) = media.video_duration() {
        let secs = duration as u64;
        println!("Duration: {:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60);
    }

    for (label, tracks) in [
        ("Video", &media.video),
        ("Audio", &media.audio),
        ("Subtitle", &media.subtitle),
    ] {
        println!("\n{label} Tracks: {}", tracks.len());
        for track in tracks {
            print!("  [{}] {}", track.index, track.codec_name);
            if let (Some(w), Some(h)) = (track.width, track.height) {
                print!(" {w}x{h}");
            }
            if let Some(channels) = track.channels {
                print!(" {channels}ch");
            }
            if let Some(ref lang) = track.language {
                print!(" ({lang})");
            }
            if let Some(ref title) = track.title {
                print!(" \"{title}\"");
            }
            if let Some(frames) = track.frame_count {
                print!(", {frames} frames");
            }
            if track.disposition.forced {
                print!(" [forced]");
            }
            if track.disposition.default {
                print!(" [default]");
            }
            println!();
        }
    }
}

async fn plan_file(file: &Path, output_dir: &Path, show_args: bool, config_path: Option<&Path>) -> Result<()> {
    let transcoder = build_transcoder(Config::load_or_default(config_path))?;
    let prepared = transcoder.prepare(file).await?;
    let plan = transcoder.build(&prepared, &layout_for(file, output_dir)?)?;

    println!("Source: {}", file.display());
    println!("Audio: stream {}", prepared.selection.audio.index);
    match &prepared.selection.subtitle {
        Some(sub) => println!("Subtitle: stream {} ({})", sub.index, sub.codec_name),
        None => println!("Subtitle: none"),
    }
    if let Some(video) = &prepared.selection.video {
        println!("Video: stream {} ({})", video.index, video.codec_name);
    }
    if !prepared.rejected.is_empty() {
        println!("Rejected presets: {}", prepared.rejected.join(", "));
    }

    println!("\nOutputs:");
    for output in &plan.outputs {
        match output.resolution {
            Some(res) => println!("  {} {} -> {}", output.name, res, output.spec.file.display()),
            None => println!("  {} (audio) -> {}", output.name, output.spec.file.display()),
        }
    }
    for subtitle in &plan.subtitles {
        println!("  subtitle \"{}\" -> {}", subtitle.info.label, subtitle.spec.file.display());
    }
    if let Some(thumbs) = &plan.thumbnails {
        println!("  thumbnails every {} -> {}", thumbs.delay, thumbs.sheet.display());
    }
    println!("Total frames: {}", plan.total_frames);

    if show_args {
        println!("\nffmpeg {}", FfmpegEngine::command_args(&plan).join(" "));
    }
    Ok(())
}

async fn run_file(file: &Path, output_dir: &Path, json: bool, config_path: Option<&Path>) -> Result<()> {
    let registry = ProcessRegistry::new();
    let transcoder = build_transcoder(Config::load_or_default(config_path))?.with_registry(registry.clone());
    let mut handle = transcoder
        .transcode(file, output_dir, serde_json::Value::Null)
        .await?;

    let printer = handle.events().map(|events| tokio::spawn(print_progress(events)));

    let shutdown = registry.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; terminating running jobs");
            shutdown.terminate_all();
        }
    });

    let outcome = handle.wait().await;
    ctrl_c.abort();
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    let result = outcome?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("\nTranscode complete: {}", result.name);
        for output in &result.transcoded {
            println!(
                "  {} -> {} ({} bytes)",
                output.name,
                output.file.display(),
                output.size.unwrap_or(0)
            );
        }
        for subtitle in &result.subtitles {
            println!("  subtitle \"{}\" -> {}", subtitle.label, subtitle.file.display());
        }
        if let Some(sheet) = &result.thumbnails {
            println!(
                "  thumbnails {} frames of {} -> {}",
                sheet.frame_count,
                sheet.frame_size,
                sheet.file.display()
            );
        }
    }
    Ok(())
}

async fn print_progress(mut events: mpsc::Receiver<JobEvent>) {
    while let Some(event) = events.recv().await {
        match event.payload {
            EventPayload::JobStarted { name, .. } => eprintln!("Started {name}"),
            EventPayload::JobProgress { progress, .. } => {
                let percent = progress.percent().unwrap_or(0.0);
                eprint!(
                    "\r{:5.1}%  frame {}/{}  {:.1} fps  eta {:.0}s   ",
                    percent,
                    progress.snapshot.frames,
                    progress.total_frames,
                    progress.snapshot.current_fps,
                    progress.eta_secs
                );
            }
        }
    }
    eprintln!();
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = Config::load_or_default(config_path);
    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);
        if let Some(ref version) = tool.version {
            print!(" ({version})");
        }
        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }
        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. ffmpeg and ffprobe are required; montage and identify are needed for thumbnail sheets.");
    }
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            Config::load(p)?
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("✓ Configuration is valid");
    } else {
        println!("Configuration loaded with {} warning(s):", warnings.len());
        for warning in &warnings {
            println!("  - {warning}");
        }
    }
    println!("  Presets: {}", config.presets.len());
    for preset in &config.presets {
        let default = if preset.is_default { " [default]" } else { "" };
        match &preset.video {
            Some(v) => println!("    {} {}x{} .{}{default}", preset.name, v.width, v.height, preset.extension),
            None => println!("    {} (no video) .{}{default}", preset.name, preset.extension),
        }
    }
    println!("  Encoders: {}", config.capabilities.encoders.len());
    println!("  Preferred language: {}", config.selection.preferred_language);
    Ok(())
}

//! Post-run collection of the job result.
//!
//! Every step here is best-effort: a failing probe, stat or composition is
//! logged and leaves the corresponding field unset.

use futures::future::join_all;
use tf_av::{stat_size, Compositor, FrameWorkspace, SpriteLayout, TranscodeEngine};
use tf_core::{Error, JobId, OutputInfo, SpriteSheetInfo, SubtitleTrackInfo};
use tf_plan::{AvOutput, JobPlan, SubtitleBranch, ThumbnailBranch};

/// What finalization found on disk.
#[derive(Debug, Default)]
pub(crate) struct Finalized {
    pub transcoded: Vec<OutputInfo>,
    pub subtitles: Vec<SubtitleTrackInfo>,
    pub thumbnails: Option<SpriteSheetInfo>,
}

pub(crate) async fn finalize(
    job_id: JobId,
    plan: &JobPlan,
    engine: &dyn TranscodeEngine,
    compositor: &dyn Compositor,
    frames: Option<&FrameWorkspace>,
) -> Finalized {
    let outputs = join_all(plan.outputs.iter().map(|o| output_info(job_id, o, engine)));
    let subtitles = join_all(plan.subtitles.iter().map(subtitle_info));
    let sheet = async {
        match (&plan.thumbnails, frames) {
            (Some(branch), Some(frames)) => compose_sheet(job_id, branch, frames, compositor).await,
            _ => None,
        }
    };

    let (transcoded, subtitles, thumbnails) = tokio::join!(outputs, subtitles, sheet);
    Finalized {
        transcoded,
        subtitles,
        thumbnails,
    }
}

async fn output_info(job_id: JobId, output: &AvOutput, engine: &dyn TranscodeEngine) -> OutputInfo {
    let file = &output.spec.file;
    let duration = match output.duration {
        Some(d) => Some(d),
        None if output.has_video() => match engine.probe(file).await {
            Ok(media) => media.video_duration(),
            Err(e) => {
                let err = Error::finalization("duration", format!("{}: {e}", file.display()));
                tracing::warn!(%job_id, "{err}");
                None
            }
        },
        None => None,
    };

    OutputInfo {
        name: output.name.clone(),
        file: file.clone(),
        duration,
        resolution: output.resolution,
        size: stat_size(file).await,
    }
}

async fn subtitle_info(branch: &SubtitleBranch) -> SubtitleTrackInfo {
    SubtitleTrackInfo {
        size: stat_size(&branch.spec.file).await,
        ..branch.info.clone()
    }
}

async fn compose_sheet(
    job_id: JobId,
    branch: &ThumbnailBranch,
    frames: &FrameWorkspace,
    compositor: &dyn Compositor,
) -> Option<SpriteSheetInfo> {
    let files = match frames.frames() {
        Ok(files) => files,
        Err(e) => {
            tracing::warn!(%job_id, "{}", Error::finalization("thumbnails", e.to_string()));
            return None;
        }
    };

    let layout = SpriteLayout::new(branch.columns);
    match compositor.compose(&files, &layout, &branch.sheet).await {
        Ok(tile) => Some(SpriteSheetInfo {
            file: branch.sheet.clone(),
            columns: branch.columns,
            frame_count: files.len(),
            frame_size: tile,
            size: stat_size(&branch.sheet).await,
            delay: branch.delay.clone(),
        }),
        Err(e) => {
            tracing::warn!(%job_id, sheet = %branch.sheet.display(), "Sprite sheet composition failed: {e}");
            None
        }
    }
}

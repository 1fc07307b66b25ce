//! The end-to-end façade.

use std::path::Path;
use std::sync::Arc;

use tf_av::{Compositor, TranscodeEngine};
use tf_core::config::Config;
use tf_core::{Error, MediaDescriptor, Result};
use tf_pipeline::{JobHandle, JobMeta, JobSupervisor, ProcessRegistry};
use tf_plan::{
    default_preset, gate, plan, AcceptedOutput, BuildRequest, JobBuilder, JobPlan, OutputLayout,
    SelectedTracks, TrackSelector,
};

/// A probed source with its selection and the outputs that passed the gate.
#[derive(Debug, Clone)]
pub struct PreparedJob {
    pub media: MediaDescriptor,
    pub selection: SelectedTracks,
    pub accepted: Vec<AcceptedOutput>,
    /// Names of presets the capability profile cannot produce.
    pub rejected: Vec<String>,
}

/// Probe, plan and run transcodes with one configuration.
#[derive(Debug)]
pub struct Transcoder {
    config: Config,
    selector: TrackSelector,
    supervisor: JobSupervisor,
}

impl Transcoder {
    /// # Errors
    ///
    /// [`Error::Validation`] when the selection patterns do not compile.
    pub fn new(
        config: Config,
        engine: Arc<dyn TranscodeEngine>,
        compositor: Arc<dyn Compositor>,
    ) -> Result<Self> {
        let selector = TrackSelector::from_config(&config.selection)?;
        let supervisor = JobSupervisor::new(engine, compositor).with_config(&config.supervisor);
        Ok(Self {
            config,
            selector,
            supervisor,
        })
    }

    /// Register every started job in `registry`.
    pub fn with_registry(mut self, registry: ProcessRegistry) -> Self {
        self.supervisor = self.supervisor.with_registry(registry);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Probe `file` and run selection, planning and gating.
    pub async fn prepare(&self, file: &Path) -> Result<PreparedJob> {
        let media = self.supervisor.engine().probe(file).await?;
        let presets = &self.config.presets;

        let video_required = presets.iter().any(|p| p.video.is_some() || p.thumbnails.is_some());
        let selection = self.selector.select(&media, video_required)?;
        let default = default_preset(presets)?;
        let planned = plan(&selection, &media.audio, &media.subtitle, presets, default)?;

        let outcome = gate::filter(planned, &self.config.capabilities);
        if !outcome.rejected.is_empty() {
            tracing::info!(file = %file.display(), rejected = ?outcome.rejected, "Presets skipped by capability profile");
        }
        if outcome.accepted.is_empty() {
            return Err(Error::validation(format!(
                "no preset for {} can be produced with the configured capabilities",
                file.display()
            )));
        }

        Ok(PreparedJob {
            media,
            selection,
            accepted: outcome.accepted,
            rejected: outcome.rejected,
        })
    }

    /// Build the job plan for a prepared source.
    pub fn build(&self, prepared: &PreparedJob, layout: &OutputLayout) -> Result<JobPlan> {
        let request = BuildRequest::new(&prepared.media, &prepared.selection, &prepared.accepted, layout);
        JobBuilder::new(&self.config.capabilities).build(&request)
    }

    /// Prepare, build and start a job writing into `out_dir`, naming files
    /// after the source's stem. `out_dir` is created if missing.
    pub async fn transcode(
        &self,
        file: &Path,
        out_dir: &Path,
        transit: serde_json::Value,
    ) -> Result<JobHandle> {
        let prepared = self.prepare(file).await?;
        let layout = layout_for(file, out_dir)?;
        let plan = self.build(&prepared, &layout)?;
        tokio::fs::create_dir_all(out_dir).await?;
        Ok(self.supervisor.start(
            plan,
            JobMeta {
                name: layout.prefix.clone(),
                file: file.to_path_buf(),
                transit,
            },
        ))
    }
}

/// Output layout in `out_dir` prefixed with the stem of `file`.
pub fn layout_for(file: &Path, out_dir: &Path) -> Result<OutputLayout> {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::validation(format!("{} has no file name", file.display())))?;
    Ok(OutputLayout::new(out_dir, stem))
}

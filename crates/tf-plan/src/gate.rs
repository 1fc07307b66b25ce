//! Capability gate.
//!
//! Checks a [`PlannedOutput`] against a [`CapabilityProfile`] before any
//! job is built. Only outputs that pass are wrapped as [`AcceptedOutput`],
//! the sole input type the job builder takes.

use std::ops::Deref;
use tf_core::{CapabilityProfile, Track};

use crate::planner::PlannedOutput;

/// A planned output the capability profile can produce.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedOutput(PlannedOutput);

impl AcceptedOutput {
    pub fn into_inner(self) -> PlannedOutput {
        self.0
    }
}

impl Deref for AcceptedOutput {
    type Target = PlannedOutput;

    fn deref(&self) -> &PlannedOutput {
        &self.0
    }
}

/// What one section of an output needs from the profile.
struct SectionNeeds<'a> {
    name: &'static str,
    encoder: &'a str,
    filter: Option<&'static str>,
    tracks: Vec<&'a Track>,
}

fn sections(output: &PlannedOutput) -> Vec<SectionNeeds<'_>> {
    let mut needs = Vec::with_capacity(4);
    if let Some(video) = &output.video {
        needs.push(SectionNeeds {
            name: "video",
            encoder: &video.encoder,
            filter: Some("scale"),
            tracks: std::iter::once(&video.track).chain(&video.burn_in).collect(),
        });
    }
    if let Some(audio) = &output.audio {
        needs.push(SectionNeeds {
            name: "audio",
            encoder: &audio.encoder,
            filter: None,
            tracks: audio.tracks.iter().collect(),
        });
    }
    if let Some(subtitle) = &output.subtitle {
        needs.push(SectionNeeds {
            name: "subtitle",
            encoder: &subtitle.spec.encoder,
            filter: None,
            tracks: subtitle.tracks.iter().collect(),
        });
    }
    if let Some(thumbnails) = &output.thumbnails {
        needs.push(SectionNeeds {
            name: "thumbnails",
            encoder: &thumbnails.spec.encoder,
            filter: Some("fps"),
            tracks: vec![&thumbnails.track],
        });
    }
    needs
}

/// Reason the first failing check rejected `output`, if any.
fn rejection(output: &PlannedOutput, profile: &CapabilityProfile) -> Option<String> {
    for section in sections(output) {
        if !profile.can_encode(section.encoder) {
            return Some(format!("{}: no encoder for '{}'", section.name, section.encoder));
        }
        if let Some(filter) = section.filter {
            if !profile.can_filter(filter) {
                return Some(format!("{}: filter '{filter}' unavailable", section.name));
            }
        }
        let undecodable = section
            .tracks
            .iter()
            .find(|t| !profile.can_decode(t.kind, &t.codec_name));
        if let Some(track) = undecodable {
            return Some(format!(
                "{}: no {} decoder for '{}' (stream {})",
                section.name, track.kind, track.codec_name, track.index
            ));
        }
    }
    None
}

/// Whether `profile` can produce every section of `output`.
pub fn can_process(output: &PlannedOutput, profile: &CapabilityProfile) -> bool {
    rejection(output, profile).is_none()
}

/// Wrap `output` as accepted if the profile can produce it.
pub fn accept(output: PlannedOutput, profile: &CapabilityProfile) -> Option<AcceptedOutput> {
    match rejection(&output, profile) {
        None => Some(AcceptedOutput(output)),
        Some(reason) => {
            tracing::info!(output = %output.name, %reason, "Output rejected by capability profile");
            None
        }
    }
}

/// Accepted outputs and the names of the rejected ones.
#[derive(Debug, Clone, Default)]
pub struct GateOutcome {
    pub accepted: Vec<AcceptedOutput>,
    pub rejected: Vec<String>,
}

/// Split `outputs` into accepted and rejected, keeping order.
pub fn filter(outputs: Vec<PlannedOutput>, profile: &CapabilityProfile) -> GateOutcome {
    let mut outcome = GateOutcome::default();
    for output in outputs {
        let name = output.name.clone();
        match accept(output, profile) {
            Some(accepted) => outcome.accepted.push(accepted),
            None => outcome.rejected.push(name),
        }
    }
    outcome
}

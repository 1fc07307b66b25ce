//! Capability profile: what an execution environment can encode, decode
//! and filter.
//!
//! The profile is read-only lookup data. An absent decoder or filter table
//! accepts everything. A defined table accepts only its keys.

use crate::catalog::TrackKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Per-kind decoder tables. Kinds without a table accept every codec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderTable {
    #[serde(default)]
    pub video: Option<HashMap<String, String>>,
    #[serde(default)]
    pub audio: Option<HashMap<String, String>>,
    #[serde(default)]
    pub subtitle: Option<HashMap<String, String>>,
}

impl DecoderTable {
    fn for_kind(&self, kind: TrackKind) -> Option<&HashMap<String, String>> {
        match kind {
            TrackKind::Video => self.video.as_ref(),
            TrackKind::Audio => self.audio.as_ref(),
            TrackKind::Subtitle => self.subtitle.as_ref(),
        }
    }
}

/// Outcome of a decoder lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderLookup<'a> {
    /// No table for the kind; the engine picks its own decoder.
    EngineDefault,
    Decoder(&'a str),
    /// A table is defined but lacks the codec.
    Unsupported,
}

/// Encoders, decoders and filters available to the transcoding engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityProfile {
    /// Codec key to encoder name, e.g. `h264 -> libx264`.
    pub encoders: HashMap<String, String>,
    pub decoders: Option<DecoderTable>,
    /// Canonical filter name to alias, e.g. `scale -> scale_cuda`.
    pub filters: Option<HashMap<String, String>>,
    /// Codecs whose tracks are never mapped into an output.
    pub codec_blacklist: BTreeSet<String>,
    /// Passed to `-hwaccel` when a video decoder is selected.
    pub hw_decoder: Option<String>,
    /// Advisory concurrency limit. Not enforced here.
    pub max_instances: Option<u32>,
}

impl Default for CapabilityProfile {
    fn default() -> Self {
        let encoders = [
            ("h264", "libx264"),
            ("aac", "aac"),
            ("mov_text", "mov_text"),
            ("webvtt", "webvtt"),
            ("mjpeg", "mjpeg"),
        ]
        .into_iter()
        .map(|(codec, encoder)| (codec.to_string(), encoder.to_string()))
        .collect();

        Self {
            encoders,
            decoders: None,
            filters: None,
            codec_blacklist: BTreeSet::new(),
            hw_decoder: None,
            max_instances: None,
        }
    }
}

impl CapabilityProfile {
    /// Encoder name for a codec key.
    pub fn encoder(&self, codec: &str) -> Option<&str> {
        self.encoders.get(codec).map(String::as_str)
    }

    pub fn can_encode(&self, codec: &str) -> bool {
        self.encoders.contains_key(codec)
    }

    /// Whether a track of `kind` with `codec` can be decoded.
    pub fn can_decode(&self, kind: TrackKind, codec: &str) -> bool {
        match self.decoders.as_ref().and_then(|d| d.for_kind(kind)) {
            None => true,
            Some(table) => table.contains_key(codec),
        }
    }

    /// Explicit decoder for `codec`.
    pub fn decoder(&self, kind: TrackKind, codec: &str) -> DecoderLookup<'_> {
        match self.decoders.as_ref().and_then(|d| d.for_kind(kind)) {
            None => DecoderLookup::EngineDefault,
            Some(table) => match table.get(codec) {
                Some(decoder) => DecoderLookup::Decoder(decoder),
                None => DecoderLookup::Unsupported,
            },
        }
    }

    /// Resolve a filter name through the alias table.
    ///
    /// Returns the name itself when no table is defined and `None` when a
    /// table is defined without the name.
    pub fn filter<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        match &self.filters {
            None => Some(name),
            Some(table) => table.get(name).map(String::as_str),
        }
    }

    pub fn can_filter(&self, name: &str) -> bool {
        self.filter(name).is_some()
    }

    /// Resolve a filter name, falling back to the canonical name when the
    /// alias table does not mention it.
    pub fn filter_or_canonical<'a>(&'a self, name: &'a str) -> &'a str {
        self.filter(name).unwrap_or(name)
    }

    /// Blacklist match, case-insensitive.
    pub fn is_blacklisted(&self, codec: &str) -> bool {
        self.codec_blacklist
            .iter()
            .any(|c| c.eq_ignore_ascii_case(codec))
    }
}

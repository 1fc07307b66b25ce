//! External tool detection and management.
//!
//! The [`ToolRegistry`] discovers and caches the locations of ffmpeg,
//! ffprobe, and ImageMagick's montage and identify.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tf_core::config::ToolsConfig;
use tf_core::{Error, Result};

/// Limit applied to helper invocations (probe, identify, montage).
pub const HELPER_TIMEOUT: Duration = Duration::from_secs(300);

/// Tools the registry manages.
pub const KNOWN_TOOLS: &[&str] = &["ffmpeg", "ffprobe", "montage", "identify"];

/// A discovered tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    pub name: String,
    pub path: PathBuf,
    /// Limit for helper invocations. Transcodes run without one.
    pub timeout: Duration,
}

impl ToolConfig {
    fn new(name: &str, path: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            path,
            timeout: HELPER_TIMEOUT,
        }
    }
}

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    /// First line of the tool's version banner.
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

/// Registry holding discovered tool configurations.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolConfig>,
}

impl ToolRegistry {
    /// Discover tools, preferring configured paths that exist and falling
    /// back to `PATH`. Missing tools are left out.
    pub fn discover(tools_config: &ToolsConfig) -> Self {
        let overrides = [
            ("ffmpeg", &tools_config.ffmpeg_path),
            ("ffprobe", &tools_config.ffprobe_path),
            ("montage", &tools_config.montage_path),
            ("identify", &tools_config.identify_path),
        ];

        let tools = overrides
            .into_iter()
            .filter_map(|(name, configured)| {
                let path = match configured.as_deref() {
                    Some(p) if p.exists() => p.to_path_buf(),
                    Some(p) => {
                        tracing::warn!(tool = name, path = %p.display(), "Configured tool path does not exist; searching PATH");
                        which::which(name).ok()?
                    }
                    None => which::which(name).ok()?,
                };
                tracing::debug!(tool = name, path = %path.display(), "Tool found");
                Some((name.to_string(), ToolConfig::new(name, path)))
            })
            .collect();

        Self { tools }
    }

    /// Register `name` at an explicit path.
    pub fn with_tool(mut self, name: &str, path: impl Into<PathBuf>) -> Self {
        self.tools.insert(name.to_string(), ToolConfig::new(name, path.into()));
        self
    }

    /// The [`ToolConfig`] for `name`, or [`Error::Tool`] when it was not
    /// found during discovery.
    pub fn require(&self, name: &str) -> Result<&ToolConfig> {
        self.tools
            .get(name)
            .ok_or_else(|| Error::tool(name, format!("{name} not found; is it installed and in PATH?")))
    }

    /// Check all known tools and return availability information.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        KNOWN_TOOLS
            .iter()
            .map(|&name| match self.tools.get(name) {
                Some(cfg) => ToolInfo {
                    name: name.to_string(),
                    available: true,
                    version: detect_version(&cfg.path),
                    path: Some(cfg.path.clone()),
                },
                None => ToolInfo {
                    name: name.to_string(),
                    available: false,
                    version: None,
                    path: None,
                },
            })
            .collect()
    }
}

/// First line of `<tool> -version`. ffmpeg, ffprobe and ImageMagick all
/// accept the single-dash form.
fn detect_version(path: &Path) -> Option<String> {
    let output = std::process::Command::new(path).arg("-version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.trim().to_string())
}

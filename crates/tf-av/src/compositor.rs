//! Sprite-sheet composition.
//!
//! The thumbnail branch leaves numbered frames in a directory; a
//! [`Compositor`] tiles them into one image and reports the size of a tile.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_core::{Error, Resolution, Result};

use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

/// How frames are arranged on the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteLayout {
    pub columns: u32,
    pub background: String,
    /// Tile offset, e.g. `+0+0`.
    pub geometry: String,
    pub mode: String,
}

impl SpriteLayout {
    /// Tightly packed tiles on black, `columns` wide.
    pub fn new(columns: u32) -> Self {
        Self {
            columns,
            background: "black".into(),
            geometry: "+0+0".into(),
            mode: "concatenate".into(),
        }
    }

    /// `montage` arguments for `frames` written to `output`.
    pub fn montage_args(&self, frames: &[PathBuf], output: &Path) -> Vec<String> {
        let mut args = vec![
            "-mode".to_string(),
            self.mode.clone(),
            "-background".to_string(),
            self.background.clone(),
            "-geometry".to_string(),
            self.geometry.clone(),
            "-tile".to_string(),
            format!("{}x", self.columns),
        ];
        args.extend(frames.iter().map(|f| f.to_string_lossy().into_owned()));
        args.push(output.to_string_lossy().into_owned());
        args
    }
}

/// Tiles frames into a sprite sheet.
#[async_trait]
pub trait Compositor: Send + Sync {
    /// Compose `frames`, already in display order, into `output`. Returns the
    /// size of one tile.
    async fn compose(&self, frames: &[PathBuf], layout: &SpriteLayout, output: &Path) -> Result<Resolution>;
}

/// [`Compositor`] backed by ImageMagick's `identify` and `montage`.
#[derive(Debug, Clone)]
pub struct MontageCompositor {
    montage_path: PathBuf,
    identify_path: PathBuf,
    timeout: Duration,
}

impl MontageCompositor {
    pub fn new(montage_path: PathBuf, identify_path: PathBuf) -> Self {
        Self {
            montage_path,
            identify_path,
            timeout: Duration::from_secs(300),
        }
    }

    pub fn from_registry(tools: &ToolRegistry) -> Result<Self> {
        let montage = tools.require("montage")?;
        let identify = tools.require("identify")?;
        Ok(Self {
            montage_path: montage.path.clone(),
            identify_path: identify.path.clone(),
            timeout: montage.timeout,
        })
    }

    async fn tile_size(&self, frame: &Path) -> Result<Resolution> {
        let output = ToolCommand::new(self.identify_path.clone())
            .args(["-format", "%w %h"])
            .arg(frame.to_string_lossy())
            .timeout(self.timeout)
            .execute()
            .await?;
        parse_dimensions(&output.stdout).ok_or_else(|| {
            Error::tool(
                "identify",
                format!("unexpected output for {}: {}", frame.display(), output.stdout.trim()),
            )
        })
    }
}

/// Parse `"<width> <height>"`.
fn parse_dimensions(text: &str) -> Option<Resolution> {
    let mut parts = text.split_whitespace();
    let width = parts.next()?.parse().ok()?;
    let height = parts.next()?.parse().ok()?;
    Some(Resolution::new(width, height))
}

#[async_trait]
impl Compositor for MontageCompositor {
    async fn compose(&self, frames: &[PathBuf], layout: &SpriteLayout, output: &Path) -> Result<Resolution> {
        let first = frames
            .first()
            .ok_or_else(|| Error::finalization("thumbnails", "no thumbnail frames found"))?;
        let tile = self.tile_size(first).await?;

        ToolCommand::new(self.montage_path.clone())
            .args(layout.montage_args(frames, output))
            .timeout(self.timeout)
            .execute()
            .await?;

        tracing::debug!(
            frames = frames.len(),
            tile = %tile,
            sheet = %output.display(),
            "Composed sprite sheet"
        );
        Ok(tile)
    }
}

//! The thumbnail frame directory.
//!
//! A [`FrameWorkspace`] owns the directory the engine writes numbered
//! frames into. Dropping it removes the directory, so it is cleaned up on
//! every exit path of a job, including failure and kill.

use std::path::{Path, PathBuf};

use tf_core::Result;

/// Guard over the frame directory of one job.
#[derive(Debug)]
pub struct FrameWorkspace {
    dir: PathBuf,
}

impl FrameWorkspace {
    /// Create `dir` (and parents) and take ownership of it.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Frame files in sequence order. Names are compared by their numeric
    /// stem, so `10.jpg` sorts after `9.jpg` whatever the padding.
    pub fn frames(&self) -> Result<Vec<PathBuf>> {
        let mut frames: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        frames.sort_by_key(|path| (sequence_number(path).unwrap_or(u64::MAX), path.clone()));
        Ok(frames)
    }
}

/// Trailing number of the file stem: `00012.jpg` and `snap.12.jpg` both
/// give 12.
fn sequence_number(path: &Path) -> Option<u64> {
    let stem = path.file_stem()?.to_str()?;
    let digits = stem.rsplit(|c: char| !c.is_ascii_digit()).next()?;
    digits.parse().ok()
}

impl Drop for FrameWorkspace {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => tracing::debug!(dir = %self.dir.display(), "Removed frame directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(dir = %self.dir.display(), "Failed to remove frame directory: {e}"),
        }
    }
}

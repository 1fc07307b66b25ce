use std::path::Path;

/// Size of `path` in bytes, or `None` when it cannot be read.
pub async fn stat_size(path: &Path) -> Option<u64> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Some(meta.len()),
        Err(e) => {
            tracing::debug!(path = %path.display(), "stat failed: {e}");
            None
        }
    }
}

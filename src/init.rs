use crate::error::StageError;
use std::path::{Path, PathBuf};

/// Private directory for one request's files.
#[derive(Debug, Clone)]
pub struct RequestWorkspace {
    root: PathBuf,
}

impl RequestWorkspace {
    /// Creates a uniquely named directory under `parent` (the system temp
    /// dir when `None`). The directory outlives the request so the caller can
    /// use the artifacts; removing it is up to the caller.
    pub fn create(parent: Option<&Path>) -> Result<Self, StageError> {
        let parent = parent.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir);
        let dir = tempfile::Builder::new()
            .prefix("ai-story-")
            .tempdir_in(&parent)
            .map_err(|e| StageError::WorkspaceUnavailable(format!("{}: {}", parent.display(), e)))?;
        let root = dir.keep();
        tracing::debug!(workspace = %root.display(), "created request workspace");
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

pub async fn check_ffmpeg() -> bool {
    match tokio::process::Command::new("ffmpeg")
        .arg("-version")
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

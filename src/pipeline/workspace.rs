use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::ReelResult;

const FRAMES_DIR: &str = "frames";

/// Exclusive per-job scratch directory.
///
/// The directory and everything in it is removed when the workspace is dropped or closed.
#[derive(Debug)]
pub struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    /// Create a fresh `reelpin-*` directory under `root` (or the system temp dir).
    pub fn create(root: Option<&Path>) -> ReelResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("reelpin-");
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root).with_context(|| {
                    format!("failed to create workspace root '{}'", root.display())
                })?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .context("failed to create job workspace")?;
        Ok(Self { dir })
    }

    /// Root of the workspace.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Directory frame sequences are written to.
    pub fn frames_dir(&self) -> PathBuf {
        self.path().join(FRAMES_DIR)
    }

    /// Where the stitched video goes.
    pub fn video_path(&self) -> PathBuf {
        self.path().join("out.mp4")
    }

    /// Where the still image goes.
    pub fn still_path(&self) -> PathBuf {
        self.path().join("out.png")
    }

    /// Remove the workspace now, reporting removal errors instead of swallowing them.
    pub fn close(self) -> ReelResult<()> {
        let path = self.path().to_path_buf();
        self.dir
            .close()
            .with_context(|| format!("failed to remove workspace '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/workspace.rs"]
mod tests;

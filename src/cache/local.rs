use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::cache::{CacheLookup, CacheMode, CacheStore, CachedArtifact, entry_name};
use crate::foundation::core::{Artifact, ArtifactKind};
use crate::foundation::error::{ReelError, ReelResult};
use crate::request::Fingerprint;

/// Filesystem cache: entries are `<root>/<fingerprint>.<ext>`.
///
/// Writes land in a temporary file inside `root` and are renamed into place, so a reader sees
/// either the previous entry or the new one, never a partial file.
#[derive(Clone, Debug)]
pub struct LocalCache {
    root: PathBuf,
}

impl LocalCache {
    /// Open (creating if needed) a cache directory.
    pub fn new(root: impl AsRef<Path>) -> ReelResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|e| {
            ReelError::cache_unavailable(format!(
                "failed to create cache directory '{}': {e}",
                root.display()
            ))
        })?;
        Ok(Self { root })
    }

    /// Cache directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path an entry lives at, whether or not it exists.
    pub fn entry_path(&self, fingerprint: &Fingerprint, kind: ArtifactKind) -> PathBuf {
        self.root.join(entry_name(fingerprint, kind))
    }
}

#[async_trait::async_trait]
impl CacheStore for LocalCache {
    fn mode(&self) -> CacheMode {
        CacheMode::Filesystem
    }

    async fn has(&self, fingerprint: &Fingerprint, kind: ArtifactKind) -> ReelResult<bool> {
        let path = self.entry_path(fingerprint, kind);
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ReelError::cache_unavailable(format!(
                "stat '{}': {e}",
                path.display()
            ))),
        }
    }

    async fn get(&self, fingerprint: &Fingerprint, kind: ArtifactKind) -> ReelResult<CacheLookup> {
        if self.has(fingerprint, kind).await? {
            Ok(CacheLookup::Hit(CachedArtifact::in_place(Artifact::new(
                self.entry_path(fingerprint, kind),
                kind,
            ))))
        } else {
            Ok(CacheLookup::Miss)
        }
    }

    #[tracing::instrument(skip_all, fields(fingerprint = %fingerprint.short(), kind = %artifact.kind))]
    async fn put(&self, fingerprint: &Fingerprint, artifact: &Artifact) -> ReelResult<()> {
        let src = artifact.path.clone();
        let root = self.root.clone();
        let dest = self.entry_path(fingerprint, artifact.kind);

        tokio::task::spawn_blocking(move || -> ReelResult<()> {
            let fail = |what: &str, e: &dyn std::fmt::Display| {
                ReelError::cache_unavailable(format!("{what} '{}': {e}", dest.display()))
            };
            let mut tmp = tempfile::NamedTempFile::new_in(&root)
                .map_err(|e| fail("create temp file for", &e))?;
            let mut reader = std::fs::File::open(&src).map_err(|e| {
                ReelError::cache_unavailable(format!("open '{}': {e}", src.display()))
            })?;
            std::io::copy(&mut reader, tmp.as_file_mut()).map_err(|e| fail("copy into", &e))?;
            tmp.as_file().sync_all().map_err(|e| fail("sync", &e))?;
            tmp.persist(&dest).map_err(|e| fail("rename into", &e.error))?;
            Ok(())
        })
        .await
        .map_err(|e| ReelError::cache_unavailable(format!("cache write task failed: {e}")))?
    }
}

#[cfg(test)]
#[path = "../../tests/unit/cache/local.rs"]
mod tests;

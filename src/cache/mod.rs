//! Fingerprint-keyed artifact cache.
//!
//! A cache entry is `(fingerprint, kind)` mapped to a file. Entries are trusted only while the
//! backing file or object exists; there is no TTL.

use std::ops::Deref;

use tempfile::TempPath;

use crate::foundation::core::{Artifact, ArtifactKind};
use crate::foundation::error::ReelResult;
use crate::request::Fingerprint;

/// Durable directory backend.
pub mod local;
/// S3-compatible bucket backend.
pub mod remote;

pub use local::LocalCache;
pub use remote::{RemoteCache, RemoteCacheConfig};

/// Which cache backend a process runs with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheMode {
    /// Caching disabled.
    None,
    /// Artifacts copied into a local directory.
    Filesystem,
    /// Artifacts stored in an S3-compatible bucket.
    #[value(alias = "s3-bucket")]
    RemoteObject,
}

/// A cached artifact readable on local disk.
///
/// Copies fetched from a remote backend are deleted when the value is dropped; durable local
/// entries are left in place.
#[derive(Debug)]
pub struct CachedArtifact {
    artifact: Artifact,
    _scratch: Option<TempPath>,
}

impl CachedArtifact {
    /// A cache entry that is itself the local file.
    pub fn in_place(artifact: Artifact) -> Self {
        Self {
            artifact,
            _scratch: None,
        }
    }

    /// A temporary copy of an entry, removed on drop.
    pub fn scratch(scratch: TempPath, kind: ArtifactKind) -> Self {
        Self {
            artifact: Artifact::new(scratch.to_path_buf(), kind),
            _scratch: Some(scratch),
        }
    }

    /// Borrow the artifact.
    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }
}

impl Deref for CachedArtifact {
    type Target = Artifact;

    fn deref(&self) -> &Artifact {
        &self.artifact
    }
}

/// Result of a cache lookup.
#[derive(Debug)]
pub enum CacheLookup {
    /// A readable local copy of the cached artifact.
    Hit(CachedArtifact),
    /// No usable entry.
    Miss,
}

impl CacheLookup {
    /// Return the artifact of a hit.
    pub fn hit(self) -> Option<CachedArtifact> {
        match self {
            Self::Hit(a) => Some(a),
            Self::Miss => None,
        }
    }
}

/// Storage for previously produced artifacts, shared by every job of the process.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Backend in use.
    fn mode(&self) -> CacheMode;

    /// Whether an entry for `(fingerprint, kind)` currently exists.
    async fn has(&self, fingerprint: &Fingerprint, kind: ArtifactKind) -> ReelResult<bool>;

    /// Fetch an entry as a local file, valid while the returned hit is alive. An entry that
    /// vanished is a [`CacheLookup::Miss`].
    async fn get(&self, fingerprint: &Fingerprint, kind: ArtifactKind) -> ReelResult<CacheLookup>;

    /// Store `artifact` under `fingerprint`, replacing any previous entry.
    async fn put(&self, fingerprint: &Fingerprint, artifact: &Artifact) -> ReelResult<()>;
}

/// Cache that never hits and never stores.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledCache;

#[async_trait::async_trait]
impl CacheStore for DisabledCache {
    fn mode(&self) -> CacheMode {
        CacheMode::None
    }

    async fn has(&self, _fingerprint: &Fingerprint, _kind: ArtifactKind) -> ReelResult<bool> {
        Ok(false)
    }

    async fn get(
        &self,
        _fingerprint: &Fingerprint,
        _kind: ArtifactKind,
    ) -> ReelResult<CacheLookup> {
        Ok(CacheLookup::Miss)
    }

    async fn put(&self, _fingerprint: &Fingerprint, _artifact: &Artifact) -> ReelResult<()> {
        Ok(())
    }
}

/// Object name of an entry: `<fingerprint>.<ext>`.
pub fn entry_name(fingerprint: &Fingerprint, kind: ArtifactKind) -> String {
    format!("{}.{}", fingerprint.as_str(), kind.extension())
}

#[cfg(test)]
#[path = "../../tests/unit/cache/mod.rs"]
mod tests;

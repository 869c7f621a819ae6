use std::path::{Path, PathBuf};

use s3::creds::Credentials;
use s3::{Bucket, Region};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt as _;

use crate::cache::{CacheLookup, CacheMode, CacheStore, CachedArtifact, entry_name};
use crate::foundation::core::{Artifact, ArtifactKind};
use crate::foundation::error::{ReelError, ReelResult};
use crate::request::Fingerprint;

/// Connection settings for [`RemoteCache`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteCacheConfig {
    /// Bucket name.
    pub bucket: String,
    /// Region name (e.g. `us-east-1`).
    pub region: String,
    /// Custom endpoint for S3-compatible services; switches to path-style addressing.
    pub endpoint: Option<String>,
    /// Key prefix prepended to every entry name.
    pub prefix: String,
    /// Local directory fetched entries are downloaded into; each copy lives as long as its hit.
    pub materialize_dir: PathBuf,
}

/// S3-compatible cache: entries are objects `<prefix><fingerprint>.<ext>`.
///
/// Credentials come from the standard `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` variables.
pub struct RemoteCache {
    bucket: Box<Bucket>,
    prefix: String,
    materialize_dir: PathBuf,
}

impl RemoteCache {
    /// Connect to the bucket described by `cfg`.
    pub fn new(cfg: &RemoteCacheConfig) -> ReelResult<Self> {
        let region = match &cfg.endpoint {
            Some(endpoint) => Region::Custom {
                region: cfg.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => cfg
                .region
                .parse()
                .map_err(|e| ReelError::config(format!("invalid cache region: {e}")))?,
        };

        let credentials = Credentials::from_env()
            .map_err(|e| ReelError::config(format!("failed to load S3 credentials: {e}")))?;
        let bucket = Bucket::new(&cfg.bucket, region, credentials)
            .map_err(|e| ReelError::config(format!("failed to open cache bucket: {e}")))?;
        let bucket = if cfg.endpoint.is_some() {
            bucket.with_path_style()
        } else {
            bucket
        };

        Self::from_bucket(bucket, cfg.prefix.clone(), cfg.materialize_dir.clone())
    }

    /// Wrap an already configured bucket handle.
    pub fn from_bucket(
        bucket: Box<Bucket>,
        prefix: impl Into<String>,
        materialize_dir: impl Into<PathBuf>,
    ) -> ReelResult<Self> {
        let materialize_dir = materialize_dir.into();
        std::fs::create_dir_all(&materialize_dir).map_err(|e| {
            ReelError::cache_unavailable(format!(
                "failed to create '{}': {e}",
                materialize_dir.display()
            ))
        })?;

        Ok(Self {
            bucket,
            prefix: prefix.into(),
            materialize_dir,
        })
    }

    /// Object key of an entry.
    pub fn key(&self, fingerprint: &Fingerprint, kind: ArtifactKind) -> String {
        object_key(&self.prefix, fingerprint, kind)
    }

    /// Local directory downloads are written to.
    pub fn materialize_dir(&self) -> &Path {
        &self.materialize_dir
    }

    // A miss or a failed download removes the partial file with the temp handle.
    async fn download(&self, key: &str, kind: ArtifactKind) -> ReelResult<Option<TempPath>> {
        let fail = |e: &dyn std::fmt::Display| {
            ReelError::cache_unavailable(format!("materialize '{key}': {e}"))
        };

        let tmp = tempfile::Builder::new()
            .prefix("hit-")
            .suffix(&format!(".{}", kind.extension()))
            .tempfile_in(&self.materialize_dir)
            .map_err(|e| fail(&e))?;
        let mut file = tokio::fs::File::from_std(tmp.reopen().map_err(|e| fail(&e))?);
        match self.bucket.get_object_to_writer(key, &mut file).await {
            Ok(status) if is_success(status) => {}
            Ok(404) => return Ok(None),
            Ok(status) => return Err(fail(&format!("S3 get returned HTTP {status}"))),
            Err(e) if is_not_found(&e.to_string()) => return Ok(None),
            Err(e) => return Err(fail(&format!("S3 get failed: {e}"))),
        }
        file.flush().await.map_err(|e| fail(&e))?;
        drop(file);

        Ok(Some(tmp.into_temp_path()))
    }
}

#[async_trait::async_trait]
impl CacheStore for RemoteCache {
    fn mode(&self) -> CacheMode {
        CacheMode::RemoteObject
    }

    async fn has(&self, fingerprint: &Fingerprint, kind: ArtifactKind) -> ReelResult<bool> {
        let key = self.key(fingerprint, kind);
        match self.bucket.head_object(&key).await {
            Ok((_, status)) if is_success(status) => Ok(true),
            Ok((_, 404)) => Ok(false),
            Ok((_, status)) => Err(ReelError::cache_unavailable(format!(
                "S3 head '{key}' returned HTTP {status}"
            ))),
            Err(e) if is_not_found(&e.to_string()) => Ok(false),
            Err(e) => Err(ReelError::cache_unavailable(format!(
                "S3 head '{key}' failed: {e}"
            ))),
        }
    }

    #[tracing::instrument(skip_all, fields(fingerprint = %fingerprint.short(), %kind))]
    async fn get(&self, fingerprint: &Fingerprint, kind: ArtifactKind) -> ReelResult<CacheLookup> {
        let key = self.key(fingerprint, kind);
        Ok(match self.download(&key, kind).await? {
            Some(scratch) => CacheLookup::Hit(CachedArtifact::scratch(scratch, kind)),
            None => CacheLookup::Miss,
        })
    }

    #[tracing::instrument(skip_all, fields(fingerprint = %fingerprint.short(), kind = %artifact.kind))]
    async fn put(&self, fingerprint: &Fingerprint, artifact: &Artifact) -> ReelResult<()> {
        let key = self.key(fingerprint, artifact.kind);
        let mut file = tokio::fs::File::open(artifact.path()).await.map_err(|e| {
            ReelError::cache_unavailable(format!("open '{}': {e}", artifact.path().display()))
        })?;
        self.bucket
            .put_object_stream(&mut file, &key)
            .await
            .map_err(|e| ReelError::cache_unavailable(format!("S3 put '{key}' failed: {e}")))?;
        Ok(())
    }
}

/// Object key for `prefix` + `<fingerprint>.<ext>`.
pub fn object_key(prefix: &str, fingerprint: &Fingerprint, kind: ArtifactKind) -> String {
    format!("{prefix}{}", entry_name(fingerprint, kind))
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

fn is_not_found(err: &str) -> bool {
    err.contains("404") || err.contains("NoSuchKey")
}

#[cfg(test)]
#[path = "../../tests/unit/cache/remote.rs"]
mod tests;

//! Process configuration, read from flags or the environment (after `.env` is loaded).

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheMode, CacheStore, DisabledCache, LocalCache, RemoteCache, RemoteCacheConfig};
use crate::foundation::error::{ReelError, ReelResult};
use crate::publish::pinning::{DEFAULT_GATEWAY, DEFAULT_PIN_ENDPOINT, PinningConfig, Secret};
use crate::scene::builtin::SCENE_ID;

/// Everything a `reelpin` process is configured with.
#[derive(Clone, Debug, clap::Args)]
pub struct Config {
    /// HTTP port.
    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Address to bind the HTTP server to.
    #[arg(long, env = "BIND_ADDR", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind_addr: IpAddr,

    /// Cache backend.
    #[arg(long, env = "CACHE_MODE", value_enum, default_value_t = CacheMode::Filesystem)]
    pub cache_mode: CacheMode,

    /// Cache directory (filesystem mode) or scratch directory for downloaded hits (remote mode).
    #[arg(long, env = "CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Bucket for the remote-object cache.
    #[arg(long, env = "CACHE_BUCKET")]
    pub cache_bucket: Option<String>,

    /// Region of the cache bucket.
    #[arg(long, env = "CACHE_REGION", default_value = "us-east-1")]
    pub cache_region: String,

    /// Custom S3-compatible endpoint (path-style addressing).
    #[arg(long, env = "CACHE_ENDPOINT")]
    pub cache_endpoint: Option<String>,

    /// Key prefix for cache objects.
    #[arg(long, env = "CACHE_PREFIX", default_value = "reelpin/")]
    pub cache_prefix: String,

    /// Pinning service API key.
    #[arg(long, env = "PINATA_API_KEY", hide_env_values = true)]
    pub pinata_api_key: Option<Secret>,

    /// Pinning service API secret.
    #[arg(long, env = "PINATA_API_SECRET", hide_env_values = true)]
    pub pinata_api_secret: Option<Secret>,

    /// Multipart upload endpoint.
    #[arg(long, env = "PIN_ENDPOINT", default_value = DEFAULT_PIN_ENDPOINT)]
    pub pin_endpoint: String,

    /// Public gateway base URL.
    #[arg(long, env = "GATEWAY_URL", default_value = DEFAULT_GATEWAY)]
    pub gateway_url: String,

    /// Scene every request renders.
    #[arg(long, env = "SCENE_ID", default_value = SCENE_ID)]
    pub scene_id: String,

    /// Root directory `videoSrc` paths resolve under.
    #[arg(long, env = "ASSETS_DIR", default_value = ".")]
    pub assets_dir: PathBuf,

    /// Jobs allowed in the production stages at once [default: available parallelism].
    #[arg(long, env = "MAX_JOBS")]
    pub max_jobs: Option<usize>,

    /// Frame render worker threads [default: rayon's choice].
    #[arg(long, env = "RENDER_THREADS")]
    pub render_threads: Option<usize>,

    /// Parent directory of job workspaces [default: system temp dir].
    #[arg(long, env = "WORKSPACE_ROOT")]
    pub workspace_root: Option<PathBuf>,

    /// Per-request deadline in seconds.
    #[arg(long, env = "JOB_TIMEOUT_SECS")]
    pub job_timeout_secs: Option<u64>,
}

impl Config {
    /// Reject settings no job could run with.
    pub fn validate(&self) -> ReelResult<()> {
        if self.max_jobs == Some(0) {
            return Err(ReelError::config("MAX_JOBS must be >= 1"));
        }
        if self.render_threads == Some(0) {
            return Err(ReelError::config("RENDER_THREADS must be >= 1"));
        }
        if self.job_timeout_secs == Some(0) {
            return Err(ReelError::config("JOB_TIMEOUT_SECS must be >= 1"));
        }
        if self.cache_mode == CacheMode::RemoteObject && self.cache_bucket.is_none() {
            return Err(ReelError::config(
                "CACHE_BUCKET is required when CACHE_MODE is remote-object",
            ));
        }
        if self.scene_id.trim().is_empty() {
            return Err(ReelError::config("SCENE_ID must not be empty"));
        }
        Ok(())
    }

    /// Address the server listens on.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    /// Effective job slot count.
    pub fn max_jobs(&self) -> usize {
        self.max_jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Effective cache directory.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("reelpin-cache"))
    }

    /// Per-request deadline, if any.
    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout_secs.map(Duration::from_secs)
    }

    /// Pinning settings; both credentials are required.
    pub fn pinning(&self) -> ReelResult<PinningConfig> {
        let (Some(api_key), Some(api_secret)) = (&self.pinata_api_key, &self.pinata_api_secret)
        else {
            return Err(ReelError::config(
                "PINATA_API_KEY and PINATA_API_SECRET must both be set",
            ));
        };
        Ok(PinningConfig {
            endpoint: self.pin_endpoint.clone(),
            gateway: self.gateway_url.clone(),
            api_key: api_key.clone(),
            api_secret: api_secret.clone(),
        })
    }

    /// Open the configured cache backend.
    pub fn cache_store(&self) -> ReelResult<Arc<dyn CacheStore>> {
        Ok(match self.cache_mode {
            CacheMode::None => Arc::new(DisabledCache),
            CacheMode::Filesystem => Arc::new(LocalCache::new(self.cache_dir())?),
            CacheMode::RemoteObject => {
                let bucket = self.cache_bucket.clone().ok_or_else(|| {
                    ReelError::config("CACHE_BUCKET is required when CACHE_MODE is remote-object")
                })?;
                Arc::new(RemoteCache::new(&RemoteCacheConfig {
                    bucket,
                    region: self.cache_region.clone(),
                    endpoint: self.cache_endpoint.clone(),
                    prefix: self.cache_prefix.clone(),
                    materialize_dir: self.cache_dir(),
                })?)
            }
        })
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;

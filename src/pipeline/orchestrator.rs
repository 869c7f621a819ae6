use std::sync::Arc;

use tracing::Instrument as _;

use crate::cache::{CacheMode, CacheStore, CachedArtifact};
use crate::config::Config;
use crate::encode::ffmpeg::FfmpegStitcher;
use crate::foundation::core::{Artifact, ArtifactKind};
use crate::foundation::error::{ReelError, ReelResult};
use crate::pipeline::produce::{Needs, Producer};
use crate::pipeline::workspace::Workspace;
use crate::pipeline::response::{
    ArtifactOutcome, CacheWriteOutcome, ErrorBody, JobFailure, JobStatus, RenderResponse, Stage,
};
use crate::publish::{PinningPublisher, Publisher};
use crate::render::frames::CpuFrameRenderer;
use crate::render::still::CpuStillRenderer;
use crate::request::{Fingerprint, RenderRequest};
use crate::scene::compiler::SceneRegistry;

/// Runs whole jobs: cache lookup, production, publishing, cache population.
#[derive(Clone)]
pub struct Orchestrator {
    producer: Producer,
    publisher: Arc<dyn Publisher>,
    cache: Arc<dyn CacheStore>,
}

impl Orchestrator {
    /// Assemble an orchestrator from its collaborators.
    pub fn new(
        producer: Producer,
        publisher: Arc<dyn Publisher>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            producer,
            publisher,
            cache,
        }
    }

    /// Wire the built-in collaborators from process configuration.
    pub fn from_config(cfg: &Config) -> ReelResult<Self> {
        cfg.validate()?;
        let publisher = PinningPublisher::new(cfg.pinning()?)?;
        Ok(Self::new(
            producer_from_config(cfg)?,
            Arc::new(publisher),
            cfg.cache_store()?,
        ))
    }

    /// Cache backend in use.
    pub fn cache_mode(&self) -> CacheMode {
        self.cache.mode()
    }

    /// Run one job to completion.
    ///
    /// Stage failures before publishing abort the job. Publish failures are reported per
    /// artifact and never undo what was produced.
    pub async fn produce(&self, request: RenderRequest) -> Result<RenderResponse, JobFailure> {
        let fingerprint = request.fingerprint();
        let span = tracing::info_span!("job", fingerprint = %fingerprint.short());
        self.run(request, fingerprint).instrument(span).await
    }

    async fn run(
        &self,
        request: RenderRequest,
        fingerprint: Fingerprint,
    ) -> Result<RenderResponse, JobFailure> {
        tracing::info!(params = request.len(), "job accepted");

        let cached_video = self.lookup(&fingerprint, ArtifactKind::Video).await;
        let cached_still = self.lookup(&fingerprint, ArtifactKind::Image).await;
        let needs = Needs {
            video: cached_video.is_none(),
            still: cached_still.is_none(),
        };
        let cached = needs.is_empty();

        // Keeps the workspace (and the fresh artifacts in it) alive through publishing.
        let produced = if cached {
            tracing::info!("served from cache");
            None
        } else {
            Some(self.producer.produce(&request, needs).await?)
        };

        let fresh_video = produced.as_ref().and_then(|p| p.video.clone());
        let fresh_still = produced.as_ref().and_then(|p| p.still.clone());
        // Cache hits stay alive until publishing is done; remote copies are deleted on drop.
        let (Some(video), Some(still)) = (
            fresh_video
                .clone()
                .or_else(|| cached_video.as_deref().cloned()),
            fresh_still
                .clone()
                .or_else(|| cached_still.as_deref().cloned()),
        ) else {
            return Err(JobFailure::new(
                Stage::Still,
                ReelError::Other(anyhow::anyhow!("production finished without both artifacts")),
            ));
        };

        let (image_res, video_res) =
            tokio::join!(self.publisher.publish(&still), self.publisher.publish(&video));
        for err in [&image_res, &video_res].into_iter().filter_map(|r| r.as_ref().err()) {
            tracing::warn!(error = %err, "publish failed");
        }
        let both_published = image_res.is_ok() && video_res.is_ok();
        let image = ArtifactOutcome::from(image_res);
        let video_outcome = ArtifactOutcome::from(video_res);

        let fresh: Vec<Artifact> = fresh_video.into_iter().chain(fresh_still).collect();
        let cache_write = if both_published {
            self.store(&fingerprint, &fresh).await
        } else {
            CacheWriteOutcome::Skipped
        };

        if let Some(produced) = produced {
            close_workspace(produced.workspace);
        }
        drop((cached_video, cached_still));

        let status = JobStatus::from_outcomes(&image, &video_outcome);
        tracing::info!(?status, cached, "job finished");
        Ok(RenderResponse {
            fingerprint,
            status,
            cached,
            image,
            video: video_outcome,
            cache_write,
        })
    }

    async fn lookup(
        &self,
        fingerprint: &Fingerprint,
        kind: ArtifactKind,
    ) -> Option<CachedArtifact> {
        match self.try_lookup(fingerprint, kind).await {
            Ok(hit) => {
                tracing::debug!(%kind, hit = hit.is_some(), "cache lookup");
                hit
            }
            Err(e) => {
                tracing::warn!(%kind, error = %e, "cache lookup failed, treating as miss");
                None
            }
        }
    }

    async fn try_lookup(
        &self,
        fingerprint: &Fingerprint,
        kind: ArtifactKind,
    ) -> ReelResult<Option<CachedArtifact>> {
        if !self.cache.has(fingerprint, kind).await? {
            return Ok(None);
        }
        // The entry may vanish between the two calls; `get` then reports a miss.
        Ok(self.cache.get(fingerprint, kind).await?.hit())
    }

    async fn store(&self, fingerprint: &Fingerprint, fresh: &[Artifact]) -> CacheWriteOutcome {
        if self.cache.mode() == CacheMode::None || fresh.is_empty() {
            return CacheWriteOutcome::Skipped;
        }
        for artifact in fresh {
            if let Err(e) = self.cache.put(fingerprint, artifact).await {
                tracing::warn!(kind = %artifact.kind, error = %e, "cache write failed");
                return CacheWriteOutcome::Failed {
                    error: ErrorBody::from(&e),
                };
            }
        }
        tracing::debug!(entries = fresh.len(), "cache updated");
        CacheWriteOutcome::Stored
    }
}

/// Production stages wired with the built-in scene, renderers, and stitcher.
pub fn producer_from_config(cfg: &Config) -> ReelResult<Producer> {
    let scenes = Arc::new(SceneRegistry::with_builtin(cfg.assets_dir.clone()));
    let frames = CpuFrameRenderer::new(Arc::clone(&scenes), cfg.render_threads)?;
    let still = CpuStillRenderer::new(Arc::clone(&scenes));
    Ok(Producer::new(
        cfg.scene_id.clone(),
        scenes,
        Arc::new(frames),
        Arc::new(FfmpegStitcher::new()),
        Arc::new(still),
        cfg.max_jobs(),
    )
    .with_workspace_root(cfg.workspace_root.clone()))
}

// A workspace still shared with a stage task is removed on its last drop instead.
fn close_workspace(workspace: Arc<Workspace>) {
    if let Ok(ws) = Arc::try_unwrap(workspace)
        && let Err(e) = ws.close()
    {
        tracing::warn!(error = %e, "workspace cleanup failed");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/orchestrator.rs"]
mod tests;

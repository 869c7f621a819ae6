use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::encode::ffmpeg::VideoStitcher;
use crate::foundation::core::{Artifact, ArtifactKind};
use crate::foundation::error::{ReelError, ReelResult};
use crate::pipeline::response::{JobFailure, Stage};
use crate::pipeline::workspace::Workspace;
use crate::render::frames::{FrameRenderer, LogProgress};
use crate::render::still::StillRenderer;
use crate::request::RenderRequest;
use crate::scene::compiler::{CompositionDescriptor, SceneCompiler};

/// Which artifacts a job still has to produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Needs {
    /// Render frames and stitch the video.
    pub video: bool,
    /// Render the still.
    pub still: bool,
}

impl Needs {
    /// Produce both artifacts.
    pub const ALL: Self = Self {
        video: true,
        still: true,
    };

    /// Return `true` when nothing has to be produced.
    pub fn is_empty(self) -> bool {
        !self.video && !self.still
    }
}

/// Freshly produced artifacts, alive as long as their workspace.
#[derive(Debug)]
pub struct Produced {
    /// Workspace holding the artifacts; dropping it deletes them.
    pub workspace: Arc<Workspace>,
    /// Compiled composition.
    pub composition: Arc<CompositionDescriptor>,
    /// Stitched video, when requested.
    pub video: Option<Artifact>,
    /// Still image, when requested.
    pub still: Option<Artifact>,
}

/// The production half of a job: compile, render, stitch, still.
///
/// At most `max_jobs` jobs are inside these stages at once; the CPU-bound stages run on the
/// blocking thread pool. Every stage task holds the job's slot, so a job whose future was
/// dropped keeps counting against the limit until its running stage returns.
#[derive(Clone)]
pub struct Producer {
    scene_id: String,
    compiler: Arc<dyn SceneCompiler>,
    frames: Arc<dyn FrameRenderer>,
    stitcher: Arc<dyn VideoStitcher>,
    still: Arc<dyn StillRenderer>,
    slots: Arc<Semaphore>,
    workspace_root: Option<PathBuf>,
}

impl Producer {
    /// Assemble a producer for `scene_id` with `max_jobs` slots.
    pub fn new(
        scene_id: impl Into<String>,
        compiler: Arc<dyn SceneCompiler>,
        frames: Arc<dyn FrameRenderer>,
        stitcher: Arc<dyn VideoStitcher>,
        still: Arc<dyn StillRenderer>,
        max_jobs: usize,
    ) -> Self {
        Self {
            scene_id: scene_id.into(),
            compiler,
            frames,
            stitcher,
            still,
            slots: Arc::new(Semaphore::new(max_jobs.max(1))),
            workspace_root: None,
        }
    }

    /// Create workspaces under `root` instead of the system temp dir.
    pub fn with_workspace_root(mut self, root: Option<PathBuf>) -> Self {
        self.workspace_root = root;
        self
    }

    /// Run the production stages `needs` asks for.
    ///
    /// Any stage error aborts the job; the workspace is removed when the error drops it.
    pub async fn produce(
        &self,
        request: &RenderRequest,
        needs: Needs,
    ) -> Result<Produced, JobFailure> {
        let slot = Arc::new(Arc::clone(&self.slots).acquire_owned().await.map_err(|e| {
            JobFailure::new(
                Stage::Workspace,
                ReelError::Other(anyhow::anyhow!("job slots closed: {e}")),
            )
        })?);

        let root = self.workspace_root.clone();
        let workspace = Arc::new(
            run_blocking(Stage::Workspace, &slot, move || {
                Workspace::create(root.as_deref())
            })
            .await?,
        );
        tracing::debug!(workspace = %workspace.path().display(), "workspace created");

        let compiler = Arc::clone(&self.compiler);
        let scene_id = self.scene_id.clone();
        let req = request.clone();
        let composition = Arc::new(
            run_blocking(Stage::Compile, &slot, move || {
                compiler.compile(&scene_id, &req)
            })
            .await?,
        );

        let video = if needs.video {
            let manifest = {
                let frames = Arc::clone(&self.frames);
                let comp = Arc::clone(&composition);
                let ws = Arc::clone(&workspace);
                let progress = LogProgress::new(request.fingerprint().short());
                run_blocking(Stage::Render, &slot, move || {
                    frames.render(&comp, &ws, &progress)
                })
                .await?
            };

            let stitcher = Arc::clone(&self.stitcher);
            let comp = Arc::clone(&composition);
            let ws = Arc::clone(&workspace);
            let path = run_blocking(Stage::Stitch, &slot, move || {
                stitcher.stitch(&manifest, &comp, &ws)
            })
            .await?;
            Some(Artifact::new(path, ArtifactKind::Video))
        } else {
            None
        };

        let still = if needs.still {
            let still = Arc::clone(&self.still);
            let comp = Arc::clone(&composition);
            let ws = Arc::clone(&workspace);
            let path =
                run_blocking(Stage::Still, &slot, move || still.render_still(&comp, &ws)).await?;
            Some(Artifact::new(path, ArtifactKind::Image))
        } else {
            None
        };

        Ok(Produced {
            workspace,
            composition,
            video,
            still,
        })
    }
}

async fn run_blocking<T, F>(
    stage: Stage,
    slot: &Arc<OwnedSemaphorePermit>,
    f: F,
) -> Result<T, JobFailure>
where
    T: Send + 'static,
    F: FnOnce() -> ReelResult<T> + Send + 'static,
{
    let started = Instant::now();
    tracing::info!(%stage, "stage started");

    let slot = Arc::clone(slot);
    let task = tokio::task::spawn_blocking(move || {
        let _slot = slot;
        f()
    });
    let res = match task.await {
        Ok(res) => res,
        Err(e) => Err(ReelError::Other(anyhow::anyhow!("{stage} task aborted: {e}"))),
    };
    match res {
        Ok(v) => {
            tracing::info!(%stage, elapsed_ms = started.elapsed().as_millis() as u64, "stage finished");
            Ok(v)
        }
        Err(e) => {
            let failure = JobFailure::new(stage, e);
            tracing::warn!(%stage, error = %failure.error, "stage failed");
            Err(failure)
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/produce.rs"]
mod tests;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::*;
use crate::render::frames::{CpuFrameRenderer, FrameManifest, ProgressSink};
use crate::render::still::CpuStillRenderer;
use crate::scene::compiler::SceneRegistry;

struct CountingFrames {
    inner: CpuFrameRenderer,
    calls: AtomicUsize,
}

impl FrameRenderer for CountingFrames {
    fn render(
        &self,
        comp: &CompositionDescriptor,
        workspace: &Workspace,
        progress: &dyn ProgressSink,
    ) -> ReelResult<FrameManifest> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.render(comp, workspace, progress)
    }
}

/// Writes a placeholder video so no encoder is needed.
struct FakeStitcher {
    fail: bool,
}

impl VideoStitcher for FakeStitcher {
    fn stitch(
        &self,
        manifest: &FrameManifest,
        _comp: &CompositionDescriptor,
        workspace: &Workspace,
    ) -> ReelResult<PathBuf> {
        if self.fail {
            return Err(ReelError::stitch_failed("encoder exploded"));
        }
        let out = workspace.video_path();
        std::fs::write(&out, format!("{} frames", manifest.frames.len()))
            .map_err(anyhow::Error::from)?;
        Ok(out)
    }
}

/// Sleeps inside the stitch stage and records how many stitches overlap.
struct SlowStitcher {
    delay: Duration,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl VideoStitcher for SlowStitcher {
    fn stitch(
        &self,
        _manifest: &FrameManifest,
        _comp: &CompositionDescriptor,
        workspace: &Workspace,
    ) -> ReelResult<PathBuf> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.running.fetch_sub(1, Ordering::SeqCst);

        let out = workspace.video_path();
        std::fs::write(&out, "slow").map_err(anyhow::Error::from)?;
        Ok(out)
    }
}

fn producer(root: &std::path::Path, fail_stitch: bool) -> (Producer, Arc<CountingFrames>) {
    let scenes = Arc::new(SceneRegistry::with_builtin("."));
    let frames = Arc::new(CountingFrames {
        inner: CpuFrameRenderer::new(Arc::clone(&scenes), Some(2)).unwrap(),
        calls: AtomicUsize::new(0),
    });
    let p = Producer::new(
        "Scene",
        scenes.clone(),
        frames.clone(),
        Arc::new(FakeStitcher { fail: fail_stitch }),
        Arc::new(CpuStillRenderer::new(scenes)),
        2,
    )
    .with_workspace_root(Some(root.to_path_buf()));
    (p, frames)
}

fn small_request() -> RenderRequest {
    RenderRequest::from_pairs([
        ("text", "HELLO"),
        ("width", "32"),
        ("height", "32"),
        ("durationInFrames", "6"),
    ])
}

fn entries(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[tokio::test]
async fn produces_video_and_still_in_one_workspace() {
    let root = tempfile::tempdir().unwrap();
    let (p, frames) = producer(root.path(), false);

    let out = p.produce(&small_request(), Needs::ALL).await.unwrap();
    let video = out.video.clone().unwrap();
    let still = out.still.clone().unwrap();
    assert_eq!(video.kind, ArtifactKind::Video);
    assert_eq!(still.kind, ArtifactKind::Image);
    assert!(video.path().starts_with(out.workspace.path()));
    assert!(still.path().starts_with(out.workspace.path()));
    assert_eq!(std::fs::read_to_string(video.path()).unwrap(), "6 frames");
    assert_eq!(out.composition.frame_count(), 6);
    assert_eq!(frames.calls.load(Ordering::SeqCst), 1);

    drop(out);
    assert_eq!(entries(root.path()), 0);
}

#[tokio::test]
async fn still_only_skips_frame_rendering() {
    let root = tempfile::tempdir().unwrap();
    let (p, frames) = producer(root.path(), false);

    let out = p
        .produce(
            &small_request(),
            Needs {
                video: false,
                still: true,
            },
        )
        .await
        .unwrap();
    assert!(out.video.is_none());
    assert!(out.still.is_some());
    assert_eq!(frames.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_scene_fails_in_compile() {
    let root = tempfile::tempdir().unwrap();
    let (p, frames) = producer(root.path(), false);
    let p = Producer {
        scene_id: "Missing".to_string(),
        ..p
    };

    let failure = p.produce(&small_request(), Needs::ALL).await.unwrap_err();
    assert_eq!(failure.stage, Stage::Compile);
    assert!(matches!(failure.error, ReelError::CompositionNotFound(_)));
    assert_eq!(failure.http_status(), 404);
    assert_eq!(frames.calls.load(Ordering::SeqCst), 0);
    assert_eq!(entries(root.path()), 0);
}

#[tokio::test]
async fn invalid_parameter_is_a_bad_request() {
    let root = tempfile::tempdir().unwrap();
    let (p, _) = producer(root.path(), false);
    let req = RenderRequest::from_pairs([("font", "comic-sans")]);

    let failure = p.produce(&req, Needs::ALL).await.unwrap_err();
    assert_eq!(failure.stage, Stage::Compile);
    assert_eq!(failure.http_status(), 400);
}

#[tokio::test]
async fn stitch_failure_aborts_and_cleans_up() {
    let root = tempfile::tempdir().unwrap();
    let (p, frames) = producer(root.path(), true);

    let failure = p.produce(&small_request(), Needs::ALL).await.unwrap_err();
    assert_eq!(failure.stage, Stage::Stitch);
    assert_eq!(failure.http_status(), 500);
    assert_eq!(frames.calls.load(Ordering::SeqCst), 1);
    assert_eq!(entries(root.path()), 0);
}

#[tokio::test]
async fn abandoned_jobs_hold_their_slot_until_the_stage_returns() {
    let root = tempfile::tempdir().unwrap();
    let scenes = Arc::new(SceneRegistry::with_builtin("."));
    let stitcher = Arc::new(SlowStitcher {
        delay: Duration::from_millis(800),
        running: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let p = Producer::new(
        "Scene",
        scenes.clone(),
        Arc::new(CpuFrameRenderer::new(Arc::clone(&scenes), Some(2)).unwrap()),
        stitcher.clone(),
        Arc::new(CpuStillRenderer::new(scenes)),
        1,
    )
    .with_workspace_root(Some(root.path().to_path_buf()));

    for _ in 0..3 {
        let res = tokio::time::timeout(
            Duration::from_millis(300),
            p.produce(&small_request(), Needs::ALL),
        )
        .await;
        assert!(res.is_err(), "job should outlive the timeout");
    }

    // Only gets the slot once every abandoned stitch has returned.
    let out = p.produce(&small_request(), Needs::ALL).await.unwrap();
    assert!(out.video.is_some());
    assert_eq!(stitcher.peak.load(Ordering::SeqCst), 1);
    assert_eq!(stitcher.running.load(Ordering::SeqCst), 0);

    drop(out);
    assert_eq!(entries(root.path()), 0);
}

#[test]
fn needs_emptiness() {
    assert!(!Needs::ALL.is_empty());
    assert!(
        Needs {
            video: false,
            still: false
        }
        .is_empty()
    );
}

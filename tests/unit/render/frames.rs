use std::sync::atomic::{AtomicU64, Ordering};

use super::*;
use crate::request::RenderRequest;

fn small_comp(scenes: &SceneRegistry, frames: &str) -> CompositionDescriptor {
    use crate::scene::compiler::SceneCompiler as _;
    scenes
        .compile(
            "Scene",
            &RenderRequest::from_pairs([
                ("width", "16"),
                ("height", "16"),
                ("durationInFrames", frames),
            ]),
        )
        .unwrap()
}

#[test]
fn renders_every_frame_in_order() {
    let scenes = Arc::new(SceneRegistry::with_builtin("."));
    let renderer = CpuFrameRenderer::new(scenes.clone(), Some(2)).unwrap();
    let comp = small_comp(&scenes, "12");
    let ws = Workspace::create(None).unwrap();

    let manifest = renderer.render(&comp, &ws, &LogProgress::new("test")).unwrap();
    assert_eq!(manifest.frames.len(), 12);
    assert_eq!(manifest.format, FrameFormat::Jpeg);
    assert!(manifest.media.is_empty());
    for (i, path) in manifest.frames.iter().enumerate() {
        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            format!("frame-{i:05}.jpeg")
        );
        let img = image::open(path).unwrap();
        assert_eq!((img.width(), img.height()), (16, 16));
    }
    assert_eq!(
        manifest.pattern(),
        ws.frames_dir().join("frame-%05d.jpeg")
    );
}

#[test]
fn progress_is_monotonic_and_complete() {
    let scenes = Arc::new(SceneRegistry::with_builtin("."));
    let renderer = CpuFrameRenderer::new(scenes.clone(), Some(4)).unwrap();
    let comp = small_comp(&scenes, "25");
    let ws = Workspace::create(None).unwrap();

    let last = AtomicU64::new(0);
    let calls = AtomicU64::new(0);
    let sink = |done: u64, total: u64| {
        assert_eq!(total, 25);
        let prev = last.swap(done, Ordering::SeqCst);
        assert!(done > prev, "progress went backwards: {prev} -> {done}");
        calls.fetch_add(1, Ordering::SeqCst);
    };
    renderer.render(&comp, &ws, &sink).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 25);
    assert_eq!(last.load(Ordering::SeqCst), 25);
}

#[test]
fn png_frames_are_supported() {
    let scenes = Arc::new(SceneRegistry::with_builtin("."));
    let renderer = CpuFrameRenderer::new(scenes.clone(), Some(1))
        .unwrap()
        .with_format(FrameFormat::Png);
    let comp = small_comp(&scenes, "2");
    let ws = Workspace::create(None).unwrap();
    let manifest = renderer.render(&comp, &ws, &|_: u64, _: u64| {}).unwrap();
    assert_eq!(
        manifest.frames[1].file_name().unwrap().to_string_lossy(),
        "frame-00001.png"
    );
}

#[test]
fn unknown_scene_fails_render() {
    let scenes = Arc::new(SceneRegistry::with_builtin("."));
    let renderer = CpuFrameRenderer::new(scenes.clone(), Some(1)).unwrap();
    let mut comp = small_comp(&scenes, "2");
    comp.scene_id = "Gone".to_string();
    let ws = Workspace::create(None).unwrap();
    assert!(renderer.render(&comp, &ws, &|_: u64, _: u64| {}).is_err());
}

#[test]
fn zero_threads_is_rejected() {
    assert!(build_thread_pool(Some(0)).is_err());
    assert!(build_thread_pool(Some(1)).is_ok());
}

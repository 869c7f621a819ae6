use std::collections::BTreeMap;

use super::*;
use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::render::frames::FrameFormat;

fn comp(frames: u64) -> CompositionDescriptor {
    CompositionDescriptor {
        scene_id: "Scene".to_string(),
        canvas: Canvas {
            width: 64,
            height: 32,
        },
        fps: Fps::new(30, 1).unwrap(),
        duration: FrameIndex(frames),
        still_frame: FrameIndex(0),
        props: BTreeMap::new(),
    }
}

fn manifest(dir: &Path, frames: u64) -> FrameManifest {
    FrameManifest {
        dir: dir.to_path_buf(),
        frames: (0..frames)
            .map(|i| dir.join(format!("frame-{i:05}.jpeg")))
            .collect(),
        format: FrameFormat::Jpeg,
        media: Vec::new(),
    }
}

fn strings(args: &[OsString]) -> Vec<String> {
    args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
}

#[test]
fn silent_video_args_use_pattern_and_h264() {
    let args = strings(&stitch_args(
        &manifest(Path::new("/w/frames"), 60),
        &comp(60),
        &[],
        Path::new("/w/out.mp4"),
    ));

    let pos = |needle: &str| args.iter().position(|a| a == needle).unwrap();
    assert_eq!(args[pos("-framerate") + 1], "30/1");
    assert_eq!(args[pos("-start_number") + 1], "0");
    assert_eq!(args[pos("-i") + 1], "/w/frames/frame-%05d.jpeg");
    assert_eq!(args[pos("-c:v") + 1], "libx264");
    assert_eq!(args[pos("-pix_fmt") + 1], "yuv420p");
    assert_eq!(args[pos("-movflags") + 1], "+faststart");
    assert_eq!(args[pos("-frames:v") + 1], "60");
    assert_eq!(args[pos("-t") + 1], "2.000000");
    assert!(args.contains(&"-an".to_string()));
    assert!(!args.contains(&"-filter_complex".to_string()));
    assert_eq!(args.last().unwrap(), "/w/out.mp4");
}

#[test]
fn audio_inputs_are_delayed_and_mixed() {
    let audio = [
        AudioInput {
            path: PathBuf::from("/a/one.mp4"),
            delay_ms: 0,
            volume: 1.0,
        },
        AudioInput {
            path: PathBuf::from("/a/two.mp4"),
            delay_ms: 500,
            volume: 0.5,
        },
    ];
    let args = strings(&stitch_args(
        &manifest(Path::new("/w/frames"), 30),
        &comp(30),
        &audio,
        Path::new("/w/out.mp4"),
    ));

    let inputs: Vec<&String> = args
        .iter()
        .zip(args.iter().skip(1))
        .filter(|(flag, _)| *flag == "-i")
        .map(|(_, v)| v)
        .collect();
    assert_eq!(inputs.len(), 3);
    assert_eq!(inputs[1], "/a/one.mp4");
    assert_eq!(inputs[2], "/a/two.mp4");

    let graph_pos = args.iter().position(|a| a == "-filter_complex").unwrap();
    let graph = &args[graph_pos + 1];
    assert!(graph.contains("[1:a]adelay=delays=0:all=1,volume=1[a0]"));
    assert!(graph.contains("[2:a]adelay=delays=500:all=1,volume=0.5[a1]"));
    assert!(graph.ends_with("[a0][a1]amix=inputs=2:duration=longest:normalize=0[aout]"));
    assert!(args.contains(&"[aout]".to_string()));
    assert!(args.contains(&"aac".to_string()));
    assert!(!args.contains(&"-an".to_string()));
}

#[test]
fn audio_delay_follows_asset_start_frame() {
    let asset = MediaAsset {
        path: PathBuf::from("/a/clip.mp4"),
        start: FrameIndex(45),
        volume: 0.8,
    };
    let input = AudioInput::from_asset(&asset, &comp(90));
    assert_eq!(input.delay_ms, 1500);
    assert_eq!(input.volume, 0.8);
}

#[test]
fn frame_count_mismatch_fails_before_spawning() {
    let ws = Workspace::create(None).unwrap();
    let err = FfmpegStitcher::new()
        .stitch(&manifest(&ws.frames_dir(), 3), &comp(4), &ws)
        .unwrap_err();
    assert!(matches!(err, ReelError::StitchFailed(_)));
}

#[test]
fn ensure_parent_dir_creates_missing_dirs() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("a/b/out.mp4");
    ensure_parent_dir(&out).unwrap();
    assert!(tmp.path().join("a/b").is_dir());
}

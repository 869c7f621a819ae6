use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::foundation::error::{ReelError, ReelResult};
use crate::pipeline::workspace::Workspace;
use crate::render::frames::FrameManifest;
use crate::scene::compiler::{CompositionDescriptor, MediaAsset};

/// Encodes a frame sequence (plus any embedded media audio) into one video file.
pub trait VideoStitcher: Send + Sync {
    /// Stitch `manifest` into `workspace.video_path()` and return that path.
    fn stitch(
        &self,
        manifest: &FrameManifest,
        comp: &CompositionDescriptor,
        workspace: &Workspace,
    ) -> ReelResult<PathBuf>;
}

/// Return `true` when an `ffmpeg` binary can be executed from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Create the parent directory of `path` if it is missing.
pub fn ensure_parent_dir(path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Stream layout of a media file as reported by `ffprobe`.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaInfo {
    /// Probed file.
    pub path: PathBuf,
    /// Container duration in seconds (0 when unknown).
    pub duration_sec: f64,
    /// Whether the file carries a video stream.
    pub has_video: bool,
    /// Whether the file carries an audio stream.
    pub has_audio: bool,
}

/// Probe `path` with `ffprobe`.
pub fn probe_media(path: &Path) -> ReelResult<MediaInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        #[serde(default)]
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|e| ReelError::stitch_failed(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(ReelError::stitch_failed(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| ReelError::stitch_failed(format!("ffprobe json parse failed: {e}")))?;
    let has = |kind: &str| {
        parsed
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some(kind))
    };

    Ok(MediaInfo {
        path: path.to_path_buf(),
        duration_sec: parsed
            .format
            .as_ref()
            .and_then(|f| f.duration.as_deref())
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0),
        has_video: has("video"),
        has_audio: has("audio"),
    })
}

/// One audio-bearing media input of a stitch.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioInput {
    /// Media file to take audio from.
    pub path: PathBuf,
    /// Delay before the audio starts, in milliseconds.
    pub delay_ms: u64,
    /// Linear gain.
    pub volume: f32,
}

impl AudioInput {
    /// Place `asset` on the timeline of `comp`.
    pub fn from_asset(asset: &MediaAsset, comp: &CompositionDescriptor) -> Self {
        let delay = comp.fps.frames_to_secs(asset.start.0);
        Self {
            path: asset.path.clone(),
            delay_ms: (delay * 1000.0).round() as u64,
            volume: asset.volume,
        }
    }
}

/// Build the `ffmpeg` argument list for one stitch.
///
/// The video is exactly `comp.frame_count()` frames long; audio longer than that is cut and
/// shorter audio leaves silence.
pub fn stitch_args(
    manifest: &FrameManifest,
    comp: &CompositionDescriptor,
    audio: &[AudioInput],
    out: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    let mut push = |a: &str| args.push(a.into());
    push("-y");
    push("-loglevel");
    push("error");
    push("-framerate");
    push(&format!("{}/{}", comp.fps.num, comp.fps.den));
    push("-start_number");
    push("0");
    push("-i");
    args.push(manifest.pattern().into_os_string());

    for input in audio {
        args.push("-i".into());
        args.push(input.path.clone().into_os_string());
    }

    if !audio.is_empty() {
        let mut graph = String::new();
        for (i, input) in audio.iter().enumerate() {
            graph.push_str(&format!(
                "[{}:a]adelay=delays={}:all=1,volume={}[a{i}];",
                i + 1,
                input.delay_ms,
                input.volume
            ));
        }
        for i in 0..audio.len() {
            graph.push_str(&format!("[a{i}]"));
        }
        graph.push_str(&format!(
            "amix=inputs={}:duration=longest:normalize=0[aout]",
            audio.len()
        ));

        for a in ["-filter_complex", graph.as_str(), "-map", "0:v", "-map", "[aout]"] {
            args.push(a.into());
        }
        for a in ["-c:a", "aac", "-b:a", "192k"] {
            args.push(a.into());
        }
    } else {
        args.push("-an".into());
    }

    let frames = comp.frame_count().to_string();
    let secs = format!("{:.6}", comp.fps.frames_to_secs(comp.frame_count()));
    for a in [
        "-c:v",
        "libx264",
        "-pix_fmt",
        "yuv420p",
        "-movflags",
        "+faststart",
        "-frames:v",
        frames.as_str(),
        "-t",
        secs.as_str(),
    ] {
        args.push(a.into());
    }
    args.push(out.as_os_str().to_os_string());
    args
}

/// [`VideoStitcher`] that shells out to the system `ffmpeg`.
///
/// Output is H.264 in yuv420p with `+faststart`; embedded media audio is mixed to AAC.
#[derive(Clone, Debug, Default)]
pub struct FfmpegStitcher;

impl FfmpegStitcher {
    /// Create a stitcher.
    pub fn new() -> Self {
        Self
    }

    fn audio_inputs(
        manifest: &FrameManifest,
        comp: &CompositionDescriptor,
    ) -> ReelResult<Vec<AudioInput>> {
        let mut inputs = Vec::new();
        for asset in &manifest.media {
            let info = probe_media(&asset.path)?;
            if !info.has_audio {
                tracing::debug!(path = %asset.path.display(), "media has no audio stream");
                continue;
            }
            inputs.push(AudioInput::from_asset(asset, comp));
        }
        Ok(inputs)
    }
}

impl VideoStitcher for FfmpegStitcher {
    #[tracing::instrument(skip_all, fields(frames = manifest.frames.len(), media = manifest.media.len()))]
    fn stitch(
        &self,
        manifest: &FrameManifest,
        comp: &CompositionDescriptor,
        workspace: &Workspace,
    ) -> ReelResult<PathBuf> {
        if manifest.frames.len() as u64 != comp.frame_count() {
            return Err(ReelError::stitch_failed(format!(
                "frame sequence has {} frames, composition expects {}",
                manifest.frames.len(),
                comp.frame_count()
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(ReelError::stitch_failed(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let out = workspace.video_path();
        ensure_parent_dir(&out)?;
        let audio = Self::audio_inputs(manifest, comp)?;

        let output = Command::new("ffmpeg")
            .args(stitch_args(manifest, comp, &audio, &out))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                ReelError::stitch_failed(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReelError::stitch_failed(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        if !out.is_file() {
            return Err(ReelError::stitch_failed(format!(
                "ffmpeg reported success but '{}' is missing",
                out.display()
            )));
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;

use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rayon::prelude::*;

use crate::foundation::core::FrameIndex;
use crate::foundation::error::{ReelError, ReelResult};
use crate::pipeline::workspace::Workspace;
use crate::scene::compiler::{CompositionDescriptor, MediaAsset, Scene, SceneRegistry};

const JPEG_QUALITY: u8 = 90;

/// One-way progress reporting for frame rendering.
///
/// `frame_rendered` receives the number of frames finished so far; calls are serialized and the
/// count never decreases. Sinks must not block for long: they run on render worker threads.
pub trait ProgressSink: Send + Sync {
    /// Called once per finished frame.
    fn frame_rendered(&self, done: u64, total: u64);
}

impl<F> ProgressSink for F
where
    F: Fn(u64, u64) + Send + Sync,
{
    fn frame_rendered(&self, done: u64, total: u64) {
        self(done, total)
    }
}

/// Progress sink that logs every tenth frame.
#[derive(Clone, Debug)]
pub struct LogProgress {
    job: String,
}

impl LogProgress {
    /// Log progress tagged with `job`.
    pub fn new(job: impl Into<String>) -> Self {
        Self { job: job.into() }
    }
}

impl ProgressSink for LogProgress {
    fn frame_rendered(&self, done: u64, total: u64) {
        if done.is_multiple_of(10) || done == total {
            tracing::debug!(job = %self.job, done, total, "rendered frames");
        }
    }
}

/// Image format of a rendered frame sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    /// Baseline JPEG.
    Jpeg,
    /// Lossless PNG.
    Png,
}

impl FrameFormat {
    /// File extension for frames of this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }
}

/// Everything the stitcher needs to know about a rendered frame sequence.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct FrameManifest {
    /// Directory holding the frames.
    pub dir: PathBuf,
    /// Frame files in timeline order, named `frame-00000.<ext>`, `frame-00001.<ext>`, ...
    pub frames: Vec<PathBuf>,
    /// Frame image format.
    pub format: FrameFormat,
    /// Embedded media to mix into the video.
    pub media: Vec<MediaAsset>,
}

impl FrameManifest {
    /// `printf`-style input pattern understood by `ffmpeg`'s image2 demuxer.
    pub fn pattern(&self) -> PathBuf {
        self.dir.join(format!("frame-%05d.{}", self.format.extension()))
    }
}

/// File name of frame `idx` in a sequence of `format`.
pub fn frame_file_name(idx: FrameIndex, format: FrameFormat) -> String {
    format!("frame-{:05}.{}", idx.0, format.extension())
}

/// Renders the full frame sequence of a composition into a workspace.
pub trait FrameRenderer: Send + Sync {
    /// Render every frame of `comp` into `workspace`, reporting progress to `progress`.
    fn render(
        &self,
        comp: &CompositionDescriptor,
        workspace: &Workspace,
        progress: &dyn ProgressSink,
    ) -> ReelResult<FrameManifest>;
}

/// CPU frame renderer: paints frames through the scene registry on a shared rayon pool.
pub struct CpuFrameRenderer {
    scenes: Arc<SceneRegistry>,
    pool: Arc<rayon::ThreadPool>,
    format: FrameFormat,
}

impl CpuFrameRenderer {
    /// Create a renderer with its own pool of `threads` workers (rayon default when `None`).
    pub fn new(scenes: Arc<SceneRegistry>, threads: Option<usize>) -> ReelResult<Self> {
        Ok(Self {
            scenes,
            pool: Arc::new(build_thread_pool(threads)?),
            format: FrameFormat::Jpeg,
        })
    }

    /// Write frames as `format` instead of JPEG.
    pub fn with_format(mut self, format: FrameFormat) -> Self {
        self.format = format;
        self
    }
}

impl FrameRenderer for CpuFrameRenderer {
    #[tracing::instrument(skip_all, fields(scene = %comp.scene_id, frames = comp.frame_count()))]
    fn render(
        &self,
        comp: &CompositionDescriptor,
        workspace: &Workspace,
        progress: &dyn ProgressSink,
    ) -> ReelResult<FrameManifest> {
        let scene = self.scenes.get(&comp.scene_id)?;
        let dir = workspace.frames_dir();
        std::fs::create_dir_all(&dir).map_err(|e| {
            ReelError::render_failed(format!(
                "failed to create frame directory '{}': {e}",
                dir.display()
            ))
        })?;

        let total = comp.frame_count();
        let done = Mutex::new(0u64);
        let format = self.format;

        let frames = self.pool.install(|| {
            (0..total)
                .into_par_iter()
                .map(|f| -> ReelResult<PathBuf> {
                    let idx = FrameIndex(f);
                    let path = dir.join(frame_file_name(idx, format));
                    let img = scene.paint(comp, idx)?;
                    write_frame(&img, &path, format)?;

                    let mut done = done.lock().map_err(|_| {
                        ReelError::render_failed("progress counter poisoned by a panicked worker")
                    })?;
                    *done += 1;
                    progress.frame_rendered(*done, total);
                    Ok(path)
                })
                .collect::<ReelResult<Vec<_>>>()
        })?;

        Ok(FrameManifest {
            dir,
            frames,
            format,
            media: scene.media(comp)?,
        })
    }
}

fn write_frame(img: &image::RgbaImage, path: &Path, format: FrameFormat) -> ReelResult<()> {
    let fail = |e: &dyn std::fmt::Display| {
        ReelError::render_failed(format!("write frame '{}': {e}", path.display()))
    };

    match format {
        FrameFormat::Png => img
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| fail(&e)),
        FrameFormat::Jpeg => {
            // JPEG has no alpha channel.
            let rgb = image::DynamicImage::ImageRgba8(img.clone()).to_rgb8();
            let file = std::fs::File::create(path).map_err(|e| fail(&e))?;
            let mut enc = image::codecs::jpeg::JpegEncoder::new_with_quality(
                BufWriter::new(file),
                JPEG_QUALITY,
            );
            enc.encode_image(&rgb).map_err(|e| fail(&e))
        }
    }
}

pub(crate) fn build_thread_pool(threads: Option<usize>) -> ReelResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(ReelError::config("render threads must be >= 1 when set"));
    }

    let mut builder =
        rayon::ThreadPoolBuilder::new().thread_name(|i| format!("reelpin-render-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| ReelError::config(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/render/frames.rs"]
mod tests;

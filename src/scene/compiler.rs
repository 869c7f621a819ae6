use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::{ReelError, ReelResult};
use crate::request::RenderRequest;

/// A compiled, render-ready composition.
///
/// Everything a renderer needs travels in here, including the request parameters (`props`),
/// so concurrent jobs never share scene configuration.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct CompositionDescriptor {
    /// Scene that produced (and will paint) this composition.
    pub scene_id: String,
    /// Output dimensions.
    pub canvas: Canvas,
    /// Output frame rate.
    pub fps: Fps,
    /// Total frame count; frames are `0..duration`.
    pub duration: FrameIndex,
    /// Frame painted by the still pass.
    pub still_frame: FrameIndex,
    /// Request parameters, sorted by name.
    pub props: BTreeMap<String, String>,
}

impl CompositionDescriptor {
    /// Number of frames in the composition.
    pub fn frame_count(&self) -> u64 {
        self.duration.0
    }

    /// Check the invariants the render and encode stages rely on.
    pub fn validate(&self) -> ReelResult<()> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(ReelError::invalid_params(
                "composition width/height must be non-zero",
            ));
        }
        if !self.canvas.width.is_multiple_of(2) || !self.canvas.height.is_multiple_of(2) {
            // yuv420p output needs even dimensions.
            return Err(ReelError::invalid_params(
                "composition width/height must be even",
            ));
        }
        if self.fps.num == 0 || self.fps.den == 0 {
            return Err(ReelError::invalid_params("composition fps must be non-zero"));
        }
        if self.duration.0 == 0 {
            return Err(ReelError::invalid_params(
                "composition must have at least one frame",
            ));
        }
        if self.still_frame >= self.duration {
            return Err(ReelError::invalid_params(
                "still frame must be inside the composition",
            ));
        }
        Ok(())
    }
}

/// External media embedded in a composition, mixed in by the stitcher.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct MediaAsset {
    /// Absolute path of the media file.
    pub path: PathBuf,
    /// Timeline frame where the media starts playing.
    pub start: FrameIndex,
    /// Linear gain applied to its audio.
    pub volume: f32,
}

/// A parameterized scene: turns request parameters into a composition and paints its frames.
pub trait Scene: Send + Sync {
    /// Stable id requests are routed by.
    fn id(&self) -> &str;

    /// Validate `request` and describe the composition it selects.
    fn compose(&self, request: &RenderRequest) -> ReelResult<CompositionDescriptor>;

    /// Paint one frame as straight-alpha RGBA8.
    fn paint(&self, comp: &CompositionDescriptor, frame: FrameIndex)
    -> ReelResult<image::RgbaImage>;

    /// Media the stitcher should mix into the final video.
    fn media(&self, _comp: &CompositionDescriptor) -> ReelResult<Vec<MediaAsset>> {
        Ok(Vec::new())
    }
}

/// Resolves a scene id plus request parameters to a [`CompositionDescriptor`].
pub trait SceneCompiler: Send + Sync {
    /// Compile `scene_id` with `request`.
    ///
    /// Fails with [`ReelError::CompositionNotFound`] when `scene_id` is unknown.
    fn compile(&self, scene_id: &str, request: &RenderRequest)
    -> ReelResult<CompositionDescriptor>;
}

/// Id-keyed set of scenes, initialized once at startup.
#[derive(Clone, Default)]
pub struct SceneRegistry {
    scenes: BTreeMap<String, Arc<dyn Scene>>,
}

impl SceneRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in scene, resolving `videoSrc` under `assets_root`.
    pub fn with_builtin(assets_root: impl Into<PathBuf>) -> Self {
        let mut reg = Self::new();
        reg.register(Arc::new(crate::scene::builtin::GradientScene::new(
            assets_root,
        )));
        reg
    }

    /// Add or replace a scene under its id.
    pub fn register(&mut self, scene: Arc<dyn Scene>) {
        self.scenes.insert(scene.id().to_string(), scene);
    }

    /// Look up a scene.
    pub fn get(&self, id: &str) -> ReelResult<Arc<dyn Scene>> {
        self.scenes.get(id).cloned().ok_or_else(|| {
            ReelError::composition_not_found(format!(
                "no composition called '{id}' (available: {})",
                self.ids().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.scenes.keys().map(String::as_str)
    }
}

impl SceneCompiler for SceneRegistry {
    #[tracing::instrument(skip(self, request), fields(params = request.len()))]
    fn compile(
        &self,
        scene_id: &str,
        request: &RenderRequest,
    ) -> ReelResult<CompositionDescriptor> {
        let scene = self.get(scene_id)?;
        let comp = scene.compose(request)?;
        if comp.scene_id != scene_id {
            return Err(ReelError::render_failed(format!(
                "scene '{scene_id}' described itself as '{}'",
                comp.scene_id
            )));
        }
        comp.validate()?;
        Ok(comp)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/compiler.rs"]
mod tests;

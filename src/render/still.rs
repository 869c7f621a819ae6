use std::path::PathBuf;
use std::sync::Arc;

use crate::foundation::error::{ReelError, ReelResult};
use crate::pipeline::workspace::Workspace;
use crate::scene::compiler::{CompositionDescriptor, SceneRegistry};

/// Renders the single representative image of a composition.
///
/// This is its own render pass; it never reads the frame sequence.
pub trait StillRenderer: Send + Sync {
    /// Paint `comp.still_frame` into the workspace and return the image path.
    fn render_still(&self, comp: &CompositionDescriptor, workspace: &Workspace)
    -> ReelResult<PathBuf>;
}

/// CPU still renderer writing `out.png`.
pub struct CpuStillRenderer {
    scenes: Arc<SceneRegistry>,
}

impl CpuStillRenderer {
    /// Create a still renderer painting through `scenes`.
    pub fn new(scenes: Arc<SceneRegistry>) -> Self {
        Self { scenes }
    }
}

impl StillRenderer for CpuStillRenderer {
    #[tracing::instrument(skip_all, fields(scene = %comp.scene_id, frame = comp.still_frame.0))]
    fn render_still(
        &self,
        comp: &CompositionDescriptor,
        workspace: &Workspace,
    ) -> ReelResult<PathBuf> {
        let scene = self.scenes.get(&comp.scene_id)?;
        let img = scene.paint(comp, comp.still_frame)?;
        let out = workspace.still_path();

        image::save_buffer_with_format(
            &out,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .map_err(|e| ReelError::render_failed(format!("write png '{}': {e}", out.display())))?;
        Ok(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/still.rs"]
mod tests;

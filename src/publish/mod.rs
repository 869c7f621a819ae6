//! Publishing artifacts to a content-addressed pinning service.

use crate::foundation::core::{Artifact, ArtifactKind};
use crate::foundation::error::ReelResult;

/// Pinata-compatible multipart publisher.
pub mod pinning;

pub use pinning::{PinningConfig, PinningPublisher, Secret};

/// Public location of a published artifact.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct PublishedReference {
    /// Artifact kind that was published.
    pub kind: ArtifactKind,
    /// Content id returned by the pinning service.
    pub content_id: String,
    /// `<gateway>/<content id>`.
    pub url: String,
}

/// Uploads one artifact and returns where it can be fetched.
///
/// Implementations must not retry and must report every failure as
/// [`crate::ReelError::PublishFailed`].
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    /// Upload `artifact`.
    async fn publish(&self, artifact: &Artifact) -> ReelResult<PublishedReference>;
}

/// Join a gateway base and a content id with exactly one slash.
pub fn gateway_url(gateway: &str, content_id: &str) -> String {
    format!(
        "{}/{}",
        gateway.trim_end_matches('/'),
        content_id.trim_start_matches('/')
    )
}

#[cfg(test)]
#[path = "../../tests/unit/publish/mod.rs"]
mod tests;

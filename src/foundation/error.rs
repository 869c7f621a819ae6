use crate::foundation::core::ArtifactKind;

/// Convenience result type used across reelpin.
pub type ReelResult<T> = Result<T, ReelError>;

/// Top-level error taxonomy used by pipeline stages, stores, and publishers.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// The requested scene id is not registered.
    #[error("composition not found: {0}")]
    CompositionNotFound(String),

    /// The scene rejected one of the request parameters.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// Frame or still rendering failed.
    #[error("render failed: {0}")]
    RenderFailed(String),

    /// Video encoding failed.
    #[error("stitch failed: {0}")]
    StitchFailed(String),

    /// An upload to the pinning service failed or was rejected.
    #[error("publish of {kind} failed{}: {payload}", status_suffix(.status))]
    PublishFailed {
        /// Artifact that was being uploaded.
        kind: ArtifactKind,
        /// HTTP status returned by the remote service, if a response arrived at all.
        status: Option<u16>,
        /// Remote error body, or the transport error text.
        payload: String,
    },

    /// The cache backend could not be read or written.
    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    /// The job did not finish within its deadline.
    #[error("job timed out: {0}")]
    Timeout(String),

    /// Invalid process configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    /// Build a [`ReelError::CompositionNotFound`] value.
    pub fn composition_not_found(msg: impl Into<String>) -> Self {
        Self::CompositionNotFound(msg.into())
    }

    /// Build a [`ReelError::InvalidParams`] value.
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::InvalidParams(msg.into())
    }

    /// Build a [`ReelError::RenderFailed`] value.
    pub fn render_failed(msg: impl Into<String>) -> Self {
        Self::RenderFailed(msg.into())
    }

    /// Build a [`ReelError::StitchFailed`] value.
    pub fn stitch_failed(msg: impl Into<String>) -> Self {
        Self::StitchFailed(msg.into())
    }

    /// Build a [`ReelError::PublishFailed`] value.
    pub fn publish_failed(
        kind: ArtifactKind,
        status: Option<u16>,
        payload: impl Into<String>,
    ) -> Self {
        Self::PublishFailed {
            kind,
            status,
            payload: payload.into(),
        }
    }

    /// Build a [`ReelError::CacheUnavailable`] value.
    pub fn cache_unavailable(msg: impl Into<String>) -> Self {
        Self::CacheUnavailable(msg.into())
    }

    /// Build a [`ReelError::Timeout`] value.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Build a [`ReelError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Stable snake_case code used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::CompositionNotFound(_) => "composition_not_found",
            Self::InvalidParams(_) => "invalid_params",
            Self::RenderFailed(_) => "render_failed",
            Self::StitchFailed(_) => "stitch_failed",
            Self::PublishFailed { .. } => "publish_failed",
            Self::CacheUnavailable(_) => "cache_unavailable",
            Self::Timeout(_) => "timeout",
            Self::Config(_) => "config",
            Self::Other(_) => "internal",
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" with status {s}")).unwrap_or_default()
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;

use std::fmt;

use crate::foundation::error::ReelError;
use crate::publish::PublishedReference;
use crate::request::Fingerprint;

/// JSON form of an error: stable code plus human message.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ErrorBody {
    /// [`ReelError::code`].
    pub code: &'static str,
    /// Display text of the error.
    pub message: String,
    /// Remote HTTP status of a failed upload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Remote error payload of a failed upload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl From<&ReelError> for ErrorBody {
    fn from(err: &ReelError) -> Self {
        let (status, payload) = match err {
            ReelError::PublishFailed {
                status, payload, ..
            } => (*status, Some(payload.clone())),
            _ => (None, None),
        };
        Self {
            code: err.code(),
            message: err.to_string(),
            status,
            payload,
        }
    }
}

/// Publish outcome of one artifact.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ArtifactOutcome {
    /// Uploaded; fetchable at `url`.
    Published {
        /// Public gateway URL.
        url: String,
        /// Content id from the pinning service.
        content_id: String,
    },
    /// Upload failed.
    Failed {
        /// What went wrong.
        error: ErrorBody,
    },
}

impl ArtifactOutcome {
    /// Public URL when published.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Published { url, .. } => Some(url),
            Self::Failed { .. } => None,
        }
    }

    /// Return `true` when the artifact was published.
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

impl From<Result<PublishedReference, ReelError>> for ArtifactOutcome {
    fn from(res: Result<PublishedReference, ReelError>) -> Self {
        match res {
            Ok(r) => Self::Published {
                url: r.url,
                content_id: r.content_id,
            },
            Err(e) => Self::Failed {
                error: ErrorBody::from(&e),
            },
        }
    }
}

/// What happened to the cache after publishing.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CacheWriteOutcome {
    /// Every freshly produced artifact was stored.
    Stored,
    /// Nothing was written: cache disabled, nothing new, or a publish failed.
    Skipped,
    /// The backend rejected a write; the job still succeeded.
    Failed {
        /// Backend error.
        error: ErrorBody,
    },
}

/// Overall publish status of a job that produced its artifacts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Both artifacts published.
    Complete,
    /// Exactly one artifact published.
    Partial,
    /// Neither artifact published.
    PublishFailed,
}

impl JobStatus {
    /// Derive the status from the two publish outcomes.
    pub fn from_outcomes(image: &ArtifactOutcome, video: &ArtifactOutcome) -> Self {
        match (image.is_published(), video.is_published()) {
            (true, true) => Self::Complete,
            (false, false) => Self::PublishFailed,
            _ => Self::Partial,
        }
    }

    /// HTTP status the server answers with.
    pub fn http_status(self) -> u16 {
        match self {
            Self::Complete => 200,
            Self::Partial => 207,
            Self::PublishFailed => 502,
        }
    }
}

/// Result of a job that got as far as publishing.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct RenderResponse {
    /// Request fingerprint (cache key).
    pub fingerprint: Fingerprint,
    /// Overall status.
    pub status: JobStatus,
    /// `true` when both artifacts came from the cache and nothing was rendered.
    pub cached: bool,
    /// Still image outcome.
    pub image: ArtifactOutcome,
    /// Video outcome.
    pub video: ArtifactOutcome,
    /// Cache write outcome.
    pub cache_write: CacheWriteOutcome,
}

/// Pipeline stage a job can fail in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Workspace creation.
    Workspace,
    /// Scene compilation.
    Compile,
    /// Frame sequence rendering.
    Render,
    /// Video encoding.
    Stitch,
    /// Still rendering.
    Still,
    /// The job ran past its deadline.
    Timeout,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Workspace => "workspace",
            Self::Compile => "compile",
            Self::Render => "render",
            Self::Stitch => "stitch",
            Self::Still => "still",
            Self::Timeout => "timeout",
        })
    }
}

/// A job aborted before publishing.
#[derive(thiserror::Error, Debug)]
#[error("{stage} stage failed: {error}")]
pub struct JobFailure {
    /// Stage that failed.
    pub stage: Stage,
    /// Underlying error.
    pub error: ReelError,
}

impl JobFailure {
    /// Attribute `error` to `stage`, turning untyped errors into the stage's own variant.
    pub fn new(stage: Stage, error: ReelError) -> Self {
        let error = match (stage, error) {
            (Stage::Render | Stage::Still, ReelError::Other(e)) => {
                ReelError::render_failed(format!("{e:#}"))
            }
            (Stage::Stitch, ReelError::Other(e)) => ReelError::stitch_failed(format!("{e:#}")),
            (_, e) => e,
        };
        Self { stage, error }
    }

    /// HTTP status the server answers with.
    pub fn http_status(&self) -> u16 {
        if self.stage == Stage::Timeout {
            return 504;
        }
        match self.error {
            ReelError::CompositionNotFound(_) => 404,
            ReelError::InvalidParams(_) => 400,
            _ => 500,
        }
    }

    /// JSON body: `{"error": {"stage", "code", "message"}}`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "stage": self.stage,
                "code": self.error.code(),
                "message": self.error.to_string(),
            }
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/response.rs"]
mod tests;

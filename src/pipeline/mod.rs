//! Job orchestration: fingerprint, cache, produce, publish, respond.

/// Whole-job orchestration.
pub mod orchestrator;
/// Production stages run under a job slot.
pub mod produce;
/// Response, outcome, and failure types.
pub mod response;
/// Per-job scratch directories.
pub mod workspace;

pub use orchestrator::{Orchestrator, producer_from_config};
pub use produce::{Needs, Produced, Producer};
pub use response::{
    ArtifactOutcome, CacheWriteOutcome, ErrorBody, JobFailure, JobStatus, RenderResponse, Stage,
};
pub use workspace::Workspace;

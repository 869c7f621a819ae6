//! Reelpin renders a parameterized video composition on request and publishes the results.
//!
//! Every job turns one [`RenderRequest`] into two artifacts, an MP4 video and a PNG still,
//! and uploads both to a content-addressed pinning service:
//!
//! - Fingerprint the request and consult the [`CacheStore`]
//! - Compile the scene, render frames, stitch the video, render the still
//! - Publish both artifacts concurrently and report each outcome
//!
//! The [`Orchestrator`] drives a job; [`server`] exposes it over HTTP.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod foundation;

/// Fingerprint-keyed artifact cache backends.
pub mod cache;
/// Process configuration.
pub mod config;
/// Video encoding.
pub mod encode;
/// Job orchestration.
pub mod pipeline;
/// Artifact publishing.
pub mod publish;
/// Frame and still rendering.
pub mod render;
/// Render request parameters and fingerprints.
pub mod request;
/// Scenes and scene compilation.
pub mod scene;
pub mod server;
pub mod telemetry;

pub use crate::foundation::core::{Artifact, ArtifactKind, Canvas, Fps, FrameIndex};
pub use crate::foundation::error::{ReelError, ReelResult};

pub use crate::cache::{
    CacheLookup, CacheMode, CacheStore, CachedArtifact, DisabledCache, LocalCache, RemoteCache,
    RemoteCacheConfig,
};
pub use crate::config::Config;
pub use crate::encode::ffmpeg::{FfmpegStitcher, VideoStitcher, is_ffmpeg_on_path, probe_media};
pub use crate::pipeline::{
    ArtifactOutcome, CacheWriteOutcome, JobFailure, JobStatus, Needs, Orchestrator, Producer,
    RenderResponse, Stage, Workspace,
};
pub use crate::publish::{PinningConfig, PinningPublisher, PublishedReference, Publisher};
pub use crate::render::frames::{
    CpuFrameRenderer, FrameFormat, FrameManifest, FrameRenderer, LogProgress, ProgressSink,
};
pub use crate::render::still::{CpuStillRenderer, StillRenderer};
pub use crate::request::{Fingerprint, RenderRequest};
pub use crate::scene::compiler::{
    CompositionDescriptor, MediaAsset, Scene, SceneCompiler, SceneRegistry,
};

//! Video encoding: turning a rendered frame sequence into a single MP4.

/// `ffmpeg`/`ffprobe` backed stitcher and media probing.
pub mod ffmpeg;

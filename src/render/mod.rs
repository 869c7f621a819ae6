//! CPU rendering of frame sequences and stills.

/// Frame-sequence rendering and progress reporting.
pub mod frames;
/// Single-image (still) rendering.
pub mod still;

//! Scenes and the compiler that resolves request parameters into compositions.

/// The built-in procedural scene.
pub mod builtin;
/// Composition descriptors, the `Scene` trait, and the scene registry.
pub mod compiler;

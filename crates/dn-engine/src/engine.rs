//! The external denoising engine seam
//!
//! The bridge treats the engine as a black box with a fixed frame length,
//! a model parser, a constructor and a per-frame transform. Destruction is
//! `Drop`: an engine owns its model, so releasing the engine releases the
//! state and the model together.

use crate::error::EngineResult;

/// Pluggable denoising backend.
///
/// Frames are f32 PCM in the i16 range ([-32768, 32767]), exactly
/// `FRAME_SIZE` samples long.
pub trait DenoiseEngine: Send + Sized + 'static {
    /// Parsed model representation.
    type Model: Send + 'static;

    /// Samples per processing frame. Constant for the process lifetime.
    const FRAME_SIZE: usize;

    /// Short backend name for logs.
    const NAME: &'static str;

    /// Parse a serialized model.
    ///
    /// Implementations may keep pointers into `bytes`; callers keep the
    /// buffer alive and unmoved until the engine built from the model is
    /// dropped.
    fn model_from_bytes(bytes: &[u8]) -> EngineResult<Self::Model>;

    /// Build engine state. `None` selects the backend's built-in model.
    ///
    /// On failure the model is dropped before returning.
    fn new(model: Option<Self::Model>) -> EngineResult<Self>;

    /// Transform one frame. Returns the speech probability (0-1).
    ///
    /// Advances internal filter state; frames must arrive in time order.
    fn process_frame(&mut self, output: &mut [f32], input: &[f32]) -> f32;
}

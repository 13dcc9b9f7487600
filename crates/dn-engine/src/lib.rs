//! dn-engine: denoising engine seam for the native bridge
//!
//! Wraps a frame-based neural denoiser behind [`DenoiseEngine`]:
//! - RNNoise backend via `nnnoiseless` ([`RnnoiseEngine`])
//! - Model loading with explicit byte ownership ([`ModelSource`], [`ModelBytes`])
//! - i16 ↔ f32 PCM conversion with saturating rounding ([`pcm`])
//! - Frame-batched processing over a single stateful instance ([`Denoiser`])
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dn_engine::{Denoiser, ModelSource, RnnoiseEngine};
//!
//! let mut denoiser = Denoiser::<RnnoiseEngine>::new(ModelSource::Builtin)?;
//! let clean = denoiser.process_to_vec(&noisy)?; // noisy.len() % 480 == 0
//! ```

mod denoiser;
mod engine;
mod error;
mod model;
pub mod pcm;
mod rnnoise;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use denoiser::Denoiser;
pub use engine::DenoiseEngine;
pub use error::{EngineError, EngineResult};
pub use model::{LoadedModel, ModelBytes, ModelSource, copy_bytes, load_model, read_model_file};
pub use rnnoise::RnnoiseEngine;

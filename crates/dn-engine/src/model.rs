//! Model loading and model-byte ownership
//!
//! A model comes from one of three places:
//! - `Copy`: caller memory, copied into an owned buffer before parsing
//! - `Borrowed`: caller memory the caller keeps alive for the denoiser lifetime
//! - `Builtin`: no bytes, the engine's built-in model
//!
//! The ownership tag is fixed when the model is loaded, so releasing a
//! denoiser never has to be told whether to free the bytes.

use std::fmt;
use std::path::Path;

use crate::engine::DenoiseEngine;
use crate::error::{EngineError, EngineResult};

/// Where model bytes come from
#[derive(Clone, Copy)]
pub enum ModelSource<'a> {
    /// Copy caller bytes into owned memory
    Copy(&'a [u8]),
    /// Use caller bytes in place; the caller retains ownership
    Borrowed(&'static [u8]),
    /// Engine's built-in model
    Builtin,
}

impl fmt::Debug for ModelSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Copy(bytes) => write!(f, "Copy({} bytes)", bytes.len()),
            ModelSource::Borrowed(bytes) => write!(f, "Borrowed({} bytes)", bytes.len()),
            ModelSource::Builtin => write!(f, "Builtin"),
        }
    }
}

/// Raw model bytes held alongside the engine
pub enum ModelBytes {
    /// Freed with the denoiser
    Owned(Box<[u8]>),
    /// Owned by the caller; never freed here
    Borrowed(&'static [u8]),
    /// No bytes
    Builtin,
}

impl ModelBytes {
    /// Byte view, if any
    pub fn as_slice(&self) -> Option<&[u8]> {
        match self {
            ModelBytes::Owned(bytes) => Some(bytes),
            ModelBytes::Borrowed(bytes) => Some(bytes),
            ModelBytes::Builtin => None,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().map_or(0, <[u8]>::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, ModelBytes::Owned(_))
    }
}

impl fmt::Debug for ModelBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelBytes::Owned(bytes) => write!(f, "Owned({} bytes)", bytes.len()),
            ModelBytes::Borrowed(bytes) => write!(f, "Borrowed({} bytes)", bytes.len()),
            ModelBytes::Builtin => write!(f, "Builtin"),
        }
    }
}

/// Parsed model plus the bytes it was parsed from
pub struct LoadedModel<M> {
    /// `None` for the built-in model
    pub model: Option<M>,
    pub bytes: ModelBytes,
}

/// Copy `bytes` into an owned buffer, failing instead of aborting on OOM.
pub fn copy_bytes(bytes: &[u8]) -> EngineResult<Box<[u8]>> {
    let mut owned = Vec::new();
    owned
        .try_reserve_exact(bytes.len())
        .map_err(|_| EngineError::Allocation { bytes: bytes.len() })?;
    owned.extend_from_slice(bytes);
    Ok(owned.into_boxed_slice())
}

/// Read a model file into an owned buffer.
pub fn read_model_file(path: &Path) -> EngineResult<Box<[u8]>> {
    let bytes = std::fs::read(path)?;
    if bytes.is_empty() {
        return Err(EngineError::EmptyModel);
    }
    Ok(bytes.into_boxed_slice())
}

/// Load a model for engine `E`.
///
/// On failure nothing is retained: a private copy is freed before
/// returning, and borrowed bytes are left untouched.
pub fn load_model<E: DenoiseEngine>(source: ModelSource<'_>) -> EngineResult<LoadedModel<E::Model>> {
    let (model, bytes) = match source {
        ModelSource::Builtin => {
            return Ok(LoadedModel {
                model: None,
                bytes: ModelBytes::Builtin,
            });
        }
        ModelSource::Copy(bytes) => {
            if bytes.is_empty() {
                return Err(EngineError::EmptyModel);
            }
            // Parse from the private copy, not the caller's memory: the
            // engine may keep pointers into it. Moving the box keeps the
            // heap buffer in place.
            let owned = copy_bytes(bytes)?;
            let model = E::model_from_bytes(&owned)?;
            (model, ModelBytes::Owned(owned))
        }
        ModelSource::Borrowed(bytes) => {
            if bytes.is_empty() {
                return Err(EngineError::EmptyModel);
            }
            (E::model_from_bytes(bytes)?, ModelBytes::Borrowed(bytes))
        }
    };

    log::debug!("{}: loaded model from {:?}", E::NAME, bytes);

    Ok(LoadedModel {
        model: Some(model),
        bytes,
    })
}

//! Process-wide bridge state
//!
//! One [`Bridge`] per process, built on first use by either boundary. It
//! holds the resolved configuration, the handle registry and the cached
//! default weights.

use once_cell::sync::{Lazy, OnceCell};

use dn_engine::{DenoiseEngine, ModelSource, RnnoiseEngine, read_model_file};

use crate::config::BridgeConfig;
use crate::ffi_error::{BridgeResult, ErrorCode, FFIError};
use crate::logging;
use crate::registry::{HandleRegistry, RawHandle};

/// Global bridge instance
static BRIDGE: Lazy<Bridge<RnnoiseEngine>> = Lazy::new(|| {
    let config = BridgeConfig::from_env();
    logging::init(&config.log_filter);
    log::debug!(
        "bridge: initialized ({} engine, frame size {})",
        RnnoiseEngine::NAME,
        RnnoiseEngine::FRAME_SIZE
    );
    Bridge::new(config)
});

/// The process-wide bridge, initializing config and logging on first call
pub fn bridge() -> &'static Bridge<RnnoiseEngine> {
    &BRIDGE
}

/// Bridge state for one engine type
pub struct Bridge<E: DenoiseEngine> {
    config: BridgeConfig,
    denoisers: HandleRegistry<E>,
    /// Bytes from `config.model_path`, or why they could not be read
    default_weights: OnceCell<Result<Box<[u8]>, String>>,
}

impl<E: DenoiseEngine> Bridge<E> {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            denoisers: HandleRegistry::new(),
            default_weights: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn denoisers(&self) -> &HandleRegistry<E> {
        &self.denoisers
    }

    /// Create a denoiser from a private copy of `model`
    pub fn create_denoiser(&self, model: &[u8]) -> BridgeResult<RawHandle> {
        self.denoisers.create(ModelSource::Copy(model))
    }

    /// Create a denoiser that parses `model` in place
    pub fn create_denoiser_borrowed(&self, model: &'static [u8]) -> BridgeResult<RawHandle> {
        self.denoisers.create(ModelSource::Borrowed(model))
    }

    /// Create a denoiser from the configured weights, or the engine's
    /// built-in model when none are configured.
    ///
    /// The weights file is read at most once per process. Its bytes (or the
    /// read failure) are reused by every later call, and every handle
    /// borrows the same cached bytes.
    pub fn create_default_denoiser(&'static self) -> BridgeResult<RawHandle> {
        match self.cached_weights() {
            None => self.denoisers.create(ModelSource::Builtin),
            Some(Ok(bytes)) => self.denoisers.create(ModelSource::Borrowed(bytes)),
            Some(Err(reason)) => {
                Err(FFIError::new(ErrorCode::CouldNotLoadModel).with_context(reason.clone()))
            }
        }
    }

    fn cached_weights(&'static self) -> Option<Result<&'static [u8], &'static String>> {
        let path = self.config().model_path.as_ref()?;
        let cached = self.default_weights.get_or_init(|| {
            let loaded = read_model_file(path).map_err(|err| format!("{}: {}", path.display(), err));
            match &loaded {
                Ok(bytes) => log::debug!(
                    "bridge: cached default weights from {} ({} bytes)",
                    path.display(),
                    bytes.len()
                ),
                Err(reason) => log::error!("bridge: cannot read default weights: {}", reason),
            }
            loaded
        });
        Some(cached.as_ref().map(|bytes| &bytes[..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dn_engine::testing::{STUB_FRAME_SIZE, StubEngine, stub_model_bytes};
    use std::path::PathBuf;

    fn leaked(config: BridgeConfig) -> &'static Bridge<StubEngine> {
        Box::leak(Box::new(Bridge::new(config)))
    }

    fn temp_model(name: &str, bytes: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("dn-bridge-{}-{}.bin", name, std::process::id()));
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_config_is_kept() {
        let config = BridgeConfig {
            log_filter: "dn_bridge=trace".to_string(),
            model_path: Some(PathBuf::from("/opt/models/voice.rnn")),
        };
        let bridge = Bridge::<StubEngine>::new(config.clone());
        assert_eq!(bridge.config(), &config);
        assert_eq!(bridge.denoisers().frame_size(), STUB_FRAME_SIZE);
    }

    #[test]
    fn test_default_uses_builtin_without_path() {
        let bridge = leaked(BridgeConfig::default());
        let handle = bridge.create_default_denoiser().unwrap();

        let denoiser = bridge.denoisers().resolve(handle).unwrap();
        assert!(denoiser.lock().model_bytes().as_slice().is_none());
    }

    #[test]
    fn test_default_weights_shared_between_handles() {
        let path = temp_model("shared", &stub_model_bytes(2.0, 0.0));
        let bridge = leaked(BridgeConfig {
            model_path: Some(path.clone()),
            ..BridgeConfig::default()
        });

        let a = bridge.create_default_denoiser().unwrap();
        // Later file changes are not observed
        std::fs::remove_file(&path).ok();
        let b = bridge.create_default_denoiser().unwrap();

        let a = bridge.denoisers().resolve(a).unwrap();
        let b = bridge.denoisers().resolve(b).unwrap();
        let a_bytes = a.lock().model_bytes().as_slice().map(<[u8]>::as_ptr);
        let b_bytes = b.lock().model_bytes().as_slice().map(<[u8]>::as_ptr);
        assert!(a_bytes.is_some());
        assert_eq!(a_bytes, b_bytes);
        assert!(!a.lock().model_bytes().is_owned());

        let output = b.lock().process_to_vec(&[3; STUB_FRAME_SIZE]).unwrap();
        assert!(output.iter().all(|&s| s == 6));
    }

    #[test]
    fn test_missing_weights_error_is_cached() {
        let bridge = leaked(BridgeConfig {
            model_path: Some(PathBuf::from("/nonexistent/dn-bridge-weights.bin")),
            ..BridgeConfig::default()
        });

        for _ in 0..2 {
            let err = bridge.create_default_denoiser().unwrap_err();
            assert_eq!(err.code, ErrorCode::CouldNotLoadModel);
        }
        assert_eq!(bridge.denoisers().live_count(), 0);
    }

    #[test]
    fn test_empty_weights_file() {
        let path = temp_model("empty", &[]);
        let bridge = leaked(BridgeConfig {
            model_path: Some(path.clone()),
            ..BridgeConfig::default()
        });

        let err = bridge.create_default_denoiser().unwrap_err();
        std::fs::remove_file(&path).ok();
        assert_eq!(err.code, ErrorCode::CouldNotLoadModel);
    }

    #[test]
    fn test_copy_vs_borrowed_ownership() {
        let bridge = leaked(BridgeConfig::default());
        let bytes = stub_model_bytes(1.0, 0.0);

        let copied = bridge.create_denoiser(&bytes).unwrap();
        let copied = bridge.denoisers().resolve(copied).unwrap();
        assert!(copied.lock().model_bytes().is_owned());
        assert_ne!(copied.lock().model_bytes().as_slice().map(<[u8]>::as_ptr), Some(bytes.as_ptr()));

        let leaked_bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        let borrowed = bridge.create_denoiser_borrowed(leaked_bytes).unwrap();
        let borrowed = bridge.denoisers().resolve(borrowed).unwrap();
        assert!(!borrowed.lock().model_bytes().is_owned());
        assert_eq!(
            borrowed.lock().model_bytes().as_slice().map(<[u8]>::as_ptr),
            Some(leaked_bytes.as_ptr())
        );
    }
}

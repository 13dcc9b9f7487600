//! dn-bridge: native denoiser bridge for JVM and C callers
//!
//! Exposes [`dn_engine`] denoisers behind opaque 64-bit handles:
//! - `c_api` - `extern "C"` functions (`dn_*`) for foreign-memory callers
//! - `jni_api` - natives for `dev.denoise.bridge.Denoiser`
//! - `registry` - generational handle table, one mutex per denoiser
//! - `ffi_error` / `ffi_bounds` - error codes and input validation
//!
//! Internally every operation returns `BridgeResult<T>`; only the two
//! boundary modules turn an error into a caller-visible failure (an error
//! code or a Java exception).
//!
//! ## Configuration
//! Read once, on first use:
//! - `DN_BRIDGE_CONFIG` - path to a TOML file (`log_filter`, `model_path`)
//! - `DN_BRIDGE_LOG` - env_logger filter, overrides the file
//! - `DN_BRIDGE_MODEL` - default weights, overrides the file

pub mod bridge;
pub mod c_api;
pub mod config;
pub mod ffi_bounds;
pub mod ffi_error;
pub mod jni_api;
pub mod logging;
pub mod registry;

pub use bridge::{Bridge, bridge};
pub use config::{BridgeConfig, ConfigError};
pub use ffi_error::{BridgeResult, ErrorCategory, ErrorCode, FFIError, NO_ERROR};
pub use registry::{Handle, HandleRegistry, NULL_HANDLE, RawHandle};

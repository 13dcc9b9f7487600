/// Denoiser FFI Error System
///
/// Every fallible bridge operation reports exactly one `ErrorCode`. Codes
/// are small integers that cross the C ABI unchanged; each maps to one of
/// four caller-visible categories. Only the outermost boundary functions
/// turn an error into a caller-visible failure; everything below returns
/// `BridgeResult<T>`.
use std::ffi::CStr;
use std::fmt;

use dn_engine::EngineError;

// =============================================================================
// ERROR CODES
// =============================================================================

/// Wire value for success
pub const NO_ERROR: i32 = 0;

/// Failure kinds, stable across the ABI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    /// Engine rejected the model bytes
    CouldNotLoadModel = 1001,
    /// Engine state could not be built from the model
    CouldNotCreateDenoiser = 1002,
    /// Handle is zero, destroyed, or unknown
    DenoiserClosed = 1003,
    /// Input buffer reference is null
    InputArrayNull = 1004,
    /// Input buffer has no samples
    InputArrayEmpty = 1005,
    /// Input length is not a whole number of frames
    InputArrayNotMultipleOfFrameSize = 1006,
    /// Native allocation failed
    AllocationFailed = 1007,
    /// Unrecognized code
    Unknown = 1999,
}

impl ErrorCode {
    /// Every known code
    pub const ALL: [ErrorCode; 8] = [
        ErrorCode::CouldNotLoadModel,
        ErrorCode::CouldNotCreateDenoiser,
        ErrorCode::DenoiserClosed,
        ErrorCode::InputArrayNull,
        ErrorCode::InputArrayEmpty,
        ErrorCode::InputArrayNotMultipleOfFrameSize,
        ErrorCode::AllocationFailed,
        ErrorCode::Unknown,
    ];

    /// Wire value
    #[inline]
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    /// Decode a wire value. `None` for success, `Unknown` for anything
    /// unrecognized.
    pub fn from_raw(raw: i32) -> Option<ErrorCode> {
        if raw == NO_ERROR {
            return None;
        }
        let code = ErrorCode::ALL
            .into_iter()
            .find(|code| code.as_raw() == raw)
            .unwrap_or(ErrorCode::Unknown);
        Some(code)
    }

    /// Caller-visible category
    pub fn category(self) -> ErrorCategory {
        match self {
            ErrorCode::CouldNotLoadModel
            | ErrorCode::CouldNotCreateDenoiser
            | ErrorCode::AllocationFailed => ErrorCategory::Io,
            ErrorCode::DenoiserClosed => ErrorCategory::IllegalState,
            ErrorCode::InputArrayNull
            | ErrorCode::InputArrayEmpty
            | ErrorCode::InputArrayNotMultipleOfFrameSize => ErrorCategory::IllegalArgument,
            ErrorCode::Unknown => ErrorCategory::Unknown,
        }
    }

    /// Human-readable message
    pub fn message(self) -> &'static str {
        self.message_c()
            .to_str()
            .unwrap_or("Unknown error")
    }

    /// Human-readable message as a static C string
    pub fn message_c(self) -> &'static CStr {
        match self {
            ErrorCode::CouldNotLoadModel => c"Could not load model",
            ErrorCode::CouldNotCreateDenoiser => c"Could not create denoiser",
            ErrorCode::DenoiserClosed => c"Denoiser is closed",
            ErrorCode::InputArrayNull => c"Input array is null",
            ErrorCode::InputArrayEmpty => c"Input array is empty",
            ErrorCode::InputArrayNotMultipleOfFrameSize => {
                c"Input array is not a multiple of the frame size"
            }
            ErrorCode::AllocationFailed => c"Could not allocate memory",
            ErrorCode::Unknown => c"Unknown error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

// =============================================================================
// ERROR CATEGORIES
// =============================================================================

/// Caller-visible failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Model load / denoiser creation / allocation failure
    Io,
    /// Operation on a closed denoiser
    IllegalState,
    /// Null, empty or misaligned input
    IllegalArgument,
    /// Anything else
    Unknown,
}

impl ErrorCategory {
    /// JVM exception class thrown for this category
    pub fn java_class(self) -> &'static str {
        match self {
            ErrorCategory::Io => "java/io/IOException",
            ErrorCategory::IllegalState => "java/lang/IllegalStateException",
            ErrorCategory::IllegalArgument => "java/lang/IllegalArgumentException",
            ErrorCategory::Unknown => "java/lang/RuntimeException",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Io => write!(f, "I/O Error"),
            ErrorCategory::IllegalState => write!(f, "Illegal State"),
            ErrorCategory::IllegalArgument => write!(f, "Illegal Argument"),
            ErrorCategory::Unknown => write!(f, "Unknown Error"),
        }
    }
}

// =============================================================================
// ERROR STRUCT
// =============================================================================

/// Bridge error: one code plus optional diagnostic context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FFIError {
    /// Failure kind
    pub code: ErrorCode,
    /// Optional context for logs (function name, engine reason, ...)
    pub context: Option<String>,
}

impl FFIError {
    /// Create new error
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            context: None,
        }
    }

    /// Add context information
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Caller-visible category
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// Caller-visible message (context is for logs only)
    pub fn message(&self) -> &'static str {
        self.code.message()
    }
}

impl From<ErrorCode> for FFIError {
    fn from(code: ErrorCode) -> Self {
        FFIError::new(code)
    }
}

impl From<EngineError> for FFIError {
    fn from(err: EngineError) -> Self {
        let code = match &err {
            EngineError::EmptyModel => ErrorCode::InputArrayEmpty,
            EngineError::ModelLoadFailed { .. } | EngineError::Io(_) => {
                ErrorCode::CouldNotLoadModel
            }
            EngineError::CreateFailed { .. } => ErrorCode::CouldNotCreateDenoiser,
            EngineError::Allocation { .. } => ErrorCode::AllocationFailed,
        };
        FFIError::new(code).with_context(err.to_string())
    }
}

impl fmt::Display for FFIError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}] {}", self.category(), self.code.as_raw(), self.message())?;
        if let Some(ref ctx) = self.context {
            write!(f, " (context: {})", ctx)?;
        }
        Ok(())
    }
}

impl std::error::Error for FFIError {}

// =============================================================================
// RESULT TYPE
// =============================================================================

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, FFIError>;

/// Store the outcome code of an operation into a C out-parameter.
///
/// # Safety
/// `out` must be null or valid for a write of one `i32`.
pub unsafe fn write_error_code(out: *mut i32, code: i32) {
    if !out.is_null() {
        // SAFETY: caller guarantees `out` is valid when non-null
        unsafe { out.write(code) };
    }
}

// =============================================================================
// HELPER MACROS
// =============================================================================

/// Unwrap a `BridgeResult` at a C boundary, reporting the error code
///
/// Usage:
/// ```rust,ignore
/// let value = ffi_try!(do_something(), error_out, 0);
/// ```
#[macro_export]
macro_rules! ffi_try {
    ($expr:expr, $error_out:expr, $error_value:expr) => {
        match $expr {
            Ok(val) => val,
            Err(err) => {
                log::warn!("FFI error: {}", err);
                // SAFETY: forwarded from the caller's contract on the out-parameter
                unsafe { $crate::ffi_error::write_error_code($error_out, err.code.as_raw()) };
                return $error_value;
            }
        }
    };
}

// =============================================================================
// TESTING
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct_and_nonzero() {
        let mut raw: Vec<i32> = ErrorCode::ALL.iter().map(|c| c.as_raw()).collect();
        assert!(raw.iter().all(|&r| r != NO_ERROR));
        raw.sort_unstable();
        raw.dedup();
        assert_eq!(raw.len(), ErrorCode::ALL.len());
    }

    #[test]
    fn test_from_raw() {
        assert_eq!(ErrorCode::from_raw(0), None);
        for code in ErrorCode::ALL {
            assert_eq!(ErrorCode::from_raw(code.as_raw()), Some(code));
        }
        assert_eq!(ErrorCode::from_raw(42), Some(ErrorCode::Unknown));
        assert_eq!(ErrorCode::from_raw(-1), Some(ErrorCode::Unknown));
    }

    #[test]
    fn test_category_mapping() {
        assert_eq!(ErrorCode::CouldNotLoadModel.category(), ErrorCategory::Io);
        assert_eq!(ErrorCode::CouldNotCreateDenoiser.category(), ErrorCategory::Io);
        assert_eq!(ErrorCode::AllocationFailed.category(), ErrorCategory::Io);
        assert_eq!(ErrorCode::DenoiserClosed.category(), ErrorCategory::IllegalState);
        assert_eq!(ErrorCode::InputArrayNull.category(), ErrorCategory::IllegalArgument);
        assert_eq!(ErrorCode::InputArrayEmpty.category(), ErrorCategory::IllegalArgument);
        assert_eq!(
            ErrorCode::InputArrayNotMultipleOfFrameSize.category(),
            ErrorCategory::IllegalArgument
        );
        assert_eq!(ErrorCode::Unknown.category(), ErrorCategory::Unknown);
    }

    #[test]
    fn test_java_classes() {
        assert_eq!(ErrorCategory::Io.java_class(), "java/io/IOException");
        assert_eq!(
            ErrorCategory::IllegalState.java_class(),
            "java/lang/IllegalStateException"
        );
        assert_eq!(
            ErrorCategory::IllegalArgument.java_class(),
            "java/lang/IllegalArgumentException"
        );
        assert_eq!(ErrorCategory::Unknown.java_class(), "java/lang/RuntimeException");
    }

    #[test]
    fn test_messages() {
        assert_eq!(ErrorCode::DenoiserClosed.message(), "Denoiser is closed");
        assert_eq!(ErrorCode::InputArrayEmpty.message(), "Input array is empty");
        assert_eq!(
            ErrorCode::InputArrayNotMultipleOfFrameSize.message(),
            "Input array is not a multiple of the frame size"
        );
    }

    #[test]
    fn test_engine_error_mapping() {
        let err: FFIError = EngineError::EmptyModel.into();
        assert_eq!(err.code, ErrorCode::InputArrayEmpty);

        let err: FFIError = EngineError::ModelLoadFailed {
            reason: "bad".to_string(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::CouldNotLoadModel);
        assert!(err.context.as_deref().unwrap().contains("bad"));

        let err: FFIError = EngineError::CreateFailed {
            reason: "bad".to_string(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::CouldNotCreateDenoiser);

        let err: FFIError = EngineError::Allocation { bytes: 1 }.into();
        assert_eq!(err.code, ErrorCode::AllocationFailed);
    }

    #[test]
    fn test_display_includes_context() {
        let err = FFIError::new(ErrorCode::DenoiserClosed).with_context("dn_denoise");
        let text = err.to_string();
        assert!(text.contains("Denoiser is closed"));
        assert!(text.contains("1003"));
        assert!(text.contains("dn_denoise"));
    }

    #[test]
    fn test_write_error_code_tolerates_null() {
        unsafe { write_error_code(std::ptr::null_mut(), 1003) };

        let mut out = NO_ERROR;
        unsafe { write_error_code(&mut out, 1003) };
        assert_eq!(out, 1003);
    }
}

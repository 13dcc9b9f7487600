/// Denoiser FFI Input Validation
///
/// Checks untrusted buffers before any processing starts. The first failed
/// check wins and nothing is touched:
/// 1. buffer reference present (`InputArrayNull`)
/// 2. at least one element (`InputArrayEmpty`)
/// 3. whole number of frames (`InputArrayNotMultipleOfFrameSize`)
///
/// Handle resolution (`DenoiserClosed`) runs before these checks and lives
/// in the registry.
use crate::ffi_error::{BridgeResult, ErrorCode, FFIError};

// =============================================================================
// VALIDATOR FUNCTIONS
// =============================================================================

/// Validate a sample buffer against the engine frame size.
///
/// # Returns
/// * the buffer, if it holds a positive whole number of frames
/// * the first violated check otherwise
#[inline]
pub fn check_samples<T>(samples: Option<T>, frame_size: usize) -> BridgeResult<T>
where
    T: AsRef<[i16]>,
{
    let samples = samples.ok_or(ErrorCode::InputArrayNull)?;
    let len = samples.as_ref().len();

    if len == 0 {
        return Err(ErrorCode::InputArrayEmpty.into());
    }

    if len % frame_size != 0 {
        return Err(FFIError::new(ErrorCode::InputArrayNotMultipleOfFrameSize)
            .with_context(format!("{} samples, frame size {}", len, frame_size)));
    }

    Ok(samples)
}

/// Validate a model buffer (present, non-empty).
#[inline]
pub fn check_model(model: Option<&[u8]>) -> BridgeResult<&[u8]> {
    let model = model.ok_or_else(|| FFIError::new(ErrorCode::InputArrayNull).with_context("model"))?;
    if model.is_empty() {
        return Err(FFIError::new(ErrorCode::InputArrayEmpty).with_context("model"));
    }
    Ok(model)
}

/// Convert a C length to `usize`; non-positive lengths are empty.
#[inline]
pub fn checked_len(len: i32) -> usize {
    usize::try_from(len).unwrap_or(0)
}

// =============================================================================
// TESTING
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn code_of<T>(result: BridgeResult<T>) -> Option<ErrorCode> {
        result.err().map(|e| e.code)
    }

    #[test]
    fn test_valid_samples() {
        let data = vec![0i16; 960];
        assert!(check_samples(Some(&data[..]), 480).is_ok());
    }

    #[test]
    fn test_null_samples() {
        assert_eq!(
            code_of(check_samples::<&[i16]>(None, 480)),
            Some(ErrorCode::InputArrayNull)
        );
    }

    #[test]
    fn test_empty_before_alignment() {
        let data: Vec<i16> = Vec::new();
        assert_eq!(
            code_of(check_samples(Some(&data[..]), 480)),
            Some(ErrorCode::InputArrayEmpty)
        );
    }

    #[test]
    fn test_misaligned_samples() {
        for len in [1, 479, 481, 959] {
            let data = vec![0i16; len];
            assert_eq!(
                code_of(check_samples(Some(&data[..]), 480)),
                Some(ErrorCode::InputArrayNotMultipleOfFrameSize),
                "len {}",
                len
            );
        }
    }

    #[test]
    fn test_mutable_samples() {
        let mut data = vec![0i16; 8];
        let checked = check_samples(Some(&mut data[..]), 8).unwrap();
        checked[0] = 1;
        assert_eq!(data[0], 1);
    }

    #[test]
    fn test_model_checks() {
        assert_eq!(code_of(check_model(None)), Some(ErrorCode::InputArrayNull));
        assert_eq!(code_of(check_model(Some(&[]))), Some(ErrorCode::InputArrayEmpty));
        assert!(check_model(Some(&[1, 2, 3])).is_ok());
    }

    #[test]
    fn test_checked_len() {
        assert_eq!(checked_len(-5), 0);
        assert_eq!(checked_len(0), 0);
        assert_eq!(checked_len(480), 480);
    }
}

//! PCM sample conversion between i16 and the engine's f32 frames
//!
//! The engine works in the i16 range, so widening is an exact cast with no
//! scaling. Narrowing saturates at the i16 limits and otherwise rounds to the
//! nearest integer, ties to even (the default `lrintf` rounding mode).

/// Widen one i16 sample to f32 (lossless).
#[inline]
pub fn widen_sample(sample: i16) -> f32 {
    sample as f32
}

/// Narrow one f32 sample to i16 with saturation and nearest rounding.
///
/// NaN maps to 0.
#[inline]
pub fn narrow_sample(sample: f32) -> i16 {
    if sample >= 32767.0 {
        return i16::MAX;
    }
    if sample <= -32768.0 {
        return i16::MIN;
    }
    // In range after the checks above; `as` maps NaN to 0.
    sample.round_ties_even() as i16
}

/// Widen a frame of samples into `output`.
#[inline]
pub fn widen(input: &[i16], output: &mut [f32]) {
    debug_assert_eq!(input.len(), output.len());
    for (dst, &src) in output.iter_mut().zip(input) {
        *dst = widen_sample(src);
    }
}

/// Narrow a frame of samples into `output`.
#[inline]
pub fn narrow(input: &[f32], output: &mut [i16]) {
    debug_assert_eq!(input.len(), output.len());
    for (dst, &src) in output.iter_mut().zip(input) {
        *dst = narrow_sample(src);
    }
}

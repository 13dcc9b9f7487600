//! C ABI for foreign-memory callers
//!
//! Conventions:
//! - Handles are `int64_t`; `0` is never a live denoiser.
//! - Fallible calls take an optional `int32_t *error_out`; it receives `0`
//!   on success or an error code on failure. Null is allowed.
//! - Lengths are sample (or byte) counts; non-positive lengths count as
//!   empty input.
//! - Buffers returned by `dn_denoise` are freed with `dn_free_samples`.

use std::ffi::c_char;
use std::ptr;
use std::slice;

use crate::bridge::bridge;
use crate::ffi_bounds::{check_model, checked_len};
use crate::ffi_error::{ErrorCode, NO_ERROR, write_error_code};
use crate::ffi_try;
use crate::registry::{NULL_HANDLE, RawHandle};

/// View a caller buffer. Null stays `None`; non-positive `len` is empty.
///
/// # Safety
/// Non-null `ptr` must be valid for reads of `len` elements for `'a`.
unsafe fn slice_arg<'a, T>(ptr: *const T, len: i32) -> Option<&'a [T]> {
    if ptr.is_null() {
        return None;
    }
    let len = checked_len(len);
    if len == 0 {
        return Some(<&[T]>::default());
    }
    // SAFETY: non-null, caller guarantees `len` readable elements
    Some(unsafe { slice::from_raw_parts(ptr, len) })
}

/// Mutable variant of [`slice_arg`].
///
/// # Safety
/// Non-null `ptr` must be valid for reads and writes of `len` elements for
/// `'a`, with no other live references.
unsafe fn slice_arg_mut<'a, T>(ptr: *mut T, len: i32) -> Option<&'a mut [T]> {
    if ptr.is_null() {
        return None;
    }
    let len = checked_len(len);
    if len == 0 {
        return Some(<&mut [T]>::default());
    }
    // SAFETY: non-null, caller guarantees exclusive access to `len` elements
    Some(unsafe { slice::from_raw_parts_mut(ptr, len) })
}

// ═══════════════════════════════════════════════════════════════════════════════
// LIFECYCLE
// ═══════════════════════════════════════════════════════════════════════════════

/// Create a denoiser from model bytes. The bytes are copied.
///
/// Returns the handle, or 0 on error.
///
/// # Safety
/// - `model` must be null or valid for reads of `len` bytes
/// - `error_out` must be null or valid for one `int32_t` write
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dn_create_denoiser(
    model: *const u8,
    len: i32,
    error_out: *mut i32,
) -> RawHandle {
    // SAFETY: forwarded from this function's contract
    let model = unsafe { slice_arg(model, len) };
    let model = ffi_try!(check_model(model), error_out, NULL_HANDLE);
    let handle = ffi_try!(bridge().create_denoiser(model), error_out, NULL_HANDLE);
    unsafe { write_error_code(error_out, NO_ERROR) };
    handle
}

/// Create a denoiser that reads model bytes in place.
///
/// Returns the handle, or 0 on error.
///
/// # Safety
/// - `model` must be null or valid for reads of `len` bytes, and must stay
///   valid and unmodified until the denoiser is destroyed
/// - `error_out` must be null or valid for one `int32_t` write
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dn_create_denoiser_borrowed(
    model: *const u8,
    len: i32,
    error_out: *mut i32,
) -> RawHandle {
    // SAFETY: the caller keeps the buffer alive for the handle's lifetime,
    // and the registry never outlives the process
    let model: Option<&'static [u8]> = unsafe { slice_arg(model, len) };
    let model = ffi_try!(check_model(model), error_out, NULL_HANDLE);
    let handle = ffi_try!(bridge().create_denoiser_borrowed(model), error_out, NULL_HANDLE);
    unsafe { write_error_code(error_out, NO_ERROR) };
    handle
}

/// Create a denoiser from the configured default weights, or the built-in
/// model when none are configured.
///
/// Returns the handle, or 0 on error.
///
/// # Safety
/// `error_out` must be null or valid for one `int32_t` write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dn_create_default_denoiser(error_out: *mut i32) -> RawHandle {
    let handle = ffi_try!(bridge().create_default_denoiser(), error_out, NULL_HANDLE);
    unsafe { write_error_code(error_out, NO_ERROR) };
    handle
}

/// Samples per frame. Every input length must be a multiple of this.
#[unsafe(no_mangle)]
pub extern "C" fn dn_get_frame_size() -> i32 {
    bridge().denoisers().frame_size() as i32
}

/// Destroy a denoiser. Zero, stale and repeated handles are ignored.
///
/// Returns 1 if a live denoiser was destroyed, 0 otherwise.
#[unsafe(no_mangle)]
pub extern "C" fn dn_destroy_denoiser(handle: RawHandle) -> i32 {
    bridge().denoisers().destroy(handle) as i32
}

/// Returns 1 if `handle` names a live denoiser, 0 otherwise.
#[unsafe(no_mangle)]
pub extern "C" fn dn_is_live(handle: RawHandle) -> i32 {
    bridge().denoisers().is_live(handle) as i32
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROCESSING
// ═══════════════════════════════════════════════════════════════════════════════

/// Denoise `len` samples into a new buffer of the same length.
///
/// Returns the buffer (free with `dn_free_samples(ptr, len)`), or null on
/// error.
///
/// # Safety
/// - `input` must be null or valid for reads of `len` samples
/// - `error_out` must be null or valid for one `int32_t` write
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dn_denoise(
    handle: RawHandle,
    input: *const i16,
    len: i32,
    error_out: *mut i32,
) -> *mut i16 {
    // SAFETY: forwarded from this function's contract
    let input = unsafe { slice_arg(input, len) };
    let output = ffi_try!(
        bridge().denoisers().denoise(handle, input),
        error_out,
        ptr::null_mut()
    );
    unsafe { write_error_code(error_out, NO_ERROR) };
    Box::into_raw(output.into_boxed_slice()) as *mut i16
}

/// Free a buffer returned by `dn_denoise`.
///
/// # Safety
/// `ptr` must be null or a pointer returned by `dn_denoise` for an input of
/// `len` samples, not freed before.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dn_free_samples(ptr: *mut i16, len: i32) {
    let len = checked_len(len);
    if ptr.is_null() || len == 0 {
        return;
    }
    // SAFETY: caller guarantees `ptr`/`len` came from `dn_denoise`
    unsafe {
        let slice = slice::from_raw_parts_mut(ptr, len);
        drop(Box::from_raw(slice as *mut [i16]));
    }
}

/// Run `len` samples through the denoiser in place.
///
/// With `denoise` set the buffer is overwritten with denoised audio;
/// otherwise it is left untouched. Returns the maximum speech probability
/// over all frames, or -1.0 on error.
///
/// # Safety
/// - `samples` must be null or valid for reads and writes of `len` samples
/// - `error_out` must be null or valid for one `int32_t` write
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dn_denoise_in_place(
    denoise: bool,
    handle: RawHandle,
    samples: *mut i16,
    len: i32,
    error_out: *mut i32,
) -> f32 {
    let denoisers = bridge().denoisers();
    let probability = if denoise {
        // SAFETY: forwarded from this function's contract
        let samples = unsafe { slice_arg_mut(samples, len) };
        ffi_try!(denoisers.denoise_in_place(handle, samples), error_out, -1.0)
    } else {
        // SAFETY: forwarded from this function's contract
        let samples = unsafe { slice_arg(samples.cast_const(), len) };
        ffi_try!(denoisers.speech_probability(handle, samples), error_out, -1.0)
    };
    unsafe { write_error_code(error_out, NO_ERROR) };
    probability
}

// ═══════════════════════════════════════════════════════════════════════════════
// ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Static NUL-terminated message for an error code; null for 0.
#[unsafe(no_mangle)]
pub extern "C" fn dn_error_message(code: i32) -> *const c_char {
    match ErrorCode::from_raw(code) {
        Some(code) => code.message_c().as_ptr(),
        None => ptr::null(),
    }
}

//! JNI surface for `dev.denoise.bridge.Denoiser`
//!
//! All natives are static and take the raw handle as a `long`. Errors are
//! raised as Java exceptions: the class follows the error category and the
//! message is the error code's message.

use std::ffi::c_void;

use jni::JNIEnv;
use jni::objects::{JByteArray, JClass, JObject, JShortArray};
use jni::sys::{JNI_FALSE, JNI_TRUE, JNI_VERSION_1_8, jboolean, jfloat, jint, jlong};

use crate::bridge::bridge;
use crate::ffi_error::{ErrorCategory, FFIError};
use crate::registry::{NULL_HANDLE, RawHandle};

// ═══════════════════════════════════════════════════════════════════════════════
// FAILURES
// ═══════════════════════════════════════════════════════════════════════════════

enum JniFailure {
    /// Bridge error code
    Bridge(FFIError),
    /// Bad model argument, checked here rather than in the registry
    Argument(&'static str),
    /// JNI call failed
    Jni(jni::errors::Error),
}

impl From<FFIError> for JniFailure {
    fn from(err: FFIError) -> Self {
        JniFailure::Bridge(err)
    }
}

impl From<jni::errors::Error> for JniFailure {
    fn from(err: jni::errors::Error) -> Self {
        JniFailure::Jni(err)
    }
}

type JniResult<T> = Result<T, JniFailure>;

/// Raise `failure` as a Java exception unless one is already pending.
fn raise(env: &mut JNIEnv, function: &str, failure: JniFailure) {
    if env.exception_check().unwrap_or(false) {
        log::warn!("{}: Java exception already pending", function);
        return;
    }

    let (class, message) = match failure {
        JniFailure::Bridge(err) => {
            log::warn!("{}: {}", function, err);
            (err.category().java_class(), err.message().to_string())
        }
        JniFailure::Argument(message) => {
            log::warn!("{}: {}", function, message);
            (ErrorCategory::IllegalArgument.java_class(), message.to_string())
        }
        JniFailure::Jni(err) => {
            log::error!("{}: JNI call failed: {}", function, err);
            (ErrorCategory::Unknown.java_class(), err.to_string())
        }
    };

    if let Err(err) = env.throw_new(class, message) {
        log::error!("{}: could not throw {}: {}", function, class, err);
    }
}

fn finish<T>(env: &mut JNIEnv, function: &str, result: JniResult<T>, on_error: T) -> T {
    result.unwrap_or_else(|failure| {
        raise(env, function, failure);
        on_error
    })
}

fn null_short_array<'local>() -> JShortArray<'local> {
    JShortArray::from(JObject::null())
}

/// Fail with `DenoiserClosed` before any array is copied.
fn ensure_live(handle: RawHandle) -> JniResult<()> {
    bridge().denoisers().resolve(handle)?;
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// ARRAY MARSHALLING
// ═══════════════════════════════════════════════════════════════════════════════

/// Copy a Java `short[]` into native memory; `None` for a null reference.
fn read_samples(env: &mut JNIEnv, array: &JShortArray) -> JniResult<Option<Vec<i16>>> {
    if array.is_null() {
        return Ok(None);
    }
    let len = env.get_array_length(array)?;
    let mut samples = vec![0i16; usize::try_from(len).unwrap_or(0)];
    env.get_short_array_region(array, 0, &mut samples)?;
    Ok(Some(samples))
}

fn new_short_array<'local>(env: &mut JNIEnv<'local>, samples: &[i16]) -> JniResult<JShortArray<'local>> {
    let array = env.new_short_array(samples.len() as jint)?;
    env.set_short_array_region(&array, 0, samples)?;
    Ok(array)
}

fn read_model(env: &mut JNIEnv, model: &JByteArray) -> JniResult<Vec<u8>> {
    if model.is_null() {
        return Err(JniFailure::Argument("Model is null"));
    }
    let bytes = env.convert_byte_array(model)?;
    if bytes.is_empty() {
        return Err(JniFailure::Argument("Model is empty"));
    }
    Ok(bytes)
}

// ═══════════════════════════════════════════════════════════════════════════════
// LIFECYCLE
// ═══════════════════════════════════════════════════════════════════════════════

/// Initializes configuration and logging when the library is loaded
#[unsafe(no_mangle)]
pub extern "system" fn JNI_OnLoad(_vm: *mut jni::sys::JavaVM, _reserved: *mut c_void) -> jint {
    let config = bridge().config();
    log::debug!(
        "JNI_OnLoad: dn-bridge loaded (default model: {})",
        config
            .model_path
            .as_ref()
            .map_or_else(|| "built-in".to_string(), |path| path.display().to_string())
    );
    JNI_VERSION_1_8
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_dev_denoise_bridge_Denoiser_createDenoiser0<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    model: JByteArray<'local>,
) -> jlong {
    let result = read_model(&mut env, &model)
        .and_then(|bytes| Ok(bridge().create_denoiser(&bytes)?));
    finish(&mut env, "createDenoiser0", result, NULL_HANDLE)
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_dev_denoise_bridge_Denoiser_createDefaultDenoiser0<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jlong {
    let result = bridge().create_default_denoiser().map_err(JniFailure::from);
    finish(&mut env, "createDefaultDenoiser0", result, NULL_HANDLE)
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_dev_denoise_bridge_Denoiser_getFrameSize0<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jint {
    bridge().denoisers().frame_size() as jint
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_dev_denoise_bridge_Denoiser_destroyDenoiser0<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
    handle: jlong,
) {
    bridge().denoisers().destroy(handle);
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_dev_denoise_bridge_Denoiser_isClosed0<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
    handle: jlong,
) -> jboolean {
    if bridge().denoisers().is_live(handle) {
        JNI_FALSE
    } else {
        JNI_TRUE
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROCESSING
// ═══════════════════════════════════════════════════════════════════════════════

#[unsafe(no_mangle)]
pub extern "system" fn Java_dev_denoise_bridge_Denoiser_denoise0<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    handle: jlong,
    input: JShortArray<'local>,
) -> JShortArray<'local> {
    let result = (|| -> JniResult<JShortArray<'local>> {
        ensure_live(handle)?;
        let samples = read_samples(&mut env, &input)?;
        let output = bridge().denoisers().denoise(handle, samples.as_deref())?;
        new_short_array(&mut env, &output)
    })();
    finish(&mut env, "denoise0", result, null_short_array())
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_dev_denoise_bridge_Denoiser_denoiseInPlace0<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    handle: jlong,
    samples: JShortArray<'local>,
) -> jfloat {
    let result = (|| -> JniResult<jfloat> {
        ensure_live(handle)?;
        let mut buffer = read_samples(&mut env, &samples)?;
        let probability = bridge()
            .denoisers()
            .denoise_in_place(handle, buffer.as_deref_mut())?;
        if let Some(buffer) = &buffer {
            env.set_short_array_region(&samples, 0, buffer)?;
        }
        Ok(probability)
    })();
    finish(&mut env, "denoiseInPlace0", result, 0.0)
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_dev_denoise_bridge_Denoiser_getSpeechProbability0<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    handle: jlong,
    samples: JShortArray<'local>,
) -> jfloat {
    let result = (|| -> JniResult<jfloat> {
        ensure_live(handle)?;
        let buffer = read_samples(&mut env, &samples)?;
        Ok(bridge()
            .denoisers()
            .speech_probability(handle, buffer.as_deref())?)
    })();
    finish(&mut env, "getSpeechProbability0", result, 0.0)
}

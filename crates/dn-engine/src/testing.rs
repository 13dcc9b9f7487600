//! Deterministic stub engine for tests
//!
//! Model format (little endian): `b"STUB"`, gain `f32`, bias `f32`,
//! flags `u8`. Flag bit 0 makes engine construction fail.
//!
//! Frame transform: `out = in * gain + bias + frames_seen`, so output
//! depends on how many frames the instance has already processed.
//! Speech probability is the frame's mean absolute sample over 32768.
//!
//! Live instance counters are per thread, so parallel tests do not see
//! each other's models and engines.

use std::cell::Cell;

use crate::engine::DenoiseEngine;
use crate::error::{EngineError, EngineResult};

/// Stub model magic
pub const STUB_MAGIC: &[u8; 4] = b"STUB";

/// Stub frame length
pub const STUB_FRAME_SIZE: usize = 8;

const STUB_MODEL_LEN: usize = 13;
const FLAG_FAIL_CREATE: u8 = 0x01;

thread_local! {
    static LIVE_MODELS: Cell<isize> = const { Cell::new(0) };
    static LIVE_ENGINES: Cell<isize> = const { Cell::new(0) };
}

/// Stub models alive on this thread
pub fn live_stub_models() -> isize {
    LIVE_MODELS.with(Cell::get)
}

/// Stub engines alive on this thread
pub fn live_stub_engines() -> isize {
    LIVE_ENGINES.with(Cell::get)
}

fn bump(counter: &'static std::thread::LocalKey<Cell<isize>>, delta: isize) {
    counter.with(|c| c.set(c.get() + delta));
}

/// Serialized stub model
pub fn stub_model_bytes(gain: f32, bias: f32) -> Vec<u8> {
    encode(gain, bias, 0)
}

/// Serialized stub model whose engine construction fails
pub fn stub_failing_model_bytes() -> Vec<u8> {
    encode(1.0, 0.0, FLAG_FAIL_CREATE)
}

fn encode(gain: f32, bias: f32, flags: u8) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(STUB_MODEL_LEN);
    bytes.extend_from_slice(STUB_MAGIC);
    bytes.extend_from_slice(&gain.to_le_bytes());
    bytes.extend_from_slice(&bias.to_le_bytes());
    bytes.push(flags);
    bytes
}

/// Parsed stub model
#[derive(Debug)]
pub struct StubModel {
    pub gain: f32,
    pub bias: f32,
    fail_create: bool,
}

impl StubModel {
    fn new(gain: f32, bias: f32, fail_create: bool) -> Self {
        bump(&LIVE_MODELS, 1);
        Self {
            gain,
            bias,
            fail_create,
        }
    }
}

impl Drop for StubModel {
    fn drop(&mut self) {
        bump(&LIVE_MODELS, -1);
    }
}

/// Stub engine; built-in model is identity (gain 1, bias 0).
#[derive(Debug)]
pub struct StubEngine {
    model: StubModel,
    frames_seen: u64,
}

impl DenoiseEngine for StubEngine {
    type Model = StubModel;

    const FRAME_SIZE: usize = STUB_FRAME_SIZE;

    const NAME: &'static str = "stub";

    fn model_from_bytes(bytes: &[u8]) -> EngineResult<StubModel> {
        if bytes.len() != STUB_MODEL_LEN || &bytes[..4] != STUB_MAGIC {
            return Err(EngineError::ModelLoadFailed {
                reason: format!("not a stub model ({} bytes)", bytes.len()),
            });
        }
        let field = |at: usize| f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        Ok(StubModel::new(
            field(4),
            field(8),
            bytes[12] & FLAG_FAIL_CREATE != 0,
        ))
    }

    fn new(model: Option<StubModel>) -> EngineResult<Self> {
        let model = model.unwrap_or_else(|| StubModel::new(1.0, 0.0, false));
        if model.fail_create {
            return Err(EngineError::CreateFailed {
                reason: "stub model requested failure".to_string(),
            });
        }
        bump(&LIVE_ENGINES, 1);
        Ok(Self {
            model,
            frames_seen: 0,
        })
    }

    fn process_frame(&mut self, output: &mut [f32], input: &[f32]) -> f32 {
        let carry = self.frames_seen as f32;
        for (out, &sample) in output.iter_mut().zip(input) {
            *out = sample * self.model.gain + self.model.bias + carry;
        }
        self.frames_seen += 1;

        let energy: f32 = input.iter().map(|s| s.abs()).sum();
        (energy / input.len() as f32 / 32768.0).min(1.0)
    }
}

impl Drop for StubEngine {
    fn drop(&mut self) {
        bump(&LIVE_ENGINES, -1);
    }
}

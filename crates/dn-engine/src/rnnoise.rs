//! RNNoise backend using the nnnoiseless crate (pure Rust).

use nnnoiseless::{DenoiseState, RnnModel};

use crate::engine::DenoiseEngine;
use crate::error::{EngineError, EngineResult};

/// RNNoise denoiser state with its model.
pub struct RnnoiseEngine {
    // DenoiseState::from_model() takes the model by value, so the state
    // owns it and one drop releases both.
    state: Box<DenoiseState<'static>>,
}

impl DenoiseEngine for RnnoiseEngine {
    type Model = RnnModel;

    const FRAME_SIZE: usize = DenoiseState::<'static>::FRAME_SIZE; // 480 samples = 10ms at 48kHz

    const NAME: &'static str = "rnnoise";

    fn model_from_bytes(bytes: &[u8]) -> EngineResult<RnnModel> {
        RnnModel::from_bytes(bytes).ok_or_else(|| EngineError::ModelLoadFailed {
            reason: format!("rnnoise rejected {} byte model", bytes.len()),
        })
    }

    fn new(model: Option<RnnModel>) -> EngineResult<Self> {
        let state = match model {
            Some(model) => DenoiseState::from_model(model),
            None => DenoiseState::new(),
        };
        Ok(Self { state })
    }

    fn process_frame(&mut self, output: &mut [f32], input: &[f32]) -> f32 {
        self.state.process_frame(output, input)
    }
}

//! Denoiser record: engine state, its model, and the raw model bytes
//!
//! Processing is frame-batched. Buffers must hold a whole number of
//! frames; there is no partial-frame carry between calls. Engine state
//! advances with every frame, so frames of one denoiser are always fed in
//! order on a single thread.

use crate::engine::DenoiseEngine;
use crate::error::{EngineError, EngineResult};
use crate::model::{LoadedModel, ModelBytes, ModelSource, load_model};
use crate::pcm;

/// One denoising instance.
pub struct Denoiser<E: DenoiseEngine> {
    // Fields drop in declaration order: the engine (state, then model)
    // goes before the bytes it may point into.
    engine: E,
    bytes: ModelBytes,
    frames_processed: u64,
}

impl<E: DenoiseEngine> Denoiser<E> {
    /// Load a model and build engine state.
    ///
    /// If construction fails the model and any private byte copy are
    /// released before the error is returned.
    pub fn new(source: ModelSource<'_>) -> EngineResult<Self> {
        let LoadedModel { model, bytes } = load_model::<E>(source)?;
        let engine = E::new(model)?;
        Ok(Self::from_parts(engine, bytes))
    }

    /// Wrap an already constructed engine.
    pub fn from_parts(engine: E, bytes: ModelBytes) -> Self {
        Self {
            engine,
            bytes,
            frames_processed: 0,
        }
    }

    /// Samples per frame
    pub fn frame_size(&self) -> usize {
        E::FRAME_SIZE
    }

    pub fn model_bytes(&self) -> &ModelBytes {
        &self.bytes
    }

    /// Frames fed to the engine so far
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Denoise `samples`, optionally writing the result back.
    ///
    /// With `write_back == false` the buffer is left untouched and only
    /// the speech probability is computed. Returns the maximum speech
    /// probability over all frames.
    pub fn process_in_place(&mut self, samples: &mut [i16], write_back: bool) -> f32 {
        let frame_size = self.frame_size();
        debug_assert_eq!(samples.len() % frame_size, 0);

        let mut stage = FrameStage::new(frame_size);
        let mut peak = PeakProbability::default();

        for frame in samples.chunks_exact_mut(frame_size) {
            peak.update(stage.run(&mut self.engine, frame));
            if write_back {
                stage.write_to(frame);
            }
            self.frames_processed += 1;
        }

        peak.value()
    }

    /// Run `samples` through the engine without producing audio.
    ///
    /// Engine state still advances. Returns the maximum speech probability.
    pub fn process_read_only(&mut self, samples: &[i16]) -> f32 {
        let frame_size = self.frame_size();
        debug_assert_eq!(samples.len() % frame_size, 0);

        let mut stage = FrameStage::new(frame_size);
        let mut peak = PeakProbability::default();

        for frame in samples.chunks_exact(frame_size) {
            peak.update(stage.run(&mut self.engine, frame));
            self.frames_processed += 1;
        }

        peak.value()
    }

    /// Denoise `samples` into a new buffer of the same length.
    pub fn process_to_vec(&mut self, samples: &[i16]) -> EngineResult<Vec<i16>> {
        let mut output = Vec::new();
        output
            .try_reserve_exact(samples.len())
            .map_err(|_| EngineError::Allocation {
                bytes: std::mem::size_of_val(samples),
            })?;
        output.extend_from_slice(samples);

        self.process_in_place(&mut output, true);
        Ok(output)
    }
}

/// Per-call f32 staging buffers, one frame each.
struct FrameStage {
    input: Vec<f32>,
    output: Vec<f32>,
}

impl FrameStage {
    fn new(frame_size: usize) -> Self {
        Self {
            input: vec![0.0; frame_size],
            output: vec![0.0; frame_size],
        }
    }

    fn run<E: DenoiseEngine>(&mut self, engine: &mut E, frame: &[i16]) -> f32 {
        pcm::widen(frame, &mut self.input);
        engine.process_frame(&mut self.output, &self.input)
    }

    fn write_to(&self, frame: &mut [i16]) {
        pcm::narrow(&self.output, frame);
    }
}

/// Running maximum of speech probability, seeded at 0.0.
#[derive(Default)]
struct PeakProbability(f32);

impl PeakProbability {
    #[inline]
    fn update(&mut self, probability: f32) {
        // NaN compares false and is skipped
        if probability > self.0 {
            self.0 = probability;
        }
    }

    fn value(&self) -> f32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        STUB_FRAME_SIZE, StubEngine, live_stub_engines, live_stub_models, stub_failing_model_bytes,
        stub_model_bytes,
    };
    use approx::assert_relative_eq;

    fn stub(gain: f32, bias: f32) -> Denoiser<StubEngine> {
        Denoiser::new(ModelSource::Copy(&stub_model_bytes(gain, bias))).unwrap()
    }

    #[test]
    fn test_output_has_input_length() {
        let mut denoiser = stub(1.0, 0.0);
        let input = vec![100i16; STUB_FRAME_SIZE * 3];

        let output = denoiser.process_to_vec(&input).unwrap();

        assert_eq!(denoiser.frame_size(), STUB_FRAME_SIZE);
        assert_eq!(output.len(), input.len());
        assert_eq!(denoiser.frames_processed(), 3);
    }

    #[test]
    fn test_out_of_place_leaves_input() {
        let mut denoiser = stub(0.5, 0.0);
        let input = vec![1000i16; STUB_FRAME_SIZE];
        let copy = input.clone();

        let output = denoiser.process_to_vec(&input).unwrap();

        assert_eq!(input, copy);
        assert!(output.iter().all(|&s| s == 500));
    }

    #[test]
    fn test_saturation_wins_over_rounding() {
        let mut denoiser = stub(0.0, 32767.4);
        let mut samples = vec![0i16; STUB_FRAME_SIZE];
        denoiser.process_in_place(&mut samples, true);
        assert!(samples.iter().all(|&s| s == 32767));

        let mut denoiser = stub(0.0, -32768.2);
        let mut samples = vec![0i16; STUB_FRAME_SIZE];
        denoiser.process_in_place(&mut samples, true);
        assert!(samples.iter().all(|&s| s == -32768));
    }

    #[test]
    fn test_nearest_rounding() {
        let mut denoiser = stub(0.0, 32766.6);
        let mut samples = vec![0i16; STUB_FRAME_SIZE];
        denoiser.process_in_place(&mut samples, true);
        assert!(samples.iter().all(|&s| s == 32767));

        let mut denoiser = stub(0.0, 32766.5);
        let mut samples = vec![0i16; STUB_FRAME_SIZE];
        denoiser.process_in_place(&mut samples, true);
        assert!(samples.iter().all(|&s| s == 32766));
    }

    #[test]
    fn test_read_only_keeps_samples() {
        let mut denoiser = stub(0.0, 123.0);
        let samples: Vec<i16> = (0..STUB_FRAME_SIZE as i16 * 2).map(|i| i * 100).collect();
        let copy = samples.clone();

        let probability = denoiser.process_read_only(&samples);

        assert_eq!(samples, copy);
        assert!((0.0..=1.0).contains(&probability));
        assert_eq!(denoiser.frames_processed(), 2);
    }

    #[test]
    fn test_in_place_discard_keeps_samples() {
        let mut denoiser = stub(0.0, 123.0);
        let mut samples = vec![-7i16; STUB_FRAME_SIZE];

        denoiser.process_in_place(&mut samples, false);

        assert!(samples.iter().all(|&s| s == -7));
    }

    #[test]
    fn test_probability_is_running_max() {
        let mut denoiser = stub(1.0, 0.0);
        // Stub probability is mean |sample| / 32768 per frame
        let mut samples = vec![0i16; STUB_FRAME_SIZE * 3];
        samples[STUB_FRAME_SIZE..STUB_FRAME_SIZE * 2].fill(16384);
        samples[STUB_FRAME_SIZE * 2..].fill(8192);

        let probability = denoiser.process_in_place(&mut samples, false);

        assert_relative_eq!(probability, 0.5);
    }

    #[test]
    fn test_silence_probability_is_zero() {
        let mut denoiser = stub(1.0, 0.0);
        let samples = vec![0i16; STUB_FRAME_SIZE];
        assert_eq!(denoiser.process_read_only(&samples), 0.0);
    }

    #[test]
    fn test_state_carries_across_calls() {
        let input: Vec<i16> = (0..STUB_FRAME_SIZE as i16 * 2).map(|i| i * 10 - 50).collect();

        let mut whole = stub(1.0, 0.25);
        let whole_output = whole.process_to_vec(&input).unwrap();

        let mut split = stub(1.0, 0.25);
        let mut split_output = split.process_to_vec(&input[..STUB_FRAME_SIZE]).unwrap();
        split_output.extend(split.process_to_vec(&input[STUB_FRAME_SIZE..]).unwrap());

        assert_eq!(whole_output, split_output);
    }

    #[test]
    fn test_create_failure_releases_model() {
        let models_before = live_stub_models();
        let engines_before = live_stub_engines();

        let result = Denoiser::<StubEngine>::new(ModelSource::Copy(&stub_failing_model_bytes()));

        assert!(matches!(result, Err(EngineError::CreateFailed { .. })));
        assert_eq!(live_stub_models(), models_before);
        assert_eq!(live_stub_engines(), engines_before);
    }

    #[test]
    fn test_drop_releases_engine_and_model() {
        let models_before = live_stub_models();
        let engines_before = live_stub_engines();

        let denoiser = stub(1.0, 0.0);
        assert_eq!(live_stub_models(), models_before + 1);
        assert_eq!(live_stub_engines(), engines_before + 1);

        drop(denoiser);
        assert_eq!(live_stub_models(), models_before);
        assert_eq!(live_stub_engines(), engines_before);
    }
}

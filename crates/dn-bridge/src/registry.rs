//! Denoiser handle registry
//!
//! Callers hold denoisers as opaque 64-bit handles. A handle packs a slot
//! index and that slot's generation:
//!
//! ```text
//! raw = generation << 32 | (index + 1)
//! ```
//!
//! Zero is never issued and always means "closed". Destroying a denoiser
//! bumps its slot's generation, so a stale handle resolves to
//! `DenoiserClosed` even after the slot is reused.
//!
//! Each denoiser sits behind its own mutex: calls on one handle run one at
//! a time, different handles run concurrently. A destroy racing an
//! in-flight call only drops the registry's reference; the engine is
//! released when that call finishes.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use dn_engine::{DenoiseEngine, Denoiser, ModelSource};

use crate::ffi_bounds::check_samples;
use crate::ffi_error::{BridgeResult, ErrorCode, FFIError};

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLES
// ═══════════════════════════════════════════════════════════════════════════════

/// Raw handle as seen by callers
pub type RawHandle = i64;

/// Reserved "no denoiser" handle
pub const NULL_HANDLE: RawHandle = 0;

const GENERATION_MASK: u32 = 0x7FFF_FFFF;

/// Decoded handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    /// Pack into the caller representation (nonzero, positive)
    pub fn to_raw(self) -> RawHandle {
        (((self.generation & GENERATION_MASK) as i64) << 32) | (self.index as i64 + 1)
    }

    /// Unpack; `None` for zero or malformed values
    pub fn from_raw(raw: RawHandle) -> Option<Handle> {
        if raw <= 0 {
            return None;
        }
        let slot = (raw & 0xFFFF_FFFF) as u32;
        let generation = (raw >> 32) as u32;
        if slot == 0 || generation == 0 {
            return None;
        }
        Some(Handle {
            index: slot - 1,
            generation,
        })
    }
}

fn next_generation(generation: u32) -> u32 {
    match generation.wrapping_add(1) & GENERATION_MASK {
        0 => 1,
        next => next,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SLOT TABLE
// ═══════════════════════════════════════════════════════════════════════════════

/// Shared reference to a live denoiser
pub type SharedDenoiser<E> = Arc<Mutex<Denoiser<E>>>;

struct Slot<E: DenoiseEngine> {
    generation: u32,
    denoiser: Option<SharedDenoiser<E>>,
}

struct SlotTable<E: DenoiseEngine> {
    slots: Vec<Slot<E>>,
    free: Vec<u32>,
    live: usize,
}

impl<E: DenoiseEngine> SlotTable<E> {
    fn insert(&mut self, denoiser: Denoiser<E>) -> BridgeResult<Handle> {
        let shared = Arc::new(Mutex::new(denoiser));

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.denoiser = Some(shared);
            self.live += 1;
            return Ok(Handle {
                index,
                generation: slot.generation,
            });
        }

        let index = u32::try_from(self.slots.len())
            .ok()
            .filter(|&index| index < u32::MAX)
            .ok_or_else(|| {
                FFIError::new(ErrorCode::CouldNotCreateDenoiser).with_context("handle table full")
            })?;
        self.slots
            .try_reserve(1)
            .map_err(|_| FFIError::new(ErrorCode::AllocationFailed).with_context("handle table"))?;
        self.slots.push(Slot {
            generation: 1,
            denoiser: Some(shared),
        });
        self.live += 1;
        Ok(Handle {
            index,
            generation: 1,
        })
    }

    fn get(&self, handle: Handle) -> Option<&SharedDenoiser<E>> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.denoiser.as_ref()
    }

    fn remove(&mut self, handle: Handle) -> Option<SharedDenoiser<E>> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let denoiser = slot.denoiser.take()?;
        slot.generation = next_generation(slot.generation);
        self.free.push(handle.index);
        self.live -= 1;
        Some(denoiser)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

/// Handle registry for one engine type
pub struct HandleRegistry<E: DenoiseEngine> {
    table: RwLock<SlotTable<E>>,
}

impl<E: DenoiseEngine> Default for HandleRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: DenoiseEngine> HandleRegistry<E> {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(SlotTable {
                slots: Vec::new(),
                free: Vec::new(),
                live: 0,
            }),
        }
    }

    /// Samples per frame for every denoiser in this registry
    pub fn frame_size(&self) -> usize {
        E::FRAME_SIZE
    }

    /// Load a model, build a denoiser and register it.
    ///
    /// Nothing is registered or retained on failure.
    pub fn create(&self, source: ModelSource<'_>) -> BridgeResult<RawHandle> {
        let denoiser = Denoiser::<E>::new(source).map_err(|err| {
            log::error!("{}: failed to create denoiser from {:?}: {}", E::NAME, source, err);
            FFIError::from(err)
        })?;

        let handle = self.table.write().insert(denoiser)?;
        let raw = handle.to_raw();
        log::debug!("{}: created denoiser {:#x}", E::NAME, raw);
        Ok(raw)
    }

    /// Look up a live denoiser.
    pub fn resolve(&self, raw: RawHandle) -> BridgeResult<SharedDenoiser<E>> {
        let closed = || FFIError::new(ErrorCode::DenoiserClosed).with_context(format!("handle {:#x}", raw));
        let handle = Handle::from_raw(raw).ok_or_else(closed)?;
        self.table.read().get(handle).cloned().ok_or_else(closed)
    }

    /// Destroy a denoiser.
    ///
    /// Zero, stale and unknown handles are ignored. Returns whether a live
    /// denoiser was removed.
    pub fn destroy(&self, raw: RawHandle) -> bool {
        let Some(handle) = Handle::from_raw(raw) else {
            return false;
        };
        let removed = self.table.write().remove(handle);
        match removed {
            Some(denoiser) => {
                // Released here, or by an in-flight call holding a clone
                drop(denoiser);
                log::debug!("{}: destroyed denoiser {:#x}", E::NAME, raw);
                true
            }
            None => false,
        }
    }

    /// Whether `raw` names a live denoiser
    pub fn is_live(&self, raw: RawHandle) -> bool {
        Handle::from_raw(raw).is_some_and(|handle| self.table.read().get(handle).is_some())
    }

    /// Number of live denoisers
    pub fn live_count(&self) -> usize {
        self.table.read().live
    }

    // ───────────────────────────────────────────────────────────────────────────
    // FRAME PIPELINE
    // ───────────────────────────────────────────────────────────────────────────

    /// Denoise `input` into a new buffer of the same length.
    pub fn denoise(&self, raw: RawHandle, input: Option<&[i16]>) -> BridgeResult<Vec<i16>> {
        let denoiser = self.resolve(raw)?;
        let input = check_samples(input, self.frame_size())?;
        let output = denoiser.lock().process_to_vec(input)?;
        Ok(output)
    }

    /// Denoise `samples` in place. Returns the maximum speech probability.
    pub fn denoise_in_place(&self, raw: RawHandle, samples: Option<&mut [i16]>) -> BridgeResult<f32> {
        let denoiser = self.resolve(raw)?;
        let samples = check_samples(samples, self.frame_size())?;
        Ok(denoiser.lock().process_in_place(samples, true))
    }

    /// Speech probability of `samples` without modifying them.
    ///
    /// Engine state still advances.
    pub fn speech_probability(&self, raw: RawHandle, samples: Option<&[i16]>) -> BridgeResult<f32> {
        let denoiser = self.resolve(raw)?;
        let samples = check_samples(samples, self.frame_size())?;
        Ok(denoiser.lock().process_read_only(samples))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

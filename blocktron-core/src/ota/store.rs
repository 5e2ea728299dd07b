//! Persistent phase and verify-counter store
//!
//! Two bytes of reboot-durable state drive the whole protocol. Every write
//! is awaited to completion before returning, so the stored value reflects
//! reality even if power is cut right after.

use blocktron_hal::{NvmError, NvmKey, NvmStorage};

use super::phase::Phase;

/// Phase and counter store over injected non-volatile storage
pub struct StateStore<N> {
    nvm: N,
}

impl<N: NvmStorage> StateStore<N> {
    /// Create a store over the given storage
    pub fn new(nvm: N) -> Self {
        Self { nvm }
    }

    /// Read the current phase
    ///
    /// An unwritten key or an unknown byte value reads as [`Phase::Normal`].
    pub async fn read_phase(&mut self) -> Result<Phase, NvmError> {
        let raw = self.read_byte(NvmKey::UpdatePhase).await?;
        match Phase::from_u8(raw) {
            Some(phase) => Ok(phase),
            None => {
                warn!("Unknown update phase byte {}, treating as normal", raw);
                Ok(Phase::Normal)
            }
        }
    }

    /// Durably write the phase
    pub async fn write_phase(&mut self, phase: Phase) -> Result<(), NvmError> {
        debug!("Phase -> {}", phase.as_u8());
        self.nvm.write(NvmKey::UpdatePhase, phase.as_u8()).await
    }

    /// Read the verify counter (0 if never written)
    pub async fn read_counter(&mut self) -> Result<u8, NvmError> {
        self.read_byte(NvmKey::VerifyCounter).await
    }

    /// Durably write the verify counter
    pub async fn write_counter(&mut self, count: u8) -> Result<(), NvmError> {
        self.nvm.write(NvmKey::VerifyCounter, count).await
    }

    /// Access the underlying storage
    pub fn storage(&self) -> &N {
        &self.nvm
    }

    /// Release the underlying storage
    pub fn into_inner(self) -> N {
        self.nvm
    }

    async fn read_byte(&mut self, key: NvmKey) -> Result<u8, NvmError> {
        match self.nvm.read(key).await {
            Ok(value) => Ok(value),
            Err(NvmError::NotFound) => Ok(0),
            Err(e) => Err(e),
        }
    }
}

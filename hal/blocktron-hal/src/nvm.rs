//! Non-volatile byte storage
//!
//! Provides the trait for the handful of bytes that must survive power
//! loss and reboot. Chip-specific HALs back it with flash, EEPROM or a
//! dedicated NVM region.

/// Addressable bytes in non-volatile storage
///
/// Each key holds exactly one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum NvmKey {
    /// Current update protocol phase
    UpdatePhase = 0,
    /// Boots observed while waiting for confirmation
    VerifyCounter = 1,
}

impl NvmKey {
    /// Get the key as a byte value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Create a key from a byte value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(NvmKey::UpdatePhase),
            1 => Some(NvmKey::VerifyCounter),
            _ => None,
        }
    }
}

/// Errors from non-volatile storage operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NvmError {
    /// Key has never been written
    NotFound,
    /// Flash operation failed
    Flash,
    /// Storage operation failed
    Storage,
    /// Data corrupted or invalid
    Corrupted,
    /// Storage is full
    Full,
}

/// Non-volatile byte storage trait
///
/// Writes must be durable by the time the returned future completes:
/// callers rely on the value surviving a power cut on the very next
/// instruction.
pub trait NvmStorage {
    /// Read the byte stored under `key`
    ///
    /// Returns [`NvmError::NotFound`] if the key was never written.
    fn read(&mut self, key: NvmKey) -> impl core::future::Future<Output = Result<u8, NvmError>>;

    /// Write the byte stored under `key`
    fn write(
        &mut self,
        key: NvmKey,
        value: u8,
    ) -> impl core::future::Future<Output = Result<(), NvmError>>;
}

// Implement the sequential-storage Key trait when the feature is enabled
#[cfg(feature = "sequential-storage")]
impl sequential_storage::map::Key for NvmKey {
    fn serialize_into(
        &self,
        buffer: &mut [u8],
    ) -> Result<usize, sequential_storage::map::SerializationError> {
        if buffer.is_empty() {
            return Err(sequential_storage::map::SerializationError::BufferTooSmall);
        }
        buffer[0] = self.as_u8();
        Ok(1)
    }

    fn deserialize_from(
        buffer: &[u8],
    ) -> Result<(Self, usize), sequential_storage::map::SerializationError> {
        if buffer.is_empty() {
            return Err(sequential_storage::map::SerializationError::BufferTooSmall);
        }
        match NvmKey::from_u8(buffer[0]) {
            Some(key) => Ok((key, 1)),
            None => Err(sequential_storage::map::SerializationError::InvalidFormat),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_byte_mapping() {
        assert_eq!(NvmKey::UpdatePhase.as_u8(), 0);
        assert_eq!(NvmKey::VerifyCounter.as_u8(), 1);
        assert_eq!(NvmKey::from_u8(0), Some(NvmKey::UpdatePhase));
        assert_eq!(NvmKey::from_u8(1), Some(NvmKey::VerifyCounter));
        assert_eq!(NvmKey::from_u8(2), None);
    }
}

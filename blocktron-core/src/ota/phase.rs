//! Update protocol phase

/// Persisted phase of the update protocol
///
/// Stored as a single byte under [`blocktron_hal::NvmKey::UpdatePhase`].
/// The discriminants are part of the on-device format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Phase {
    /// No update in progress
    #[default]
    Normal = 0,
    /// Artifacts downloaded, manifest written, swap not yet armed
    Downloading = 1,
    /// Swapped build is running and awaits confirmation
    PendingVerify = 2,
    /// Staged artifacts are waiting to be promoted at the next boot
    SwapPending = 3,
}

impl Phase {
    /// Get the phase as its stored byte
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decode a stored byte
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Phase::Normal),
            1 => Some(Phase::Downloading),
            2 => Some(Phase::PendingVerify),
            3 => Some(Phase::SwapPending),
            _ => None,
        }
    }

    /// Check if an update cycle is in flight
    pub fn is_pending(self) -> bool {
        self != Phase::Normal
    }

    /// Check if the volume must stay hidden from the USB host
    pub fn suppresses_host_access(self) -> bool {
        matches!(self, Phase::Downloading | Phase::SwapPending)
    }
}

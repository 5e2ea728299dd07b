//! OTA error types

use blocktron_hal::{FsError, NvmError};

use crate::config::ConfigError;

use super::manifest::ManifestError;

/// Errors from the update protocol
///
/// Network failures and rejected artifacts are reported as
/// [`CheckOutcome`](super::CheckOutcome) values instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OtaError {
    /// Persistent state store failed (fatal)
    Store(NvmError),
    /// Filesystem operation failed
    Fs(FsError),
    /// Stage manifest could not be built or written
    Manifest(ManifestError),
    /// Managed file name plus staging suffix exceeds the path limit
    NameTooLong,
    /// Configuration is unusable
    Config(ConfigError),
}

impl From<NvmError> for OtaError {
    fn from(e: NvmError) -> Self {
        OtaError::Store(e)
    }
}

impl From<FsError> for OtaError {
    fn from(e: FsError) -> Self {
        OtaError::Fs(e)
    }
}

impl From<ManifestError> for OtaError {
    fn from(e: ManifestError) -> Self {
        match e {
            ManifestError::Fs(fs) => OtaError::Fs(fs),
            other => OtaError::Manifest(other),
        }
    }
}

impl From<ConfigError> for OtaError {
    fn from(e: ConfigError) -> Self {
        OtaError::Config(e)
    }
}

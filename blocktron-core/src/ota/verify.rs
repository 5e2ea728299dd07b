//! Verification gate
//!
//! After a swap the new build has a bounded number of boots to reach its
//! confirmation checkpoint. Each boot without a confirmation marker bumps
//! the counter before the application runs; reaching the limit triggers
//! rollback. Confirmation clears the cycle for good.

use blocktron_hal::{FileSystem, NvmStorage};

use super::error::OtaError;
use super::guard::WriteAccess;
use super::manifest::StageManifest;
use super::paths::{backup, remove_if_present};
use super::phase::Phase;
use super::store::StateStore;

/// Content written to the confirmation marker
pub const CONFIRM_MARKER_CONTENT: &[u8] = b"ok";

/// Outcome of counting a boot in the verification window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootCount {
    /// Marker present; this cycle was already confirmed
    AlreadyConfirmed,
    /// Boot counted, still within the window
    Counted { attempt: u8 },
    /// Boot counted and the limit is reached
    ThresholdReached { attempt: u8 },
}

/// Outcome of the confirmation checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Confirmation {
    /// No update awaiting confirmation
    NotPending,
    /// Update confirmed and all cycle artifacts removed
    Confirmed,
}

/// Count one boot in the verification window
pub async fn count_boot<N: NvmStorage, F: FileSystem + ?Sized>(
    store: &mut StateStore<N>,
    fs: &mut F,
    confirm_marker: &str,
    max_verify_boots: u8,
) -> Result<BootCount, OtaError> {
    if fs.exists(confirm_marker) {
        debug!("Confirmation marker present, not counting");
        return Ok(BootCount::AlreadyConfirmed);
    }

    let attempt = store.read_counter().await?.saturating_add(1);
    store.write_counter(attempt).await?;

    if attempt >= max_verify_boots {
        warn!(
            "Unconfirmed boot {} of {}, rolling back",
            attempt, max_verify_boots
        );
        Ok(BootCount::ThresholdReached { attempt })
    } else {
        info!("Unconfirmed boot {} of {}", attempt, max_verify_boots);
        Ok(BootCount::Counted { attempt })
    }
}

/// Confirm the running build
///
/// No-op unless the phase is `PendingVerify`. Otherwise writes the marker,
/// clears the counter and the phase, then removes backups, the manifest and
/// finally the marker. The phase write is the durability point: anything
/// left behind after it is residue, not state.
pub async fn confirm<N: NvmStorage, F: FileSystem + ?Sized>(
    store: &mut StateStore<N>,
    fs: &mut F,
    manifest_path: &str,
    confirm_marker: &str,
    fallback: StageManifest,
) -> Result<Confirmation, OtaError> {
    if store.read_phase().await? != Phase::PendingVerify {
        return Ok(Confirmation::NotPending);
    }

    let mut fs = WriteAccess::acquire(fs)?;
    fs.write(confirm_marker, CONFIRM_MARKER_CONTENT)?;

    store.write_counter(0).await?;
    store.write_phase(Phase::Normal).await?;
    info!("Update confirmed");

    let manifest = StageManifest::load_or(&mut *fs, manifest_path, fallback);
    for name in manifest.iter() {
        remove_if_present(&mut *fs, &backup(name)?)?;
    }
    StageManifest::delete(&mut *fs, manifest_path)?;
    remove_if_present(&mut *fs, confirm_marker)?;

    Ok(Confirmation::Confirmed)
}

//! Boot-time swap engine
//!
//! Promotes staged `<name>.new` files into place, keeping the previous
//! live file as `<name>.bak`. Each rename is atomic on its own; there is
//! no atomicity across files. If power is lost mid-loop the phase is still
//! `SwapPending`, and the next boot re-runs the loop: files already
//! promoted have no `.new` left and are skipped, the rest are promoted.

use blocktron_hal::{FileSystem, NvmStorage};

use super::error::OtaError;
use super::guard::WriteAccess;
use super::manifest::StageManifest;
use super::paths::{backup, incoming, remove_if_present};
use super::phase::Phase;
use super::store::StateStore;

/// Result of a swap pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SwapReport {
    /// Files promoted from `.new`
    pub promoted: u8,
    /// Manifest entries with nothing staged
    pub skipped: u8,
}

/// Promote every staged file named in the manifest
///
/// Filesystem-only part of the swap; the caller holds write access.
pub fn promote_staged<F: FileSystem + ?Sized>(
    fs: &mut F,
    manifest: &StageManifest,
) -> Result<SwapReport, OtaError> {
    let mut report = SwapReport::default();

    for name in manifest.iter() {
        let new = incoming(name)?;
        if !fs.exists(&new) {
            debug!("Swap: nothing staged for {}", name);
            report.skipped = report.skipped.saturating_add(1);
            continue;
        }

        let bak = backup(name)?;
        remove_if_present(fs, &bak)?;
        if fs.exists(name) {
            fs.rename(name, &bak)?;
        }
        fs.rename(&new, name)?;

        info!("Swap: promoted {}", name);
        report.promoted = report.promoted.saturating_add(1);
    }

    Ok(report)
}

/// Run the swap and enter the verification window
///
/// A stale confirmation marker is removed first so the new build is
/// counted from its first boot.
pub async fn run_swap<N: NvmStorage, F: FileSystem + ?Sized>(
    store: &mut StateStore<N>,
    fs: &mut F,
    manifest: &StageManifest,
    confirm_marker: &str,
) -> Result<SwapReport, OtaError> {
    let report = {
        let mut fs = WriteAccess::acquire(fs)?;
        let report = promote_staged(&mut *fs, manifest)?;
        remove_if_present(&mut *fs, confirm_marker)?;
        report
    };

    store.write_counter(0).await?;
    store.write_phase(Phase::PendingVerify).await?;

    info!(
        "Swap complete: {} promoted, {} skipped",
        report.promoted, report.skipped
    );
    Ok(report)
}

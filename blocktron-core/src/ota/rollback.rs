//! Rollback engine
//!
//! Restores `<name>.bak` over every managed file that has a backup, then
//! clears the manifest and confirmation marker and returns the protocol to
//! `Normal`. Safe to run on a manifest whose files were never fully
//! swapped: entries without a backup are skipped.

use blocktron_hal::{FileSystem, NvmStorage};

use super::error::OtaError;
use super::guard::WriteAccess;
use super::manifest::StageManifest;
use super::paths::{backup, remove_if_present};
use super::phase::Phase;
use super::store::StateStore;

/// Result of a rollback pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RollbackReport {
    /// Files restored from `.bak`
    pub restored: u8,
    /// Manifest entries without a backup
    pub missing_backup: u8,
}

/// Restore backups for every file named in the manifest
///
/// The caller holds write access.
pub fn restore_backups<F: FileSystem + ?Sized>(
    fs: &mut F,
    manifest: &StageManifest,
) -> Result<RollbackReport, OtaError> {
    let mut report = RollbackReport::default();

    for name in manifest.iter() {
        let bak = backup(name)?;
        if !fs.exists(&bak) {
            debug!("Rollback: no backup for {}", name);
            report.missing_backup = report.missing_backup.saturating_add(1);
            continue;
        }

        remove_if_present(fs, name)?;
        fs.rename(&bak, name)?;

        info!("Rollback: restored {}", name);
        report.restored = report.restored.saturating_add(1);
    }

    Ok(report)
}

/// Roll back to the previous build and return to `Normal`
pub async fn run_rollback<N: NvmStorage, F: FileSystem + ?Sized>(
    store: &mut StateStore<N>,
    fs: &mut F,
    manifest: &StageManifest,
    manifest_path: &str,
    confirm_marker: &str,
) -> Result<RollbackReport, OtaError> {
    let report = {
        let mut fs = WriteAccess::acquire(fs)?;
        let report = restore_backups(&mut *fs, manifest)?;
        StageManifest::delete(&mut *fs, manifest_path)?;
        remove_if_present(&mut *fs, confirm_marker)?;
        report
    };

    store.write_counter(0).await?;
    store.write_phase(Phase::Normal).await?;

    warn!(
        "Rolled back: {} restored, {} without backup",
        report.restored, report.missing_backup
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryFs, MemoryNvm};
    use blocktron_hal::{FsError, MountMode};
    use embassy_futures::block_on;

    const MANIFEST: &str = "ota_stage.bin";
    const MARKER: &str = "ota_confirmed";

    fn swapped_fs() -> MemoryFs {
        let mut fs = MemoryFs::shared();
        fs.insert("A", b"1x");
        fs.insert("A.bak", b"1");
        fs.insert("B", b"2x");
        fs.insert("B.bak", b"2");
        fs
    }

    fn manifest() -> StageManifest {
        StageManifest::from_names(&["A", "B"]).unwrap()
    }

    #[test]
    fn test_rollback_restores_and_clears() {
        let mut fs = swapped_fs();
        fs.insert(MARKER, b"ok");
        fs.insert(MANIFEST, b"anything");

        let mut store = StateStore::new(MemoryNvm::new());
        block_on(store.write_phase(Phase::PendingVerify)).unwrap();
        block_on(store.write_counter(3)).unwrap();

        let report =
            block_on(run_rollback(&mut store, &mut fs, &manifest(), MANIFEST, MARKER)).unwrap();

        assert_eq!(report, RollbackReport { restored: 2, missing_backup: 0 });
        assert_eq!(fs.paths(), ["A", "B"]);
        assert_eq!(fs.get("A"), Some(&b"1"[..]));
        assert_eq!(fs.get("B"), Some(&b"2"[..]));
        assert_eq!(block_on(store.read_phase()), Ok(Phase::Normal));
        assert_eq!(block_on(store.read_counter()), Ok(0));
        assert_eq!(fs.mount_mode(), MountMode::ReadOnly);
        assert!(fs.host_access());
    }

    #[test]
    fn test_missing_backups_skipped() {
        let mut fs = MemoryFs::writable();
        fs.insert("A", b"1x");
        fs.insert("A.bak", b"1");
        fs.insert("B", b"2");

        let report = restore_backups(&mut fs, &manifest()).unwrap();
        assert_eq!(report, RollbackReport { restored: 1, missing_backup: 1 });
        assert_eq!(fs.get("A"), Some(&b"1"[..]));
        assert_eq!(fs.get("B"), Some(&b"2"[..]));
    }

    #[test]
    fn test_backup_without_live_file() {
        let mut fs = MemoryFs::writable();
        fs.insert("A.bak", b"1");
        restore_backups(&mut fs, &StageManifest::from_names(&["A"]).unwrap()).unwrap();
        assert_eq!(fs.get("A"), Some(&b"1"[..]));
    }

    #[test]
    fn test_rollback_is_idempotent() {
        let mut fs = swapped_fs();
        let mut store = StateStore::new(MemoryNvm::new());
        block_on(run_rollback(&mut store, &mut fs, &manifest(), MANIFEST, MARKER)).unwrap();
        let report =
            block_on(run_rollback(&mut store, &mut fs, &manifest(), MANIFEST, MARKER)).unwrap();
        assert_eq!(report, RollbackReport { restored: 0, missing_backup: 2 });
        assert_eq!(fs.get("A"), Some(&b"1"[..]));
    }

    #[test]
    fn test_unexpected_error_propagates_with_phase_unchanged() {
        let mut fs = swapped_fs();
        fs.fail_on("B", FsError::Io);
        let mut store = StateStore::new(MemoryNvm::new());
        block_on(store.write_phase(Phase::PendingVerify)).unwrap();

        let result = block_on(run_rollback(&mut store, &mut fs, &manifest(), MANIFEST, MARKER));
        assert_eq!(result, Err(OtaError::Fs(FsError::Io)));
        assert_eq!(block_on(store.read_phase()), Ok(Phase::PendingVerify));
        assert_eq!(fs.mount_mode(), MountMode::ReadOnly);
    }
}

//! Staging paths and best-effort cleanup

use core::fmt::Write;

use blocktron_hal::{FileSystem, FsError};
use heapless::String;

use crate::config::MAX_PATH_LEN;

use super::error::OtaError;

/// Suffix of an incoming candidate
pub const NEW_SUFFIX: &str = ".new";

/// Suffix of a pre-swap backup
pub const BAK_SUFFIX: &str = ".bak";

/// Path buffer sized for a managed name plus a staging suffix
pub type StagePath = String<MAX_PATH_LEN>;

/// Build `<name><suffix>`
pub fn suffixed(name: &str, suffix: &str) -> Result<StagePath, OtaError> {
    let mut path = StagePath::new();
    write!(path, "{}{}", name, suffix).map_err(|_| OtaError::NameTooLong)?;
    Ok(path)
}

/// Incoming candidate path for `name`
pub fn incoming(name: &str) -> Result<StagePath, OtaError> {
    suffixed(name, NEW_SUFFIX)
}

/// Backup path for `name`
pub fn backup(name: &str) -> Result<StagePath, OtaError> {
    suffixed(name, BAK_SUFFIX)
}

/// Remove a file, treating absence as success
///
/// Only [`FsError::NotFound`] is swallowed; anything else propagates.
pub fn remove_if_present<F: FileSystem + ?Sized>(fs: &mut F, path: &str) -> Result<(), FsError> {
    match fs.remove(path) {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => {
            trace!("Nothing to remove");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

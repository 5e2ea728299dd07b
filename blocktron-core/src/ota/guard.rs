//! Scoped write access to the filesystem
//!
//! The volume is normally shared with a USB host and mounted read-only on
//! the device side. Staging, swapping and rollback need it writable and
//! hidden from the host. [`WriteAccess`] takes the volume over on acquire
//! and hands it back on drop, so every exit path (including `?`) restores
//! the previous state.

use core::ops::{Deref, DerefMut};

use blocktron_hal::{FileSystem, FsError, MountMode};

/// Exclusive writable access to the volume
pub struct WriteAccess<'a, F: FileSystem + ?Sized> {
    fs: &'a mut F,
    prior_mode: MountMode,
    prior_host_access: bool,
}

impl<'a, F: FileSystem + ?Sized> WriteAccess<'a, F> {
    /// Hide the volume from the host and remount it writable
    ///
    /// On failure, whatever was already changed is put back before the
    /// error is returned.
    pub fn acquire(fs: &'a mut F) -> Result<Self, FsError> {
        let prior_mode = fs.mount_mode();
        let prior_host_access = fs.host_access();

        if prior_host_access {
            fs.set_host_access(false)?;
        }

        if prior_mode != MountMode::Writable {
            if let Err(e) = fs.remount(MountMode::Writable) {
                error!("Remount writable failed: {:?}", e);
                if prior_host_access {
                    let _ = fs.set_host_access(true);
                }
                return Err(e);
            }
        }

        trace!("Write access acquired");
        Ok(Self {
            fs,
            prior_mode,
            prior_host_access,
        })
    }
}

impl<F: FileSystem + ?Sized> Deref for WriteAccess<'_, F> {
    type Target = F;

    fn deref(&self) -> &F {
        self.fs
    }
}

impl<F: FileSystem + ?Sized> DerefMut for WriteAccess<'_, F> {
    fn deref_mut(&mut self) -> &mut F {
        self.fs
    }
}

impl<F: FileSystem + ?Sized> Drop for WriteAccess<'_, F> {
    fn drop(&mut self) {
        if self.fs.mount_mode() != self.prior_mode {
            if let Err(e) = self.fs.remount(self.prior_mode) {
                error!("Failed to restore mount mode: {:?}", e);
            }
        }
        if self.fs.host_access() != self.prior_host_access {
            if let Err(e) = self.fs.set_host_access(self.prior_host_access) {
                error!("Failed to restore host access: {:?}", e);
            }
        }
        trace!("Write access released");
    }
}

//! Filesystem abstractions
//!
//! A flat, single-volume filesystem as exposed by the board's storage
//! layer. The volume can be shared with a USB host, in which case the
//! firmware only sees it read-only until it takes the volume back.
//!
//! Operations are blocking: they are short, and the mount-mode restore
//! has to run from `Drop`.

/// Device-side mount mode of the volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MountMode {
    /// Firmware may only read (host owns writes)
    ReadOnly,
    /// Firmware may create, rename and delete files
    Writable,
}

/// Errors from filesystem operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FsError {
    /// File does not exist
    NotFound,
    /// Rename target already exists
    AlreadyExists,
    /// Volume is mounted read-only
    ReadOnly,
    /// Buffer too small for the file contents
    BufferTooSmall,
    /// Path exceeds the supported length
    NameTooLong,
    /// Underlying storage failed
    Io,
}

impl FsError {
    /// Check if this error only reports a missing file
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound)
    }
}

/// Filesystem trait
///
/// Rename is the only atomic primitive: a single `rename` either happens
/// completely or not at all. There is no multi-file transaction.
pub trait FileSystem {
    /// Check if a file exists
    fn exists(&mut self, path: &str) -> bool;

    /// Read a whole file into the provided buffer
    ///
    /// # Returns
    /// The number of bytes read, or [`FsError::BufferTooSmall`] if the
    /// file does not fit.
    fn read(&mut self, path: &str, buffer: &mut [u8]) -> Result<usize, FsError>;

    /// Read part of a file starting at byte `offset`
    ///
    /// # Returns
    /// The number of bytes read; 0 once `offset` reaches the end of the file.
    fn read_at(&mut self, path: &str, offset: usize, buffer: &mut [u8]) -> Result<usize, FsError>;

    /// Create or truncate a file and write `data` to it
    fn write(&mut self, path: &str, data: &[u8]) -> Result<(), FsError>;

    /// Rename `from` to `to`
    ///
    /// Fails with [`FsError::AlreadyExists`] if `to` exists and with
    /// [`FsError::NotFound`] if `from` does not.
    fn rename(&mut self, from: &str, to: &str) -> Result<(), FsError>;

    /// Delete a file
    fn remove(&mut self, path: &str) -> Result<(), FsError>;

    /// Current device-side mount mode
    fn mount_mode(&self) -> MountMode;

    /// Remount the volume in the given mode
    fn remount(&mut self, mode: MountMode) -> Result<(), FsError>;

    /// Check if the volume is currently exposed to a USB host
    fn host_access(&self) -> bool;

    /// Expose or hide the volume from a USB host
    fn set_host_access(&mut self, enabled: bool) -> Result<(), FsError>;
}

//! Stage manifest
//!
//! The list of managed files taking part in the current update cycle,
//! persisted so it survives the reboot between staging and swapping.
//!
//! The document is postcard-encoded with a magic number, a format version
//! and a CRC32 over the contents. Loading never fails: a missing or damaged
//! document yields the default file set, so the protocol cannot wedge on a
//! bad manifest.

use blocktron_hal::{FileSystem, FsError};
use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::config::{FileName, Target, DEFAULT_TARGETS, MAX_TARGETS};

use super::paths::remove_if_present;

/// Magic number identifying a stage manifest
pub const MANIFEST_MAGIC: u32 = 0x4F54414D; // "OTAM"

/// Current manifest format version
pub const MANIFEST_VERSION: u8 = 1;

/// Largest encoded manifest
pub const MAX_MANIFEST_SIZE: usize = 320;

/// Manifest errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ManifestError {
    /// File name exceeds the name limit
    NameTooLong,
    /// More files than the manifest can hold
    TooManyFiles,
    /// Document holds no files
    Empty,
    /// Encoding failed
    Serialize,
    /// Decoding failed
    Deserialize,
    /// Wrong magic or version
    InvalidFormat,
    /// CRC does not match the contents
    CrcMismatch,
    /// Filesystem error
    Fs(FsError),
}

impl From<FsError> for ManifestError {
    fn from(e: FsError) -> Self {
        ManifestError::Fs(e)
    }
}

/// Ordered set of managed file names
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StageManifest {
    files: Vec<FileName, MAX_TARGETS>,
}

impl Default for StageManifest {
    /// The built-in file set: primary script, boot script, version marker
    fn default() -> Self {
        let mut manifest = Self::new();
        for name in DEFAULT_TARGETS {
            let _ = manifest.push(name);
        }
        manifest
    }
}

impl StageManifest {
    /// Create an empty manifest
    pub const fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Create a manifest from a list of names
    pub fn from_names(names: &[&str]) -> Result<Self, ManifestError> {
        let mut manifest = Self::new();
        for name in names {
            manifest.push(name)?;
        }
        Ok(manifest)
    }

    /// Create a manifest naming every target
    pub fn for_targets(targets: &[Target]) -> Self {
        let mut manifest = Self::new();
        for target in targets {
            // Both are bounded by MAX_TARGETS and MAX_FILE_NAME_LEN
            let _ = manifest.push(&target.name);
        }
        manifest
    }

    /// Append a name; a name already present is left where it is
    pub fn push(&mut self, name: &str) -> Result<(), ManifestError> {
        if self.contains(name) {
            return Ok(());
        }
        let name = FileName::try_from(name).map_err(|_| ManifestError::NameTooLong)?;
        self.files
            .push(name)
            .map_err(|_| ManifestError::TooManyFiles)
    }

    /// Check if a name is listed
    pub fn contains(&self, name: &str) -> bool {
        self.files.iter().any(|f| f.as_str() == name)
    }

    /// Iterate names in manifest order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.as_str())
    }

    /// Number of names
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the manifest is empty
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Load the manifest at `path`, falling back to the built-in set
    pub fn load<F: FileSystem + ?Sized>(fs: &mut F, path: &str) -> Self {
        Self::load_or(fs, path, Self::default())
    }

    /// Load the manifest at `path`, falling back to `fallback`
    pub fn load_or<F: FileSystem + ?Sized>(fs: &mut F, path: &str, fallback: Self) -> Self {
        match Self::try_load(fs, path) {
            Ok(manifest) => {
                debug!("Loaded stage manifest with {} files", manifest.len());
                manifest
            }
            Err(ManifestError::Fs(FsError::NotFound)) => {
                debug!("No stage manifest, using defaults");
                fallback
            }
            Err(e) => {
                warn!("Failed to load stage manifest: {:?}, using defaults", e);
                fallback
            }
        }
    }

    /// Load the manifest at `path`, reporting why it is unusable
    pub fn try_load<F: FileSystem + ?Sized>(
        fs: &mut F,
        path: &str,
    ) -> Result<Self, ManifestError> {
        let mut buffer = [0u8; MAX_MANIFEST_SIZE];
        let len = fs.read(path, &mut buffer)?;

        let doc: ManifestDocument =
            postcard::from_bytes(&buffer[..len]).map_err(|_| ManifestError::Deserialize)?;

        if doc.magic != MANIFEST_MAGIC || doc.version != MANIFEST_VERSION {
            return Err(ManifestError::InvalidFormat);
        }
        if doc.crc != doc.calculate_crc() {
            warn!("Stage manifest CRC mismatch");
            return Err(ManifestError::CrcMismatch);
        }
        if doc.files.is_empty() {
            return Err(ManifestError::Empty);
        }

        Ok(Self { files: doc.files })
    }

    /// Persist the manifest at `path`
    pub fn save<F: FileSystem + ?Sized>(
        &self,
        fs: &mut F,
        path: &str,
    ) -> Result<(), ManifestError> {
        let mut doc = ManifestDocument {
            magic: MANIFEST_MAGIC,
            version: MANIFEST_VERSION,
            files: self.files.clone(),
            crc: 0,
        };
        doc.crc = doc.calculate_crc();

        let mut buffer = [0u8; MAX_MANIFEST_SIZE];
        let bytes = postcard::to_slice(&doc, &mut buffer).map_err(|_| ManifestError::Serialize)?;

        debug!("Saving {} byte stage manifest", bytes.len());
        fs.write(path, bytes)?;
        Ok(())
    }

    /// Delete the manifest at `path`; absence is not an error
    pub fn delete<F: FileSystem + ?Sized>(fs: &mut F, path: &str) -> Result<(), FsError> {
        remove_if_present(fs, path)
    }
}

/// On-disk manifest layout
#[derive(Debug, Serialize, Deserialize)]
struct ManifestDocument {
    magic: u32,
    version: u8,
    files: Vec<FileName, MAX_TARGETS>,
    crc: u32,
}

impl ManifestDocument {
    fn calculate_crc(&self) -> u32 {
        let mut crc: u32 = 0xFFFFFFFF;
        crc = crc32_update(crc, &self.magic.to_le_bytes());
        crc = crc32_update(crc, &[self.version]);
        for name in &self.files {
            crc = crc32_update(crc, &[name.len() as u8]);
            crc = crc32_update(crc, name.as_bytes());
        }
        !crc
    }
}

/// CRC32 update (IEEE 802.3 polynomial)
fn crc32_update(crc: u32, data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB88320;
    let mut crc = crc;

    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}

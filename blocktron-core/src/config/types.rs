//! OTA configuration type definitions
//!
//! Defaults match the deployed device: three managed files fetched from
//! the project's source tree, checked every six hours.

use core::fmt::Write;

use heapless::{String, Vec};

/// Maximum managed file name length
pub const MAX_FILE_NAME_LEN: usize = 32;

/// Maximum path length (file name plus a staging suffix)
pub const MAX_PATH_LEN: usize = MAX_FILE_NAME_LEN + 4;

/// Maximum URL length
pub const MAX_URL_LEN: usize = 160;

/// Maximum number of update targets
pub const MAX_TARGETS: usize = 8;

/// Managed file name
pub type FileName = String<MAX_FILE_NAME_LEN>;

/// Artifact URL
pub type Url = String<MAX_URL_LEN>;

/// Default artifact source
pub const DEFAULT_BASE_URL: &str =
    "https://raw.githubusercontent.com/GingerSherpa/BlockTron/main/Source";

/// Default version marker file
pub const DEFAULT_VERSION_FILE: &str = "version_history.txt";

/// Default stage manifest location
pub const DEFAULT_MANIFEST_PATH: &str = "ota_stage.bin";

/// Default confirmation marker location
pub const DEFAULT_CONFIRM_MARKER_PATH: &str = "ota_confirmed";

/// Default managed files: primary executable, boot script, version marker
pub const DEFAULT_TARGETS: [&str; 3] = ["code.py", "boot.py", DEFAULT_VERSION_FILE];

/// Byte sequence a script artifact must contain to be accepted
pub const SCRIPT_SIGNATURE: &[u8] = b"import ";

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// File name exceeds MAX_FILE_NAME_LEN
    NameTooLong,
    /// URL exceeds MAX_URL_LEN
    UrlTooLong,
    /// More than MAX_TARGETS targets
    TooManyTargets,
    /// No targets configured
    NoTargets,
    /// Version file is not one of the targets
    MissingVersionTarget,
    /// max_verify_boots must be at least 1
    ZeroVerifyBoots,
    /// check_interval_s must be at least 1
    ZeroCheckInterval,
    /// min_artifact_size exceeds max_artifact_size
    SizeBounds,
}

/// Artifact kind, selecting the sanity check applied after download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ArtifactKind {
    /// Executable script; must contain at least one import statement
    Script,
    /// Opaque data; size check only
    Data,
}

impl ArtifactKind {
    /// Infer the kind from a file name
    pub fn for_name(name: &str) -> Self {
        if name.ends_with(".py") {
            ArtifactKind::Script
        } else {
            ArtifactKind::Data
        }
    }

    /// Apply the kind-specific content check
    ///
    /// This is a coarse heuristic against HTML error pages and truncated
    /// responses, not a correctness proof.
    pub fn passes_sanity(&self, payload: &[u8]) -> bool {
        match self {
            ArtifactKind::Script => payload
                .windows(SCRIPT_SIGNATURE.len())
                .any(|w| w == SCRIPT_SIGNATURE),
            ArtifactKind::Data => true,
        }
    }
}

/// A managed file and where to fetch it from
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Target {
    /// Live file name on the device
    pub name: FileName,
    /// Source URL
    pub url: Url,
    /// Sanity check selector
    pub kind: ArtifactKind,
}

impl Target {
    /// Create a target with an explicit URL
    pub fn new(name: &str, url: &str, kind: ArtifactKind) -> Result<Self, ConfigError> {
        Ok(Self {
            name: FileName::try_from(name).map_err(|_| ConfigError::NameTooLong)?,
            url: Url::try_from(url).map_err(|_| ConfigError::UrlTooLong)?,
            kind,
        })
    }

    /// Create a target at `<base_url>/<name>` with the kind inferred from the name
    pub fn from_base(base_url: &str, name: &str) -> Result<Self, ConfigError> {
        let mut url = Url::new();
        write!(url, "{}/{}", base_url.trim_end_matches('/'), name)
            .map_err(|_| ConfigError::UrlTooLong)?;
        Ok(Self {
            name: FileName::try_from(name).map_err(|_| ConfigError::NameTooLong)?,
            url,
            kind: ArtifactKind::for_name(name),
        })
    }
}

/// Over-the-air update configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OtaConfig {
    /// Periodic update checks enabled
    pub enabled: bool,
    /// Seconds between update checks
    pub check_interval_s: u32,
    /// Unconfirmed boots tolerated before rollback
    pub max_verify_boots: u8,
    /// Smallest accepted artifact, in bytes
    pub min_artifact_size: usize,
    /// Largest accepted artifact, in bytes (download buffer size)
    pub max_artifact_size: usize,
    /// Network timeout for the version marker request
    pub version_timeout_ms: u32,
    /// Network timeout for each artifact request
    pub fetch_timeout_ms: u32,
    /// Target whose contents identify the build
    pub version_file: FileName,
    /// Stage manifest location
    pub manifest_path: FileName,
    /// Confirmation marker location
    pub confirm_marker_path: FileName,
    /// Managed files
    pub targets: Vec<Target, MAX_TARGETS>,
}

impl Default for OtaConfig {
    fn default() -> Self {
        let mut targets = Vec::new();
        for name in DEFAULT_TARGETS {
            if let Ok(target) = Target::from_base(DEFAULT_BASE_URL, name) {
                let _ = targets.push(target);
            }
        }

        Self {
            enabled: true,
            check_interval_s: 6 * 60 * 60,
            max_verify_boots: 3,
            min_artifact_size: 32,
            max_artifact_size: 64 * 1024,
            version_timeout_ms: 10_000,
            fetch_timeout_ms: 20_000,
            version_file: FileName::try_from(DEFAULT_VERSION_FILE).unwrap_or_default(),
            manifest_path: FileName::try_from(DEFAULT_MANIFEST_PATH).unwrap_or_default(),
            confirm_marker_path: FileName::try_from(DEFAULT_CONFIRM_MARKER_PATH)
                .unwrap_or_default(),
            targets,
        }
    }
}

impl OtaConfig {
    /// Default configuration with every default target fetched from `base_url`
    pub fn with_base_url(base_url: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.targets.clear();
        for name in DEFAULT_TARGETS {
            config
                .targets
                .push(Target::from_base(base_url, name)?)
                .map_err(|_| ConfigError::TooManyTargets)?;
        }
        Ok(config)
    }

    /// Find a target by file name
    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name.as_str() == name)
    }

    /// The target carrying the version marker
    pub fn version_target(&self) -> Option<&Target> {
        self.target(self.version_file.as_str())
    }

    /// Check interval in milliseconds
    pub fn check_interval_ms(&self) -> u64 {
        u64::from(self.check_interval_s) * 1000
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_verify_boots == 0 {
            return Err(ConfigError::ZeroVerifyBoots);
        }
        if self.check_interval_s == 0 {
            return Err(ConfigError::ZeroCheckInterval);
        }
        if self.min_artifact_size > self.max_artifact_size {
            return Err(ConfigError::SizeBounds);
        }
        if self.targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        if self.version_target().is_none() {
            return Err(ConfigError::MissingVersionTarget);
        }
        Ok(())
    }
}

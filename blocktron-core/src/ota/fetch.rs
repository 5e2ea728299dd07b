//! Artifact fetcher
//!
//! Compares the remote version marker with the local one and, when they
//! differ, downloads every target into its `.new` slot. Acceptance is
//! all-or-nothing: the first rejected artifact aborts the cycle and every
//! `.new` file is removed. Only a complete set is recorded in the stage
//! manifest and armed for the swap.

use blocktron_hal::{FileSystem, FsError, HttpClient, HttpError, NvmStorage};

use crate::config::{ConfigError, FileName, OtaConfig, Target};

use super::error::OtaError;
use super::guard::WriteAccess;
use super::manifest::StageManifest;
use super::paths::{incoming, remove_if_present};
use super::phase::Phase;
use super::store::StateStore;

/// Why an artifact was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rejection {
    /// Request failed
    Http(HttpError),
    /// Non-200 status
    Status(u16),
    /// Payload below the size floor
    TooSmall(usize),
    /// Script without an import statement
    Sanity,
    /// Candidate could not be written
    Write(FsError),
}

/// Outcome of an update check
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CheckOutcome {
    /// Updates are disabled in the configuration
    Disabled,
    /// Another cycle is in flight
    Busy(Phase),
    /// Version marker could not be fetched
    Unreachable,
    /// Remote version marker matches the local one
    UpToDate,
    /// An artifact failed its checks; nothing was staged
    Rejected { name: FileName, reason: Rejection },
    /// All artifacts staged and the swap is armed
    Staged,
}

/// Check for a new build and stage it
///
/// `buffer` receives each download in turn; artifacts and the version
/// marker are limited to the smaller of its length and `max_artifact_size`.
///
/// Network trouble and rejected artifacts are outcomes and never change
/// the phase. On [`CheckOutcome::Staged`] the caller must reset the device.
pub async fn check_and_stage<N, F, H>(
    store: &mut StateStore<N>,
    fs: &mut F,
    http: &mut H,
    config: &OtaConfig,
    buffer: &mut [u8],
) -> Result<CheckOutcome, OtaError>
where
    N: NvmStorage,
    F: FileSystem + ?Sized,
    H: HttpClient,
{
    if !config.enabled {
        return Ok(CheckOutcome::Disabled);
    }

    let phase = store.read_phase().await?;
    if phase != Phase::Normal {
        debug!("Update check skipped, phase {}", phase.as_u8());
        return Ok(CheckOutcome::Busy(phase));
    }

    let version = config
        .version_target()
        .ok_or(ConfigError::MissingVersionTarget)?;

    let limit = buffer.len().min(config.max_artifact_size);
    let buffer = &mut buffer[..limit];

    match check_version(fs, http, version, config.version_timeout_ms, buffer).await {
        VersionCheck::Unreachable => return Ok(CheckOutcome::Unreachable),
        VersionCheck::Same => return Ok(CheckOutcome::UpToDate),
        VersionCheck::Changed => info!("Version change detected, staging update"),
    }

    let mut fs = WriteAccess::acquire(fs)?;

    for target in config.targets.iter() {
        if let Err(reason) = fetch_artifact(&mut *fs, http, target, config, buffer).await {
            warn!("Update aborted, {} rejected: {:?}", target.name.as_str(), reason);
            discard_incoming(&mut *fs, target_names(config))?;
            return Ok(CheckOutcome::Rejected {
                name: target.name.clone(),
                reason,
            });
        }
    }

    let manifest = StageManifest::for_targets(&config.targets);
    if let Err(e) = manifest.save(&mut *fs, &config.manifest_path) {
        error!("Cannot write stage manifest: {:?}", e);
        discard_incoming(&mut *fs, target_names(config))?;
        StageManifest::delete(&mut *fs, &config.manifest_path)?;
        return Err(e.into());
    }
    drop(fs);

    store.write_phase(Phase::Downloading).await?;
    store.write_phase(Phase::SwapPending).await?;
    info!("Update staged, rebooting to swap");

    Ok(CheckOutcome::Staged)
}

/// Remove the `.new` file of every listed name
pub fn discard_incoming<'n, F: FileSystem + ?Sized>(
    fs: &mut F,
    names: impl IntoIterator<Item = &'n str>,
) -> Result<(), OtaError> {
    for name in names {
        remove_if_present(fs, &incoming(name)?)?;
    }
    Ok(())
}

fn target_names(config: &OtaConfig) -> impl Iterator<Item = &str> {
    config.targets.iter().map(|t| t.name.as_str())
}

/// Result of comparing version markers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VersionCheck {
    /// Remote marker could not be fetched, or came back empty
    Unreachable,
    /// Remote marker matches the local file byte for byte
    Same,
    /// Markers differ, or the local one is missing or unreadable
    Changed,
}

/// Local marker is compared in chunks of this size
const COMPARE_CHUNK: usize = 64;

/// Compare the remote version marker with the local file
///
/// The remote marker may use the whole buffer; the local file is streamed
/// through a small stack chunk.
async fn check_version<F, H>(
    fs: &mut F,
    http: &mut H,
    version: &Target,
    timeout_ms: u32,
    buffer: &mut [u8],
) -> VersionCheck
where
    F: FileSystem + ?Sized,
    H: HttpClient,
{
    let remote = match http.get(&version.url, timeout_ms, buffer).await {
        Ok(resp) if resp.is_ok() && resp.len > 0 => &buffer[..resp.len],
        Ok(resp) => {
            debug!("Version check status {}, {} bytes", resp.status, resp.len);
            return VersionCheck::Unreachable;
        }
        Err(e) => {
            debug!("Version check failed: {:?}", e);
            return VersionCheck::Unreachable;
        }
    };

    match local_matches(fs, &version.name, remote) {
        Ok(true) => VersionCheck::Same,
        Ok(false) => VersionCheck::Changed,
        Err(e) => {
            debug!("Local version marker unreadable: {:?}", e);
            VersionCheck::Changed
        }
    }
}

/// Check whether the file at `path` holds exactly `expected`
fn local_matches<F: FileSystem + ?Sized>(
    fs: &mut F,
    path: &str,
    expected: &[u8],
) -> Result<bool, FsError> {
    let mut chunk = [0u8; COMPARE_CHUNK];
    let mut offset = 0;

    loop {
        let len = fs.read_at(path, offset, &mut chunk)?;
        if len == 0 {
            return Ok(offset == expected.len());
        }
        match expected.get(offset..offset + len) {
            Some(part) if part == &chunk[..len] => offset += len,
            _ => return Ok(false),
        }
    }
}

/// Download one artifact into its `.new` slot
async fn fetch_artifact<F, H>(
    fs: &mut F,
    http: &mut H,
    target: &Target,
    config: &OtaConfig,
    buffer: &mut [u8],
) -> Result<(), Rejection>
where
    F: FileSystem + ?Sized,
    H: HttpClient,
{
    let resp = http
        .get(&target.url, config.fetch_timeout_ms, buffer)
        .await
        .map_err(Rejection::Http)?;

    if !resp.is_ok() {
        return Err(Rejection::Status(resp.status));
    }
    if resp.len < config.min_artifact_size {
        return Err(Rejection::TooSmall(resp.len));
    }

    let payload = &buffer[..resp.len];
    if !target.kind.passes_sanity(payload) {
        return Err(Rejection::Sanity);
    }

    let path = incoming(&target.name).map_err(|_| Rejection::Write(FsError::NameTooLong))?;
    fs.write(&path, payload).map_err(Rejection::Write)?;

    info!("Fetched {} ({} bytes)", target.name.as_str(), resp.len);
    Ok(())
}

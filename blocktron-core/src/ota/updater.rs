//! Updater facade
//!
//! Owns the hardware handles and configuration and exposes the three calls
//! the application makes: [`Updater::boot`] first thing after power-on,
//! [`Updater::confirm`] once the application considers itself alive, and
//! [`Updater::poll`] from its main loop.

use blocktron_hal::{FileSystem, HttpClient, NvmStorage, SystemControl};

use crate::config::{ConfigError, OtaConfig};

use super::error::OtaError;
use super::fetch::{check_and_stage, discard_incoming, CheckOutcome};
use super::guard::WriteAccess;
use super::manifest::StageManifest;
use super::phase::Phase;
use super::rollback::{run_rollback, RollbackReport};
use super::store::StateStore;
use super::swap::{run_swap, SwapReport};
use super::verify::{self, count_boot, BootCount, Confirmation};

/// What the boot step did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootAction {
    /// No update in progress
    Normal,
    /// Staged files were promoted; verification window opened
    Swapped(SwapReport),
    /// Unconfirmed boot counted
    Verifying { attempt: u8 },
    /// Verification already recorded for this cycle
    AlreadyConfirmed,
    /// Limit reached; previous build restored
    RolledBack(RollbackReport),
    /// Staging was interrupted before the swap was armed; discarded
    StagingAbandoned,
}

/// OTA update driver
pub struct Updater<N, F, H, S> {
    store: StateStore<N>,
    fs: F,
    http: H,
    system: S,
    config: OtaConfig,
    last_check_ms: Option<u64>,
}

impl<N, F, H, S> Updater<N, F, H, S>
where
    N: NvmStorage,
    F: FileSystem,
    H: HttpClient,
    S: SystemControl,
{
    /// Create an updater after validating the configuration
    pub fn new(
        nvm: N,
        fs: F,
        http: H,
        system: S,
        config: OtaConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            store: StateStore::new(nvm),
            fs,
            http,
            system,
            config,
            last_check_ms: None,
        })
    }

    /// Boot-time step; must run before any other initialization
    pub async fn boot(&mut self) -> Result<BootAction, OtaError> {
        let phase = self.store.read_phase().await?;

        if phase.suppresses_host_access() {
            info!("Maintenance boot, hiding drive from USB host");
            self.fs.set_host_access(false)?;
        }

        match phase {
            Phase::Normal => Ok(BootAction::Normal),
            Phase::SwapPending => {
                let manifest = self.load_manifest();
                let report = run_swap(
                    &mut self.store,
                    &mut self.fs,
                    &manifest,
                    &self.config.confirm_marker_path,
                )
                .await?;
                Ok(BootAction::Swapped(report))
            }
            Phase::PendingVerify => {
                let count = count_boot(
                    &mut self.store,
                    &mut self.fs,
                    &self.config.confirm_marker_path,
                    self.config.max_verify_boots,
                )
                .await?;

                match count {
                    BootCount::AlreadyConfirmed => Ok(BootAction::AlreadyConfirmed),
                    BootCount::Counted { attempt } => Ok(BootAction::Verifying { attempt }),
                    BootCount::ThresholdReached { .. } => {
                        let manifest = self.load_manifest();
                        let report = run_rollback(
                            &mut self.store,
                            &mut self.fs,
                            &manifest,
                            &self.config.manifest_path,
                            &self.config.confirm_marker_path,
                        )
                        .await?;
                        Ok(BootAction::RolledBack(report))
                    }
                }
            }
            Phase::Downloading => {
                self.abandon_staging().await?;
                Ok(BootAction::StagingAbandoned)
            }
        }
    }

    /// Confirmation checkpoint
    ///
    /// Resets the device after a successful confirmation so the next boot
    /// starts clean in `Normal`.
    pub async fn confirm(&mut self) -> Result<Confirmation, OtaError> {
        let fallback = self.fallback_manifest();
        let confirmation = verify::confirm(
            &mut self.store,
            &mut self.fs,
            &self.config.manifest_path,
            &self.config.confirm_marker_path,
            fallback,
        )
        .await?;

        if confirmation == Confirmation::Confirmed {
            info!("Rebooting into confirmed build");
            self.system.reset();
        }
        Ok(confirmation)
    }

    /// Periodic check, driven by the application loop
    ///
    /// The first call only arms the timer. Returns `None` when no check was
    /// due or updates are disabled.
    pub async fn poll(
        &mut self,
        now_ms: u64,
        buffer: &mut [u8],
    ) -> Option<Result<CheckOutcome, OtaError>> {
        if !self.config.enabled {
            return None;
        }

        match self.last_check_ms {
            None => {
                self.last_check_ms = Some(now_ms);
                None
            }
            Some(last) if now_ms.saturating_sub(last) >= self.config.check_interval_ms() => {
                self.last_check_ms = Some(now_ms);
                Some(self.check_now(buffer).await)
            }
            Some(_) => None,
        }
    }

    /// Run one update check now
    ///
    /// Resets the device once an update has been staged.
    pub async fn check_now(&mut self, buffer: &mut [u8]) -> Result<CheckOutcome, OtaError> {
        let outcome = check_and_stage(
            &mut self.store,
            &mut self.fs,
            &mut self.http,
            &self.config,
            buffer,
        )
        .await?;

        if outcome == CheckOutcome::Staged {
            self.system.reset();
        }
        Ok(outcome)
    }

    /// Current persisted phase
    pub async fn phase(&mut self) -> Result<Phase, OtaError> {
        Ok(self.store.read_phase().await?)
    }

    /// Active configuration
    pub fn config(&self) -> &OtaConfig {
        &self.config
    }

    /// Phase and counter store
    pub fn store(&self) -> &StateStore<N> {
        &self.store
    }

    /// Filesystem holding the live and staged files
    pub fn fs(&self) -> &F {
        &self.fs
    }

    /// HTTP client, e.g. to reconfigure it after a network change
    pub fn http_mut(&mut self) -> &mut H {
        &mut self.http
    }

    /// Reset line
    pub fn system(&self) -> &S {
        &self.system
    }

    /// Tear down into the hardware handles
    pub fn into_parts(self) -> (N, F, H, S) {
        (self.store.into_inner(), self.fs, self.http, self.system)
    }

    /// Manifest used when the stored one is missing or damaged
    fn fallback_manifest(&self) -> StageManifest {
        StageManifest::for_targets(&self.config.targets)
    }

    fn load_manifest(&mut self) -> StageManifest {
        let fallback = self.fallback_manifest();
        StageManifest::load_or(&mut self.fs, &self.config.manifest_path, fallback)
    }

    /// Discard a staging pass that never armed the swap
    async fn abandon_staging(&mut self) -> Result<(), OtaError> {
        warn!("Staging interrupted, discarding incoming files");
        let manifest = self.load_manifest();
        {
            let mut fs = WriteAccess::acquire(&mut self.fs)?;
            discard_incoming(&mut *fs, manifest.iter())?;
            StageManifest::delete(&mut *fs, &self.config.manifest_path)?;
        }
        self.store.write_phase(Phase::Normal).await?;
        Ok(())
    }
}

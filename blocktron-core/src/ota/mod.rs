//! Over-the-air update protocol
//!
//! A reboot-surviving state machine that stages a new build, swaps it into
//! place file by file, gives it a bounded number of boots to confirm itself
//! and restores the previous build if it never does.
//!
//! ```text
//!            check_and_stage               boot: run_swap
//!  Normal ─────────────────▶ SwapPending ─────────────────▶ PendingVerify
//!    ▲      (via Downloading)                                 │      │
//!    │                        confirm                         │      │
//!    ├────────────────────────────────────────────────────────┘      │
//!    │                boot: count_boot reaches limit, run_rollback   │
//!    └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Per managed file `f` the live file is `f`, the incoming candidate is
//! `f.new` and the pre-swap backup is `f.bak`.

mod error;
mod fetch;
mod guard;
mod manifest;
mod paths;
mod phase;
mod rollback;
mod store;
mod swap;
mod updater;
mod verify;

pub use error::OtaError;
pub use fetch::{check_and_stage, discard_incoming, CheckOutcome, Rejection};
pub use guard::WriteAccess;
pub use manifest::{
    ManifestError, StageManifest, MANIFEST_MAGIC, MANIFEST_VERSION, MAX_MANIFEST_SIZE,
};
pub use paths::{backup, incoming, remove_if_present, StagePath, BAK_SUFFIX, NEW_SUFFIX};
pub use phase::Phase;
pub use rollback::{restore_backups, run_rollback, RollbackReport};
pub use store::StateStore;
pub use swap::{promote_staged, run_swap, SwapReport};
pub use updater::{BootAction, Updater};
pub use verify::{confirm, count_boot, BootCount, Confirmation, CONFIRM_MARKER_CONTENT};

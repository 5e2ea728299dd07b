//! BlockTron Hardware Abstraction Layer
//!
//! This crate defines the hardware abstraction traits the update protocol
//! is written against. Chip-specific HALs implement them for a concrete
//! board, and host tests implement them in memory.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  blocktron-core (OTA protocol)          │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  blocktron-hal (this crate - traits)    │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ blocktron-hal-│       │  in-memory    │
//! │    rp2040     │       │  test doubles │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`nvm::NvmStorage`] - Reboot-durable byte storage
//! - [`fs::FileSystem`] - Flat filesystem with mount-mode control
//! - [`http::HttpClient`] - Plain HTTP(S) GET
//! - [`system::SystemControl`] - Device reset

#![no_std]
#![deny(unsafe_code)]

pub mod fs;
pub mod http;
pub mod nvm;
pub mod system;

// Re-export key traits at crate root for convenience
pub use fs::{FileSystem, FsError, MountMode};
pub use http::{HttpClient, HttpError, HttpResponse, HTTP_OK};
pub use nvm::{NvmError, NvmKey, NvmStorage};
pub use system::SystemControl;

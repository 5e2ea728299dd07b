//! RP2040-specific HAL for the BlockTron display firmware
//!
//! This crate provides RP2040 implementations of the shared
//! `blocktron-hal` traits:
//!
//! - Non-volatile update state in a reserved flash partition
//!   (implements `blocktron_hal::NvmStorage`)
//! - System reset (implements `blocktron_hal::SystemControl`)

#![no_std]

pub mod flash;
pub mod system;

// Re-export shared traits from blocktron-hal for convenience
pub use blocktron_hal::{NvmKey, NvmStorage as NvmStorageTrait, SystemControl as SystemControlTrait};
pub use flash::Rp2040Nvm;
pub use system::Rp2040System;

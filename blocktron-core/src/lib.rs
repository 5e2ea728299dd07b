//! Board-agnostic update logic for the BlockTron display firmware
//!
//! This crate contains the over-the-air update protocol, written against
//! the `blocktron-hal` traits so it runs unchanged on hardware and in
//! host tests:
//!
//! - Persistent phase/counter state machine
//! - Stage manifest persistence
//! - Artifact fetching and staging
//! - Boot-time swap and rollback engines
//! - Boot verification gate
//! - OTA configuration types and loader
//!
//! # Boot contract
//!
//! The application calls [`ota::Updater::boot`] before any other
//! initialization, [`ota::Updater::confirm`] once it has established
//! basic operability, and [`ota::Updater::poll`] from its main loop.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod config;
pub mod ota;

#[cfg(test)]
pub(crate) mod testing;

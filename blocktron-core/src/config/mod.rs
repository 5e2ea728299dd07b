//! OTA configuration
//!
//! Types describing what is updated and from where, plus a loader for the
//! TOML subset stored on the device.

pub mod toml;
mod types;

pub use toml::{parse_ota_config, ParseError};
pub use types::*;

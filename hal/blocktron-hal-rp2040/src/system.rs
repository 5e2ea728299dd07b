//! System control for RP2040

use cortex_m::peripheral::SCB;

/// RP2040 system control
#[derive(Debug, Default)]
pub struct Rp2040System;

impl Rp2040System {
    /// Create a new system control handle
    pub fn new() -> Self {
        Self
    }
}

impl blocktron_hal::SystemControl for Rp2040System {
    fn reset(&mut self) {
        SCB::sys_reset()
    }
}

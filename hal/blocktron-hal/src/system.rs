//! System control

/// Device-level control
pub trait SystemControl {
    /// Reset the device
    ///
    /// On hardware this does not return. Host implementations record the
    /// request and return so the caller can observe the state it left
    /// behind.
    fn reset(&mut self);
}

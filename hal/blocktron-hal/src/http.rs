//! HTTP client abstraction
//!
//! Only plain GET is needed. Bodies are written into a caller-provided
//! buffer so the client never has to allocate.

/// HTTP status for a successful GET
pub const HTTP_OK: u16 = 200;

/// Errors from HTTP requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HttpError {
    /// Could not connect (no network, DNS failure, refused)
    Connect,
    /// Request did not complete within the timeout
    Timeout,
    /// Response body does not fit the buffer
    BodyTooLarge,
    /// Malformed response
    Protocol,
}

/// Completed HTTP response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Number of body bytes written to the buffer
    pub len: usize,
}

impl HttpResponse {
    /// Check if the status is 200 OK
    pub fn is_ok(&self) -> bool {
        self.status == HTTP_OK
    }
}

/// HTTP client trait
pub trait HttpClient {
    /// Perform a GET request
    ///
    /// # Arguments
    /// * `url` - Absolute URL to fetch
    /// * `timeout_ms` - Network timeout for the whole request
    /// * `body` - Buffer that receives the response body
    fn get(
        &mut self,
        url: &str,
        timeout_ms: u32,
        body: &mut [u8],
    ) -> impl core::future::Future<Output = Result<HttpResponse, HttpError>>;
}

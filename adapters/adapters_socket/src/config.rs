//! Socket Configuration
//!
//! Option bundles applied when a socket or waitset is constructed.

/// Socket configuration
///
/// Applied in field order by [`Socket::with_config`](crate::Socket::with_config).
/// `None` buffer sizes leave the platform default in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketConfig {
    /// Put the socket in non-blocking mode
    pub nonblocking: bool,
    /// Set `SO_REUSEADDR`
    pub reuse_address: bool,
    /// Set `SO_BROADCAST`
    pub broadcast: bool,
    /// Requested `SO_SNDBUF`
    pub send_buffer_size: Option<usize>,
    /// Requested `SO_RCVBUF`
    pub recv_buffer_size: Option<usize>,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            nonblocking: false,
            reuse_address: false,
            broadcast: false,
            send_buffer_size: None,
            recv_buffer_size: None,
        }
    }
}

/// Waitset configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitsetConfig {
    /// Number of entry slots added each time the waitset fills up
    pub growth: usize,
}

impl Default for WaitsetConfig {
    fn default() -> Self {
        Self { growth: 8 }
    }
}

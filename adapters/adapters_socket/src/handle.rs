//! Socket Handle Module
//!
//! Opaque, platform-width socket identifier. On Unix it wraps a file
//! descriptor; on Windows a `SOCKET`, which is not a small integer.

#[cfg(unix)]
use std::os::unix::io::{AsRawFd, RawFd};
#[cfg(windows)]
use std::os::windows::io::{AsRawSocket, RawSocket};

/// Native representation of a socket handle
#[cfg(unix)]
pub type RawHandle = RawFd;

/// Native representation of a socket handle
#[cfg(windows)]
pub type RawHandle = RawSocket;

/// Socket handle
///
/// Callers pass handles by value and never inspect them. A handle is either
/// valid (returned by a successful create) or [`SocketHandle::INVALID`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SocketHandle(RawHandle);

impl SocketHandle {
    /// The invalid sentinel
    #[cfg(unix)]
    pub const INVALID: SocketHandle = SocketHandle(-1);

    /// The invalid sentinel (`INVALID_SOCKET`)
    #[cfg(windows)]
    pub const INVALID: SocketHandle = SocketHandle(!0);

    /// Wrap a native handle
    pub const fn from_raw(raw: RawHandle) -> Self {
        Self(raw)
    }

    /// Get the native handle
    pub const fn as_raw(self) -> RawHandle {
        self.0
    }

    /// Handle of anything that owns a native socket or descriptor
    #[cfg(unix)]
    pub fn of<T: AsRawFd>(owner: &T) -> Self {
        Self(owner.as_raw_fd())
    }

    /// Handle of anything that owns a native socket
    #[cfg(windows)]
    pub fn of<T: AsRawSocket>(owner: &T) -> Self {
        Self(owner.as_raw_socket())
    }

    /// Whether this is not the invalid sentinel
    pub fn is_valid(self) -> bool {
        #[cfg(unix)]
        {
            self.0 >= 0
        }
        #[cfg(windows)]
        {
            self != Self::INVALID
        }
    }
}

impl Default for SocketHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

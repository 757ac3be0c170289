//! Socket Error Taxonomy
//!
//! Every fallible operation in the socket layer reports one of five outcomes
//! besides success. `Busy` and `WouldBlock` are transient and meant for the
//! immediate caller's retry decision; `Fail` carries the host error code
//! untouched.

use std::fmt;
use std::io;

/// Socket error types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketError {
    /// Bad argument, handle or state (a precondition violation)
    Invalid,
    /// A blocking operation is in progress; retry later
    Busy,
    /// Non-blocking operation has no data or room yet
    WouldBlock,
    /// No platform support compiled in for the requested facility
    Unavailable,
    /// Platform error, carrying the host error code (0 if none was reported)
    Fail(i32),
}

/// Result type used throughout the socket layer
pub type SockResult<T> = Result<T, SocketError>;

impl SocketError {
    /// Capture the calling thread's last OS error
    pub fn last_os_error() -> Self {
        SocketError::from(io::Error::last_os_error())
    }

    /// Whether the caller may simply retry the operation
    pub fn is_transient(&self) -> bool {
        matches!(self, SocketError::Busy | SocketError::WouldBlock)
    }

    /// Host error code for `Fail`, `None` otherwise
    pub fn os_error(&self) -> Option<i32> {
        match self {
            SocketError::Fail(code) => Some(*code),
            _ => None,
        }
    }
}

#[cfg(unix)]
fn is_invalid_errno(code: i32) -> bool {
    matches!(
        code,
        libc::EBADF | libc::ENOTSOCK | libc::EINVAL | libc::ENOPROTOOPT
    )
}

#[cfg(windows)]
fn is_invalid_errno(code: i32) -> bool {
    use windows_sys::Win32::Networking::WinSock::{
        WSAEBADF, WSAEINVAL, WSAENOPROTOOPT, WSAENOTSOCK,
    };
    [WSAEBADF, WSAENOTSOCK, WSAEINVAL, WSAENOPROTOOPT]
        .iter()
        .any(|&err| err as i32 == code)
}

impl From<io::Error> for SocketError {
    fn from(err: io::Error) -> Self {
        use std::io::ErrorKind;
        if err.kind() == ErrorKind::WouldBlock {
            return SocketError::WouldBlock;
        }
        match err.raw_os_error() {
            Some(code) if is_invalid_errno(code) => SocketError::Invalid,
            Some(code) => SocketError::Fail(code),
            None if err.kind() == ErrorKind::InvalidInput => SocketError::Invalid,
            None => SocketError::Fail(0),
        }
    }
}

impl From<SocketError> for io::Error {
    fn from(err: SocketError) -> Self {
        match err {
            SocketError::Fail(code) if code != 0 => io::Error::from_raw_os_error(code),
            SocketError::WouldBlock => io::Error::from(io::ErrorKind::WouldBlock),
            SocketError::Invalid => io::Error::from(io::ErrorKind::InvalidInput),
            SocketError::Unavailable => io::Error::from(io::ErrorKind::Unsupported),
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}

impl fmt::Display for SocketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketError::Invalid => write!(f, "invalid argument, handle or state"),
            SocketError::Busy => write!(f, "operation in progress"),
            SocketError::WouldBlock => write!(f, "operation would block"),
            SocketError::Unavailable => write!(f, "facility not available on this platform"),
            SocketError::Fail(code) => {
                write!(f, "platform error {}: {}", code, io::Error::from_raw_os_error(*code))
            }
        }
    }
}

impl std::error::Error for SocketError {}

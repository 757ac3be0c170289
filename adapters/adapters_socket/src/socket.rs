//! Socket Module
//!
//! Socket lifecycle: creation, binding, datagram transfer, blocking-mode
//! control and destruction. Operations are thin shims over the platform
//! socket calls, made through the `socket2` crate.
//!
//! A socket moves through `Created → Bound → Configured → Destroyed`.
//! Destruction is idempotent; every other operation on a destroyed socket
//! fails with [`SocketError::Invalid`].

use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use entities_socket_common::{AddressFamily, Capabilities, SockAddress, SockResult, SocketError};
use log::debug;
use socket2::{Domain, Socket as Socket2, Type};

#[cfg(unix)]
use std::os::unix::io::AsRawFd;
#[cfg(windows)]
use std::os::windows::io::AsRawSocket;

use crate::config::SocketConfig;
use crate::handle::SocketHandle;

/// Socket type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketType {
    /// Stream socket (TCP)
    Stream,
    /// Datagram socket (UDP)
    Datagram,
}

impl From<SocketType> for Type {
    fn from(ty: SocketType) -> Self {
        match ty {
            SocketType::Stream => Type::STREAM,
            SocketType::Datagram => Type::DGRAM,
        }
    }
}

/// Socket wrapper
///
/// Owns the underlying OS socket exclusively. Dropping a `Socket` destroys it.
pub struct Socket {
    inner: Option<Socket2>,
    family: AddressFamily,
    socket_type: SocketType,
    nonblocking: AtomicBool,
    // Blocking send/receive calls currently parked in the kernel.
    blocking_calls: AtomicUsize,
}

/// Counts a potentially blocking call for the duration of the call.
struct BlockingCall<'a> {
    counter: Option<&'a AtomicUsize>,
}

impl Drop for BlockingCall<'_> {
    fn drop(&mut self) {
        if let Some(counter) = self.counter {
            counter.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

impl Socket {
    /// Create a new socket
    ///
    /// # Arguments
    ///
    /// * `family` - Address family (IPv4 or IPv6)
    /// * `socket_type` - Socket type (Stream or Datagram)
    ///
    /// # Returns
    ///
    /// * `Ok(Socket)` - Created socket, in blocking mode
    /// * `Err(SocketError::Unavailable)` - IPv6 requested without IPv6 support
    /// * `Err(SocketError)` - Platform error creating the socket
    pub fn create(family: AddressFamily, socket_type: SocketType) -> SockResult<Self> {
        Self::create_with(family, socket_type, &Capabilities::CURRENT)
    }

    /// [`Socket::create`] against an explicit capability set
    pub fn create_with(
        family: AddressFamily,
        socket_type: SocketType,
        caps: &Capabilities,
    ) -> SockResult<Self> {
        if family == AddressFamily::Ipv6 && !caps.ipv6 {
            return Err(SocketError::Unavailable);
        }
        let domain: Domain = family.into();
        let socket = Socket2::new(domain, socket_type.into(), None)?;
        let socket = Self {
            inner: Some(socket),
            family,
            socket_type,
            nonblocking: AtomicBool::new(false),
            blocking_calls: AtomicUsize::new(0),
        };
        debug!("created {:?} {:?} socket {:?}", family, socket_type, socket.handle());
        Ok(socket)
    }

    /// Create a socket and apply `config` to it
    ///
    /// The socket is destroyed again if any option cannot be applied.
    pub fn with_config(
        family: AddressFamily,
        socket_type: SocketType,
        config: &SocketConfig,
    ) -> SockResult<Self> {
        let socket = Self::create(family, socket_type)?;
        if config.reuse_address {
            socket.set_reuse_address(true)?;
        }
        if config.broadcast {
            socket.set_broadcast(true)?;
        }
        if let Some(size) = config.send_buffer_size {
            socket.set_send_buffer_size(size)?;
        }
        if let Some(size) = config.recv_buffer_size {
            socket.set_recv_buffer_size(size)?;
        }
        if config.nonblocking {
            socket.set_nonblocking(true)?;
        }
        Ok(socket)
    }

    pub(crate) fn inner(&self) -> SockResult<&Socket2> {
        self.inner.as_ref().ok_or(SocketError::Invalid)
    }

    fn check_family(&self, addr: &SockAddress) -> SockResult<()> {
        if addr.family() == Some(self.family) {
            Ok(())
        } else {
            Err(SocketError::Invalid)
        }
    }

    fn blocking_call(&self) -> BlockingCall<'_> {
        if self.nonblocking.load(Ordering::Acquire) {
            BlockingCall { counter: None }
        } else {
            self.blocking_calls.fetch_add(1, Ordering::AcqRel);
            BlockingCall {
                counter: Some(&self.blocking_calls),
            }
        }
    }

    /// Bind socket to an address
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Success
    /// * `Err(SocketError::Invalid)` - Destroyed socket, already bound, or an
    ///   address whose family differs from the socket's
    /// * `Err(SocketError::Fail)` - Platform error, e.g. address in use
    pub fn bind(&self, addr: &SockAddress) -> SockResult<()> {
        let inner = self.inner()?;
        self.check_family(addr)?;
        inner.bind(&addr.to_sockaddr()?)?;
        Ok(())
    }

    /// Get the address actually bound, including an OS-assigned port
    pub fn get_bound_address(&self) -> SockResult<SockAddress> {
        let addr = self.inner()?.local_addr()?;
        Ok(SockAddress::from_sockaddr(&addr))
    }

    /// Send a datagram to `dest`
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of bytes sent, possibly fewer than `buf.len()`
    /// * `Err(SocketError::WouldBlock)` - Non-blocking socket has no room yet
    /// * `Err(SocketError)` - Other error sending
    pub fn send_to(&self, buf: &[u8], dest: &SockAddress) -> SockResult<usize> {
        let inner = self.inner()?;
        self.check_family(dest)?;
        let dest = dest.to_sockaddr()?;
        let _call = self.blocking_call();
        Ok(inner.send_to(buf, &dest)?)
    }

    /// Receive a datagram
    ///
    /// A datagram larger than `buf` is truncated and the copied length is
    /// reported.
    ///
    /// # Returns
    ///
    /// * `Ok((usize, SockAddress))` - Number of bytes received and sender address
    /// * `Err(SocketError::WouldBlock)` - Non-blocking socket has no data yet
    /// * `Err(SocketError)` - Other error receiving
    pub fn recv_from(&self, buf: &mut [u8]) -> SockResult<(usize, SockAddress)> {
        let inner = self.inner()?;

        // SAFETY: an initialized `u8` is a valid `MaybeUninit<u8>`, and
        // `recv_from` only ever writes initialized bytes into the slice.
        let uninit_buf: &mut [MaybeUninit<u8>] = unsafe {
            std::slice::from_raw_parts_mut(buf.as_mut_ptr() as *mut MaybeUninit<u8>, buf.len())
        };

        let _call = self.blocking_call();
        let (n, from) = inner.recv_from(uninit_buf)?;
        Ok((n, SockAddress::from_sockaddr(&from)))
    }

    /// Switch between blocking and non-blocking I/O
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The mode was set
    /// * `Err(SocketError::Busy)` - A blocking send or receive through this
    ///   socket is in progress; retry later
    /// * `Err(SocketError::Invalid)` - The socket was destroyed
    /// * `Err(SocketError::Fail)` - Platform error
    pub fn set_nonblocking(&self, enabled: bool) -> SockResult<()> {
        let inner = self.inner()?;
        if self.blocking_calls.load(Ordering::Acquire) > 0 {
            return Err(SocketError::Busy);
        }
        inner.set_nonblocking(enabled)?;
        self.nonblocking.store(enabled, Ordering::Release);
        Ok(())
    }

    /// Whether the socket is in non-blocking mode
    pub fn is_nonblocking(&self) -> bool {
        self.nonblocking.load(Ordering::Acquire)
    }

    /// Release the OS socket
    ///
    /// Calling this again after the first time is a no-op returning `Ok`.
    pub fn destroy(&mut self) -> SockResult<()> {
        if let Some(socket) = self.inner.take() {
            debug!("destroying socket {:?}", Self::raw_handle(&socket));
            drop(socket);
        }
        Ok(())
    }

    /// Whether the socket has been destroyed
    pub fn is_destroyed(&self) -> bool {
        self.inner.is_none()
    }

    #[cfg(unix)]
    fn raw_handle(socket: &Socket2) -> SocketHandle {
        SocketHandle::from_raw(socket.as_raw_fd())
    }

    #[cfg(windows)]
    fn raw_handle(socket: &Socket2) -> SocketHandle {
        SocketHandle::from_raw(socket.as_raw_socket())
    }

    /// Get the handle, or [`SocketHandle::INVALID`] once destroyed
    pub fn handle(&self) -> SocketHandle {
        self.inner
            .as_ref()
            .map_or(SocketHandle::INVALID, Self::raw_handle)
    }

    /// Get the address family
    pub fn family(&self) -> AddressFamily {
        self.family
    }

    /// Get the socket type
    pub fn socket_type(&self) -> SocketType {
        self.socket_type
    }
}

impl std::fmt::Debug for Socket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Socket")
            .field("handle", &self.handle())
            .field("family", &self.family)
            .field("socket_type", &self.socket_type)
            .field("nonblocking", &self.is_nonblocking())
            .finish()
    }
}

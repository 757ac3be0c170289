//! Socket Options Module
//!
//! Pass-through access to the platform option namespace, named helpers for the
//! common `SOL_SOCKET` options, and multicast group membership.
//!
//! `level`/`name` pairs are handed to the platform verbatim; this layer adds
//! no option semantics of its own.

use std::net::{Ipv4Addr, Ipv6Addr};

use entities_socket_common::{Capabilities, SockResult, SocketError};

use crate::socket::Socket;

/// Commonly used socket-level options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketOption {
    /// `SO_REUSEADDR`
    ReuseAddress,
    /// `SO_DONTROUTE`
    DontRoute,
    /// `SO_BROADCAST`
    Broadcast,
    /// `SO_SNDBUF`
    SendBufferSize,
    /// `SO_RCVBUF`
    ReceiveBufferSize,
}

impl SocketOption {
    /// The platform `(level, name)` pair
    #[cfg(unix)]
    pub fn level_and_name(self) -> (i32, i32) {
        let name = match self {
            SocketOption::ReuseAddress => libc::SO_REUSEADDR,
            SocketOption::DontRoute => libc::SO_DONTROUTE,
            SocketOption::Broadcast => libc::SO_BROADCAST,
            SocketOption::SendBufferSize => libc::SO_SNDBUF,
            SocketOption::ReceiveBufferSize => libc::SO_RCVBUF,
        };
        (libc::SOL_SOCKET, name)
    }

    /// The platform `(level, name)` pair
    #[cfg(windows)]
    pub fn level_and_name(self) -> (i32, i32) {
        use windows_sys::Win32::Networking::WinSock;
        let name = match self {
            SocketOption::ReuseAddress => WinSock::SO_REUSEADDR,
            SocketOption::DontRoute => WinSock::SO_DONTROUTE,
            SocketOption::Broadcast => WinSock::SO_BROADCAST,
            SocketOption::SendBufferSize => WinSock::SO_SNDBUF,
            SocketOption::ReceiveBufferSize => WinSock::SO_RCVBUF,
        };
        (WinSock::SOL_SOCKET as i32, name as i32)
    }
}

#[cfg(unix)]
mod raw {
    use std::os::unix::io::AsRawFd;

    use entities_socket_common::{SockResult, SocketError};
    use socket2::Socket as Socket2;

    pub fn get(socket: &Socket2, level: i32, name: i32, buf: &mut [u8]) -> SockResult<usize> {
        let mut len = buf.len() as libc::socklen_t;
        // SAFETY: `buf` is valid for `len` bytes and the kernel writes at most `len`.
        let ret = unsafe {
            libc::getsockopt(
                socket.as_raw_fd(),
                level,
                name,
                buf.as_mut_ptr() as *mut libc::c_void,
                &mut len,
            )
        };
        if ret == 0 {
            Ok(len as usize)
        } else {
            Err(SocketError::last_os_error())
        }
    }

    pub fn set(socket: &Socket2, level: i32, name: i32, value: &[u8]) -> SockResult<()> {
        // SAFETY: `value` is valid for reads of its whole length.
        let ret = unsafe {
            libc::setsockopt(
                socket.as_raw_fd(),
                level,
                name,
                value.as_ptr() as *const libc::c_void,
                value.len() as libc::socklen_t,
            )
        };
        if ret == 0 {
            Ok(())
        } else {
            Err(SocketError::last_os_error())
        }
    }
}

#[cfg(windows)]
mod raw {
    use std::os::windows::io::AsRawSocket;

    use entities_socket_common::{SockResult, SocketError};
    use socket2::Socket as Socket2;
    use windows_sys::Win32::Networking::WinSock;

    fn last_error() -> SocketError {
        // SAFETY: reads the calling thread's Winsock error state.
        let code = unsafe { WinSock::WSAGetLastError() };
        SocketError::from(std::io::Error::from_raw_os_error(code))
    }

    pub fn get(socket: &Socket2, level: i32, name: i32, buf: &mut [u8]) -> SockResult<usize> {
        let mut len = buf.len() as i32;
        // SAFETY: `buf` is valid for `len` bytes and Winsock writes at most `len`.
        let ret = unsafe {
            WinSock::getsockopt(
                socket.as_raw_socket() as WinSock::SOCKET,
                level,
                name,
                buf.as_mut_ptr(),
                &mut len,
            )
        };
        if ret == 0 {
            Ok(len as usize)
        } else {
            Err(last_error())
        }
    }

    pub fn set(socket: &Socket2, level: i32, name: i32, value: &[u8]) -> SockResult<()> {
        // SAFETY: `value` is valid for its length.
        let ret = unsafe {
            WinSock::setsockopt(
                socket.as_raw_socket() as WinSock::SOCKET,
                level,
                name,
                value.as_ptr(),
                value.len() as i32,
            )
        };
        if ret == 0 {
            Ok(())
        } else {
            Err(last_error())
        }
    }
}

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "macos",
    target_os = "ios",
    windows
))]
mod ssm {
    use std::net::Ipv4Addr;

    use entities_socket_common::SockResult;
    use socket2::Socket as Socket2;

    pub fn join(s: &Socket2, source: &Ipv4Addr, group: &Ipv4Addr, iface: &Ipv4Addr) -> SockResult<()> {
        Ok(s.join_ssm_v4(source, group, iface)?)
    }

    pub fn leave(s: &Socket2, source: &Ipv4Addr, group: &Ipv4Addr, iface: &Ipv4Addr) -> SockResult<()> {
        Ok(s.leave_ssm_v4(source, group, iface)?)
    }
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "macos",
    target_os = "ios",
    windows
)))]
mod ssm {
    use std::net::Ipv4Addr;

    use entities_socket_common::{SockResult, SocketError};
    use socket2::Socket as Socket2;

    pub fn join(_: &Socket2, _: &Ipv4Addr, _: &Ipv4Addr, _: &Ipv4Addr) -> SockResult<()> {
        Err(SocketError::Unavailable)
    }

    pub fn leave(_: &Socket2, _: &Ipv4Addr, _: &Ipv4Addr, _: &Ipv4Addr) -> SockResult<()> {
        Err(SocketError::Unavailable)
    }
}

impl Socket {
    /// Read a raw option value into `buf`
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of bytes the platform wrote into `buf`
    /// * `Err(SocketError::Invalid)` - Unknown option or destroyed socket
    /// * `Err(SocketError)` - Other platform error
    pub fn get_option(&self, level: i32, name: i32, buf: &mut [u8]) -> SockResult<usize> {
        raw::get(self.inner()?, level, name, buf)
    }

    /// Set a raw option value
    pub fn set_option(&self, level: i32, name: i32, value: &[u8]) -> SockResult<()> {
        raw::set(self.inner()?, level, name, value)
    }

    /// Read an integer-valued option
    pub fn get_option_int(&self, level: i32, name: i32) -> SockResult<i32> {
        let mut buf = [0u8; std::mem::size_of::<i32>()];
        let n = self.get_option(level, name, &mut buf)?;
        if n != buf.len() {
            return Err(SocketError::Invalid);
        }
        Ok(i32::from_ne_bytes(buf))
    }

    /// Set an integer-valued option
    pub fn set_option_int(&self, level: i32, name: i32, value: i32) -> SockResult<()> {
        self.set_option(level, name, &value.to_ne_bytes())
    }

    /// Read one of the named socket-level options
    pub fn get_named_option(&self, option: SocketOption) -> SockResult<i32> {
        let (level, name) = option.level_and_name();
        self.get_option_int(level, name)
    }

    /// Set one of the named socket-level options
    pub fn set_named_option(&self, option: SocketOption, value: i32) -> SockResult<()> {
        let (level, name) = option.level_and_name();
        self.set_option_int(level, name, value)
    }

    /// Set `SO_REUSEADDR`
    pub fn set_reuse_address(&self, reuse: bool) -> SockResult<()> {
        Ok(self.inner()?.set_reuse_address(reuse)?)
    }

    /// Get `SO_REUSEADDR`
    pub fn reuse_address(&self) -> SockResult<bool> {
        Ok(self.inner()?.reuse_address()?)
    }

    /// Set `SO_BROADCAST`
    pub fn set_broadcast(&self, broadcast: bool) -> SockResult<()> {
        Ok(self.inner()?.set_broadcast(broadcast)?)
    }

    /// Get `SO_BROADCAST`
    pub fn broadcast(&self) -> SockResult<bool> {
        Ok(self.inner()?.broadcast()?)
    }

    /// Set `SO_SNDBUF`
    pub fn set_send_buffer_size(&self, size: usize) -> SockResult<()> {
        Ok(self.inner()?.set_send_buffer_size(size)?)
    }

    /// Get `SO_SNDBUF`
    pub fn send_buffer_size(&self) -> SockResult<usize> {
        Ok(self.inner()?.send_buffer_size()?)
    }

    /// Set `SO_RCVBUF`
    pub fn set_recv_buffer_size(&self, size: usize) -> SockResult<()> {
        Ok(self.inner()?.set_recv_buffer_size(size)?)
    }

    /// Get `SO_RCVBUF`
    pub fn recv_buffer_size(&self) -> SockResult<usize> {
        Ok(self.inner()?.recv_buffer_size()?)
    }

    /// Join an IPv4 any-source multicast group on the interface with address `interface`
    pub fn join_multicast_v4(&self, group: &Ipv4Addr, interface: &Ipv4Addr) -> SockResult<()> {
        Ok(self.inner()?.join_multicast_v4(group, interface)?)
    }

    /// Leave an IPv4 any-source multicast group
    pub fn leave_multicast_v4(&self, group: &Ipv4Addr, interface: &Ipv4Addr) -> SockResult<()> {
        Ok(self.inner()?.leave_multicast_v4(group, interface)?)
    }

    /// Join an IPv6 multicast group on the interface with index `interface`
    pub fn join_multicast_v6(&self, group: &Ipv6Addr, interface: u32) -> SockResult<()> {
        Ok(self.inner()?.join_multicast_v6(group, interface)?)
    }

    /// Leave an IPv6 multicast group
    pub fn leave_multicast_v6(&self, group: &Ipv6Addr, interface: u32) -> SockResult<()> {
        Ok(self.inner()?.leave_multicast_v6(group, interface)?)
    }

    /// Join an IPv4 multicast group restricted to one sender
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Joined
    /// * `Err(SocketError::Unavailable)` - No source-specific multicast support
    /// * `Err(SocketError)` - Platform error
    pub fn join_source_multicast_v4(
        &self,
        source: &Ipv4Addr,
        group: &Ipv4Addr,
        interface: &Ipv4Addr,
    ) -> SockResult<()> {
        let inner = self.inner()?;
        if !Capabilities::CURRENT.source_specific_multicast {
            return Err(SocketError::Unavailable);
        }
        ssm::join(inner, source, group, interface)
    }

    /// Leave a source-specific IPv4 multicast group
    pub fn leave_source_multicast_v4(
        &self,
        source: &Ipv4Addr,
        group: &Ipv4Addr,
        interface: &Ipv4Addr,
    ) -> SockResult<()> {
        let inner = self.inner()?;
        if !Capabilities::CURRENT.source_specific_multicast {
            return Err(SocketError::Unavailable);
        }
        ssm::leave(inner, source, group, interface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::SocketType;
    use entities_socket_common::AddressFamily;

    fn udp() -> Socket {
        Socket::create(AddressFamily::Ipv4, SocketType::Datagram).unwrap()
    }

    #[test]
    fn test_reuse_address() {
        let socket = udp();
        socket.set_reuse_address(true).unwrap();
        assert_eq!(socket.reuse_address(), Ok(true));
        socket.set_reuse_address(false).unwrap();
        assert_eq!(socket.reuse_address(), Ok(false));
    }

    #[test]
    fn test_broadcast() {
        let socket = udp();
        socket.set_broadcast(true).unwrap();
        assert_eq!(socket.broadcast(), Ok(true));
    }

    #[test]
    fn test_buffer_sizes() {
        let socket = udp();
        socket.set_send_buffer_size(32 * 1024).unwrap();
        socket.set_recv_buffer_size(32 * 1024).unwrap();
        assert!(socket.send_buffer_size().unwrap() >= 32 * 1024);
        assert!(socket.recv_buffer_size().unwrap() >= 32 * 1024);
    }

    #[test]
    fn test_raw_option_pass_through() {
        let socket = udp();
        let (level, name) = SocketOption::ReuseAddress.level_and_name();
        socket.set_option_int(level, name, 1).unwrap();
        assert_ne!(socket.get_option_int(level, name), Ok(0));
        assert_ne!(socket.get_named_option(SocketOption::ReuseAddress), Ok(0));

        socket.set_named_option(SocketOption::Broadcast, 1).unwrap();
        assert_eq!(socket.broadcast(), Ok(true));
    }

    #[test]
    fn test_unknown_option_is_invalid() {
        let socket = udp();
        let (level, _) = SocketOption::ReuseAddress.level_and_name();
        let mut buf = [0u8; 4];
        assert_eq!(
            socket.get_option(level, 0x7fff, &mut buf),
            Err(SocketError::Invalid)
        );
        assert_eq!(
            socket.set_option_int(level, 0x7fff, 1),
            Err(SocketError::Invalid)
        );
    }

    #[test]
    fn test_options_on_destroyed_socket() {
        let mut socket = udp();
        socket.destroy().unwrap();
        assert_eq!(socket.set_reuse_address(true), Err(SocketError::Invalid));
        assert_eq!(socket.get_option_int(0, 0), Err(SocketError::Invalid));
        assert_eq!(
            socket.join_source_multicast_v4(
                &Ipv4Addr::LOCALHOST,
                &Ipv4Addr::new(232, 1, 1, 1),
                &Ipv4Addr::UNSPECIFIED
            ),
            Err(SocketError::Invalid)
        );
    }
}

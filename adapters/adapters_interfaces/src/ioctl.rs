//! Interface Index by ioctl
//!
//! Looks up interface indices one name at a time with `SIOCGIFINDEX` on a
//! throwaway datagram socket.

use std::collections::HashMap;
use std::os::unix::io::AsRawFd;

use entities_socket_common::{SockResult, SocketError};
use socket2::{Domain, Socket, Type};

use crate::enumerator::InterfaceEnumerator;
use crate::ifaddrs;
use crate::interface::InterfaceAddress;

/// `struct ifreq` as used by `SIOCGIFINDEX`
#[repr(C)]
struct IfIndexRequest {
    name: [libc::c_char; libc::IFNAMSIZ],
    index: libc::c_int,
    _pad: [u8; 20],
}

/// Query the index of the interface called `name` through `socket`
pub fn interface_index(socket: &Socket, name: &str) -> SockResult<u32> {
    // Alias labels such as `eth0:1` resolve to their device.
    let device = name.split(':').next().unwrap_or(name);
    if device.is_empty() || device.len() >= libc::IFNAMSIZ || device.contains('\0') {
        return Err(SocketError::Invalid);
    }

    let mut req = IfIndexRequest {
        name: [0; libc::IFNAMSIZ],
        index: 0,
        _pad: [0; 20],
    };
    for (dst, src) in req.name.iter_mut().zip(device.bytes()) {
        *dst = src as libc::c_char;
    }

    // SAFETY: `req` is a properly sized, NUL-terminated `ifreq`.
    let ret = unsafe {
        libc::ioctl(
            socket.as_raw_fd(),
            libc::SIOCGIFINDEX as _,
            &mut req as *mut IfIndexRequest,
        )
    };
    if ret < 0 {
        return Err(SocketError::last_os_error());
    }
    Ok(req.index as u32)
}

/// Enumerates interfaces, resolving each index with `SIOCGIFINDEX`
#[derive(Debug, Default)]
pub struct IoctlEnumerator;

impl IoctlEnumerator {
    /// Create the enumerator
    pub fn new() -> Self {
        Self
    }
}

impl InterfaceEnumerator for IoctlEnumerator {
    fn name(&self) -> &'static str {
        "ioctl"
    }

    fn query(&self) -> SockResult<Vec<InterfaceAddress>> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, None)?;
        let mut cache: HashMap<String, u32> = HashMap::new();
        ifaddrs::walk(|name| {
            if let Some(index) = cache.get(name) {
                return Ok(*index);
            }
            let index = interface_index(&socket, name)?;
            cache.insert(name.to_string(), index);
            Ok(index)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control_socket() -> Socket {
        Socket::new(Domain::IPV4, Type::DGRAM, None).unwrap()
    }

    #[test]
    fn test_loopback_index() {
        let index = interface_index(&control_socket(), "lo").unwrap();
        assert!(index > 0);
        assert_eq!(interface_index(&control_socket(), "lo:0"), Ok(index));
    }

    #[test]
    fn test_unknown_interface() {
        let result = interface_index(&control_socket(), "nosuchif0");
        assert!(matches!(result, Err(SocketError::Fail(libc::ENODEV))));
    }

    #[test]
    fn test_bad_names() {
        assert_eq!(interface_index(&control_socket(), ""), Err(SocketError::Invalid));
        assert_eq!(
            interface_index(&control_socket(), "a-name-far-too-long-for-ifreq"),
            Err(SocketError::Invalid)
        );
    }

    #[test]
    fn test_query_indexes_every_entry() {
        let entries = IoctlEnumerator::new().query().unwrap();
        assert!(entries.iter().all(|e| e.index > 0));
    }
}

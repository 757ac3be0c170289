//! Interface Address Walk
//!
//! Reads the platform interface address table with `getifaddrs` and converts
//! each entry into an [`InterfaceAddress`]. The index of each entry comes
//! from a caller-supplied lookup, which is where the enumeration strategies
//! differ.

use std::net::{SocketAddrV4, SocketAddrV6};

use entities_socket_common::{SockAddress, SockResult, SocketError};
use log::trace;
use nix::sys::socket::{SockaddrLike, SockaddrStorage};

use crate::interface::{InterfaceAddress, InterfaceFlags};

fn convert(storage: &SockaddrStorage) -> SockAddress {
    if let Some(sin) = storage.as_sockaddr_in() {
        SockAddress::V4(SocketAddrV4::from(*sin))
    } else if let Some(sin6) = storage.as_sockaddr_in6() {
        SockAddress::V6(SocketAddrV6::from(*sin6))
    } else {
        SockAddress::Unknown {
            family: storage.family().map_or(libc::AF_UNSPEC, |af| af as i32),
        }
    }
}

/// Walk the interface address table
///
/// Entries without an address are skipped. `index_of` is called with the
/// interface name of every remaining entry; its first error aborts the walk
/// and nothing is returned.
pub(crate) fn walk<F>(mut index_of: F) -> SockResult<Vec<InterfaceAddress>>
where
    F: FnMut(&str) -> SockResult<u32>,
{
    let table = nix::ifaddrs::getifaddrs().map_err(|errno| SocketError::Fail(errno as i32))?;

    let mut entries = Vec::new();
    for ifa in table {
        let address = match ifa.address.as_ref() {
            Some(storage) => convert(storage),
            None => {
                trace!("skipping {}: no address", ifa.interface_name);
                continue;
            }
        };
        let index = index_of(&ifa.interface_name)?;
        trace!("interface {} index {} address {}", ifa.interface_name, index, address);
        entries.push(InterfaceAddress {
            index,
            flags: InterfaceFlags::from_bits(ifa.flags.bits() as u32),
            address,
            netmask: ifa.netmask.as_ref().map(convert),
            broadcast: ifa.broadcast.as_ref().map(convert),
            name: ifa.interface_name,
        });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::NO_INDEX;

    #[test]
    fn test_walk_finds_loopback() {
        let entries = walk(|_| Ok(NO_INDEX)).unwrap();
        assert!(entries
            .iter()
            .any(|e| e.is_loopback() && e.address.is_loopback()));
    }

    #[test]
    fn test_walk_aborts_on_lookup_error() {
        let result = walk(|_| Err(SocketError::Fail(libc::ENODEV)));
        assert_eq!(result, Err(SocketError::Fail(libc::ENODEV)));
    }

    #[test]
    fn test_walk_entries_have_names() {
        let mut seen = Vec::new();
        let entries = walk(|name| {
            seen.push(name.to_string());
            Ok(7)
        })
        .unwrap();
        assert_eq!(entries.len(), seen.len());
        for (entry, name) in entries.iter().zip(&seen) {
            assert_eq!(&entry.name, name);
            assert_eq!(entry.index, 7);
        }
    }
}

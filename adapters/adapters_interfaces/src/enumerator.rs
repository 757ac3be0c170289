//! Interface Enumeration
//!
//! One [`InterfaceEnumerator`] strategy is selected from the capability
//! matrix the first time it is needed and used for the rest of the process:
//!
//! 1. `ioctl`: `getifaddrs` plus `SIOCGIFINDEX` per interface
//! 2. `netlink`: `getifaddrs` plus one `RTM_GETLINK` dump
//! 3. `portable`: `getifaddrs` alone, every index is [`NO_INDEX`]
//!
//! Platforms with none of these report [`SocketError::Unavailable`].

use entities_socket_common::{Capabilities, SockResult, SocketError};
use log::debug;

use crate::interface::{InterfaceAddress, InterfaceList};
#[cfg(unix)]
use crate::interface::NO_INDEX;

/// Source of the raw interface address table
#[cfg_attr(test, mockall::automock)]
pub trait InterfaceEnumerator {
    /// Short strategy name for diagnostics
    fn name(&self) -> &'static str;

    /// Every interface address the platform reports, unfiltered
    fn query(&self) -> SockResult<Vec<InterfaceAddress>>;
}

/// Boxed strategy as stored for the process
pub type BoxedEnumerator = Box<dyn InterfaceEnumerator + Send + Sync>;

/// Enumerates interfaces without index lookup
#[cfg(unix)]
#[derive(Debug, Default)]
pub struct PortableEnumerator;

#[cfg(unix)]
impl InterfaceEnumerator for PortableEnumerator {
    fn name(&self) -> &'static str {
        "portable"
    }

    fn query(&self) -> SockResult<Vec<InterfaceAddress>> {
        crate::ifaddrs::walk(|_| Ok(NO_INDEX))
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn ioctl_strategy() -> Option<BoxedEnumerator> {
    Some(Box::new(crate::ioctl::IoctlEnumerator::new()))
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn ioctl_strategy() -> Option<BoxedEnumerator> {
    None
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn netlink_strategy() -> Option<BoxedEnumerator> {
    Some(Box::new(crate::netlink::NetlinkEnumerator::new()))
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn netlink_strategy() -> Option<BoxedEnumerator> {
    None
}

#[cfg(unix)]
fn portable_strategy() -> Option<BoxedEnumerator> {
    Some(Box::new(PortableEnumerator))
}

#[cfg(not(unix))]
fn portable_strategy() -> Option<BoxedEnumerator> {
    None
}

/// Pick the best strategy `caps` allows
///
/// Returns `None` when the platform has no way to enumerate interfaces.
pub fn select_enumerator(caps: &Capabilities) -> Option<BoxedEnumerator> {
    let ioctl = if caps.ifindex_ioctl { ioctl_strategy() } else { None };
    ioctl
        .or_else(|| {
            if caps.ifindex_netlink {
                netlink_strategy()
            } else {
                None
            }
        })
        .or_else(portable_strategy)
}

lazy_static::lazy_static! {
    static ref ENUMERATOR: Option<BoxedEnumerator> = {
        let selected = select_enumerator(&Capabilities::CURRENT);
        match &selected {
            Some(e) => debug!("interface enumeration via {}", e.name()),
            None => debug!("no interface enumeration on this platform"),
        }
        selected
    };
}

/// Name of the strategy used by [`enumerate`], `None` if unavailable
pub fn strategy_name() -> Option<&'static str> {
    ENUMERATOR.as_ref().map(|e| e.name())
}

/// List local interface addresses
///
/// `filter` holds raw `AF_*` values; an empty filter returns every family.
/// Use [`families_from_raw`](crate::families_from_raw) to read an
/// `AF_NULL`-terminated list.
///
/// # Returns
///
/// * `Ok(InterfaceList)` - Matching entries in platform order, possibly none
/// * `Err(SocketError::Unavailable)` - No enumeration path on this platform
/// * `Err(SocketError)` - The platform query failed; nothing is returned
pub fn enumerate(filter: &[i32]) -> SockResult<InterfaceList> {
    match ENUMERATOR.as_deref() {
        Some(enumerator) => enumerate_with(enumerator, filter),
        None => Err(SocketError::Unavailable),
    }
}

/// [`enumerate`] through a specific strategy
pub fn enumerate_with(enumerator: &dyn InterfaceEnumerator, filter: &[i32]) -> SockResult<InterfaceList> {
    let entries = enumerator.query()?;
    Ok(InterfaceList::new(
        entries.into_iter().filter(|e| e.matches(filter)).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::InterfaceFlags;
    use entities_socket_common::{AddressFamily, SockAddress};
    use std::net::{Ipv4Addr, Ipv6Addr, SocketAddrV4, SocketAddrV6};

    fn table() -> Vec<InterfaceAddress> {
        let v4 = InterfaceAddress {
            name: "lo".to_string(),
            index: 1,
            flags: InterfaceFlags::UP | InterfaceFlags::LOOPBACK,
            address: SockAddress::from(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)),
            netmask: Some(SockAddress::from(SocketAddrV4::new(
                Ipv4Addr::new(255, 0, 0, 0),
                0,
            ))),
            broadcast: None,
        };
        let v6 = InterfaceAddress {
            address: SockAddress::from(SocketAddrV6::new(Ipv6Addr::LOCALHOST, 0, 0, 0)),
            netmask: None,
            ..v4.clone()
        };
        let link = InterfaceAddress {
            address: SockAddress::Unknown { family: 17 },
            netmask: None,
            ..v4.clone()
        };
        vec![v4, link, v6]
    }

    #[test]
    fn test_unfiltered_keeps_order() {
        let mut mock = MockInterfaceEnumerator::new();
        mock.expect_query().times(1).returning(|| Ok(table()));

        let list = enumerate_with(&mock, &[]).unwrap();
        assert_eq!(list.into_vec(), table());
    }

    #[test]
    fn test_filter_by_family() {
        let mut mock = MockInterfaceEnumerator::new();
        mock.expect_query().returning(|| Ok(table()));

        let list = enumerate_with(&mock, &[AddressFamily::Ipv6.raw()]).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].address.family(), Some(AddressFamily::Ipv6));

        let both = [AddressFamily::Ipv4.raw(), AddressFamily::Ipv6.raw()];
        assert_eq!(enumerate_with(&mock, &both).unwrap().len(), 2);
    }

    #[test]
    fn test_filter_without_matches_is_empty() {
        let mut mock = MockInterfaceEnumerator::new();
        mock.expect_query().returning(|| Ok(table()));

        let list = enumerate_with(&mock, &[12345]).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_query_failure_returns_nothing() {
        let mut mock = MockInterfaceEnumerator::new();
        mock.expect_query()
            .returning(|| Err(SocketError::Fail(105)));

        assert_eq!(enumerate_with(&mock, &[]), Err(SocketError::Fail(105)));
    }

    #[test]
    fn test_selection_order() {
        let name = |caps: Capabilities| select_enumerator(&caps).map(|e| e.name());

        if cfg!(any(target_os = "linux", target_os = "android")) {
            assert_eq!(name(Capabilities::CURRENT), Some("ioctl"));
            let netlink_only = Capabilities {
                ifindex_ioctl: false,
                ..Capabilities::CURRENT
            };
            assert_eq!(name(netlink_only), Some("netlink"));
        }
        if cfg!(unix) {
            assert_eq!(name(Capabilities::MINIMAL), Some("portable"));
        } else {
            assert_eq!(name(Capabilities::MINIMAL), None);
        }
    }

    #[test]
    fn test_global_strategy_matches_selection() {
        let expected = select_enumerator(&Capabilities::CURRENT).map(|e| e.name());
        assert_eq!(strategy_name(), expected);
    }

    #[cfg(unix)]
    #[test]
    fn test_portable_has_no_index() {
        let entries = PortableEnumerator.query().unwrap();
        assert!(entries.iter().all(|e| e.index == NO_INDEX));
    }
}

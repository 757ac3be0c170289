//! Integration tests for adapters_interfaces crate
//!
//! These tests enumerate the real interface table of the host.

use adapters_interfaces::*;
use entities_socket_common::{AddressFamily, SocketError};

fn available() -> bool {
    strategy_name().is_some()
}

#[test]
fn test_enumerate_release_stress() {
    if !available() {
        assert_eq!(enumerate(&[]), Err(SocketError::Unavailable));
        return;
    }
    for _ in 0..200 {
        let list = enumerate(&[]).unwrap();
        list.release();
    }
    release_list(None);
}

#[test]
fn test_loopback_is_listed() {
    if !available() {
        return;
    }
    let list = enumerate(&[]).unwrap();
    assert!(list.iter().any(|e| e.is_loopback()));
}

#[test]
fn test_ipv4_filter() {
    if !available() {
        return;
    }
    let filter = families_from_raw(&[AddressFamily::Ipv4.raw(), AF_NULL]);
    let list = enumerate(&filter).unwrap();
    assert!(list
        .iter()
        .all(|e| e.address.family() == Some(AddressFamily::Ipv4)));
    assert!(list.iter().any(|e| e.address.is_loopback()));
}

#[test]
fn test_filtered_is_subset_of_unfiltered() {
    if !available() {
        return;
    }
    let all = enumerate(&[]).unwrap();
    let v6 = enumerate(&[AddressFamily::Ipv6.raw()]).unwrap();
    assert!(v6.len() <= all.len());
    for entry in &v6 {
        assert!(all.contains(entry));
    }
}

#[test]
fn test_indexed_strategies_fill_index() {
    if !matches!(strategy_name(), Some("ioctl") | Some("netlink")) {
        return;
    }
    let list = enumerate(&[AddressFamily::Ipv4.raw()]).unwrap();
    for entry in list.iter().filter(|e| e.is_loopback()) {
        assert_ne!(entry.index, NO_INDEX);
    }
}

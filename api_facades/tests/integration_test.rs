//! Integration tests for api_facades crate
//!
//! Exercise the socket layer through the facade only.

use api_facades::*;
use std::time::Duration;

#[test]
fn test_udp_through_facade() {
    let family = AddressFamily::Ipv4;
    let a = Socket::create(family, SocketType::Datagram).unwrap();
    let b = Socket::create(family, SocketType::Datagram).unwrap();
    let any_port = SockAddress::from_string("127.0.0.1", true).unwrap();
    a.bind(&any_port).unwrap();
    b.bind(&any_port).unwrap();

    let dest = b.get_bound_address().unwrap();
    assert_eq!(a.send_to(b"0123456789", &dest), Ok(10));

    let mut read = HandleSet::new();
    read.insert(b.handle()).unwrap();
    assert_eq!(
        wait(Some(&mut read), None, None, Some(Duration::from_secs(5))),
        Ok(1)
    );
    assert!(read.contains(b.handle()));

    let mut buf = [0u8; 32];
    let (n, from) = b.recv_from(&mut buf).unwrap();
    assert_eq!(n, 10);
    assert_eq!(&buf[..n], b"0123456789");
    assert_eq!(from, a.get_bound_address().unwrap());
}

#[test]
fn test_platform_and_enumeration_agree() {
    let platform = Platform::current();
    match platform.interface_strategy() {
        Some(_) => {
            let list = enumerate(&[]).unwrap();
            release_list(Some(list));
        }
        None => assert_eq!(enumerate(&[]), Err(SocketError::Unavailable)),
    }
}

#[test]
fn test_ipv6_follows_capabilities() {
    let result = Socket::create(AddressFamily::Ipv6, SocketType::Datagram);
    if Platform::current().supports_ipv6() {
        let socket = result.unwrap();
        assert!(socket.handle().is_valid());
    } else {
        assert_eq!(result.unwrap_err(), SocketError::Unavailable);
    }
}

#[test]
fn test_address_sizes() {
    assert_eq!(SockAddress::any(AddressFamily::Ipv4).size(), SOCKADDR_IN_SIZE);
    assert_eq!(SockAddress::any(AddressFamily::Ipv6).size(), SOCKADDR_IN6_SIZE);
    assert_eq!(SockAddress::Unknown { family: 17 }.size(), 0);
}

//! Socket Address Module
//!
//! Family-tagged socket addresses and the pure operations over them: size,
//! port, wildcard and loopback tests, subnet comparison and conversion to and
//! from presentation strings and raw `sockaddr` bytes.
//!
//! The byte length of an address is fully determined by its family. Raw-byte
//! conversions never read or write past that length.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6, ToSocketAddrs};

use socket2::{Domain, SockAddr};

use crate::capabilities::Capabilities;
use crate::error::{SockResult, SocketError};

/// Maximum length of an IPv6 presentation string, including the terminator
pub const INET6_ADDRSTRLEN: usize = 46;

/// Maximum length of the bracketed `[addr]:port` presentation form
pub const INET6_ADDRSTRLEN_EXTENDED: usize = INET6_ADDRSTRLEN + 8;

/// Size of `sockaddr_in`
pub const SOCKADDR_IN_SIZE: usize = 16;

/// Size of `sockaddr_in6`
pub const SOCKADDR_IN6_SIZE: usize = 28;

/// Size of `sockaddr_storage`; always large enough for any supported family
pub const SOCKADDR_STORAGE_SIZE: usize = 128;

// The family field lives within the first two bytes on every supported layout.
const FAMILY_FIELD_END: usize = 2;

/// Address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    /// IPv4
    Ipv4,
    /// IPv6
    Ipv6,
}

impl AddressFamily {
    /// The platform `AF_*` value
    pub fn raw(self) -> i32 {
        i32::from(Domain::from(self))
    }

    /// Map a platform `AF_*` value back to a supported family
    pub fn from_raw(raw: i32) -> Option<Self> {
        if raw == i32::from(Domain::IPV4) {
            Some(AddressFamily::Ipv4)
        } else if raw == i32::from(Domain::IPV6) {
            Some(AddressFamily::Ipv6)
        } else {
            None
        }
    }

    /// Byte length of this family's socket address structure
    pub fn address_size(self) -> usize {
        match self {
            AddressFamily::Ipv4 => SOCKADDR_IN_SIZE,
            AddressFamily::Ipv6 => SOCKADDR_IN6_SIZE,
        }
    }
}

impl From<AddressFamily> for Domain {
    fn from(family: AddressFamily) -> Self {
        match family {
            AddressFamily::Ipv4 => Domain::IPV4,
            AddressFamily::Ipv6 => Domain::IPV6,
        }
    }
}

/// Family-tagged socket address
///
/// `Unknown` stands for a populated storage whose family this layer does not
/// interpret (a link-layer address returned by interface enumeration, for
/// instance). Every accessor that needs an IP payload rejects it with
/// [`SocketError::Invalid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SockAddress {
    /// IPv4 endpoint
    V4(SocketAddrV4),
    /// IPv6 endpoint
    V6(SocketAddrV6),
    /// Address of a family not handled by this layer
    Unknown {
        /// Raw `AF_*` value
        family: i32,
    },
}

impl SockAddress {
    /// Wildcard address of the given family with port 0
    pub fn any(family: AddressFamily) -> Self {
        match family {
            AddressFamily::Ipv4 => SockAddress::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)),
            AddressFamily::Ipv6 => {
                SockAddress::V6(SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, 0, 0, 0))
            }
        }
    }

    /// Build an address from an IP and a port
    pub fn new(ip: IpAddr, port: u16) -> Self {
        SockAddress::from(SocketAddr::new(ip, port))
    }

    /// Supported family of this address, `None` for `Unknown`
    pub fn family(&self) -> Option<AddressFamily> {
        match self {
            SockAddress::V4(_) => Some(AddressFamily::Ipv4),
            SockAddress::V6(_) => Some(AddressFamily::Ipv6),
            SockAddress::Unknown { .. } => None,
        }
    }

    /// Raw `AF_*` value of this address
    pub fn raw_family(&self) -> i32 {
        match self {
            SockAddress::V4(_) => AddressFamily::Ipv4.raw(),
            SockAddress::V6(_) => AddressFamily::Ipv6.raw(),
            SockAddress::Unknown { family } => *family,
        }
    }

    /// Byte length implied by the family tag; 0 for an unknown family
    pub fn size(&self) -> usize {
        self.family().map_or(0, AddressFamily::address_size)
    }

    /// Port in host byte order
    ///
    /// # Returns
    ///
    /// * `Ok(u16)` - Port number
    /// * `Err(SocketError::Invalid)` - The address has no IP family
    pub fn port(&self) -> SockResult<u16> {
        match self {
            SockAddress::V4(addr) => Ok(addr.port()),
            SockAddress::V6(addr) => Ok(addr.port()),
            SockAddress::Unknown { .. } => Err(SocketError::Invalid),
        }
    }

    /// IP part of the address, `None` for `Unknown`
    pub fn ip(&self) -> Option<IpAddr> {
        self.to_socket_addr().map(|addr| addr.ip())
    }

    /// True iff the address equals the family's wildcard value
    pub fn is_unspecified(&self) -> bool {
        match self {
            SockAddress::V4(addr) => addr.ip().is_unspecified(),
            SockAddress::V6(addr) => addr.ip().is_unspecified(),
            SockAddress::Unknown { .. } => false,
        }
    }

    /// True iff the address is in the family's loopback range
    ///
    /// For IPv6 this includes the IPv4-mapped IPv4 loopback range.
    pub fn is_loopback(&self) -> bool {
        match self {
            SockAddress::V4(addr) => addr.ip().is_loopback(),
            SockAddress::V6(addr) => {
                let ip = addr.ip();
                ip.is_loopback() || ip.to_ipv4_mapped().map_or(false, |v4| v4.is_loopback())
            }
            SockAddress::Unknown { .. } => false,
        }
    }

    /// Check whether `self` and `other` agree on every bit set in `mask`
    ///
    /// Ports are ignored. All three addresses must share one IP family.
    ///
    /// # Returns
    ///
    /// * `Ok(bool)` - Whether both addresses are in the same subnet
    /// * `Err(SocketError::Invalid)` - Families differ or are not IP
    pub fn same_subnet(&self, other: &SockAddress, mask: &SockAddress) -> SockResult<bool> {
        match (self, other, mask) {
            (SockAddress::V4(a), SockAddress::V4(b), SockAddress::V4(m)) => {
                let m = u32::from(*m.ip());
                Ok(u32::from(*a.ip()) & m == u32::from(*b.ip()) & m)
            }
            (SockAddress::V6(a), SockAddress::V6(b), SockAddress::V6(m)) => {
                let m = u128::from(*m.ip());
                Ok(u128::from(*a.ip()) & m == u128::from(*b.ip()) & m)
            }
            _ => Err(SocketError::Invalid),
        }
    }

    /// Set the address part to the family's wildcard value, keeping the port
    pub fn set_any(&mut self) -> SockResult<()> {
        match self {
            SockAddress::V4(addr) => addr.set_ip(Ipv4Addr::UNSPECIFIED),
            SockAddress::V6(addr) => addr.set_ip(Ipv6Addr::UNSPECIFIED),
            SockAddress::Unknown { .. } => return Err(SocketError::Invalid),
        }
        Ok(())
    }

    /// Bare presentation form of the address (no port)
    pub fn presentation(&self) -> String {
        match self.ip() {
            Some(ip) => ip.to_string(),
            None => format!("<family {}>", self.raw_family()),
        }
    }

    /// Render the bare presentation form into `buffer`
    ///
    /// Output that does not fit is truncated; nothing is written beyond the
    /// end of `buffer`.
    ///
    /// # Returns
    ///
    /// The text actually written, borrowed from `buffer`
    pub fn format_into<'a>(&self, buffer: &'a mut [u8]) -> &'a str {
        let text = self.presentation();
        let n = text.len().min(buffer.len());
        buffer[..n].copy_from_slice(&text.as_bytes()[..n]);
        std::str::from_utf8(&buffer[..n]).unwrap_or_default()
    }

    /// Parse a literal address or resolve a hostname
    ///
    /// Accepts bare IP literals (port 0), socket address literals such as
    /// `10.0.0.1:7400` or `[fe80::1]:7400`, and hostnames. A hostname is
    /// resolved for IPv4 when `prefer_ipv4` is set and for IPv6 otherwise;
    /// the family choice is strict. Literals ignore `prefer_ipv4`.
    ///
    /// # Returns
    ///
    /// * `Ok(SockAddress)` - Parsed or resolved address
    /// * `Err(SocketError::Invalid)` - Unparsable text or failed resolution
    /// * `Err(SocketError::Unavailable)` - IPv6 literal without IPv6 support
    pub fn from_string(text: &str, prefer_ipv4: bool) -> SockResult<Self> {
        Self::from_string_with(text, prefer_ipv4, &Capabilities::CURRENT)
    }

    /// [`SockAddress::from_string`] against an explicit capability set
    pub fn from_string_with(
        text: &str,
        prefer_ipv4: bool,
        caps: &Capabilities,
    ) -> SockResult<Self> {
        let text = text.trim();
        let parsed = if let Ok(addr) = text.parse::<SocketAddr>() {
            Some(SockAddress::from(addr))
        } else if let Ok(ip) = text.parse::<IpAddr>() {
            Some(SockAddress::new(ip, 0))
        } else {
            None
        };

        if let Some(addr) = parsed {
            if addr.family() == Some(AddressFamily::Ipv6) && !caps.ipv6 {
                return Err(SocketError::Unavailable);
            }
            return Ok(addr);
        }

        if text.is_empty() || text.contains(char::is_whitespace) {
            return Err(SocketError::Invalid);
        }

        let want = if prefer_ipv4 || !caps.ipv6 {
            AddressFamily::Ipv4
        } else {
            AddressFamily::Ipv6
        };
        let mut candidates = (text, 0u16).to_socket_addrs().map_err(|_| SocketError::Invalid)?;
        candidates
            .find(|addr| SockAddress::from(*addr).family() == Some(want))
            .map(SockAddress::from)
            .ok_or(SocketError::Invalid)
    }

    /// Decode a raw `sockaddr` as written by the platform
    ///
    /// `bytes` may be a whole `sockaddr_storage` or exactly the family's
    /// structure. Fails with `Invalid` when `bytes` is shorter than the
    /// structure its family field announces.
    pub fn from_bytes(bytes: &[u8]) -> SockResult<Self> {
        if bytes.len() < FAMILY_FIELD_END {
            return Err(SocketError::Invalid);
        }
        let len = bytes.len().min(SOCKADDR_STORAGE_SIZE);
        // SAFETY: `try_init` hands over a zeroed storage of
        // SOCKADDR_STORAGE_SIZE bytes and `len` never exceeds it.
        let ((), addr) = unsafe {
            SockAddr::try_init(|storage, storage_len| {
                std::ptr::copy_nonoverlapping(bytes.as_ptr(), storage as *mut u8, len);
                *storage_len = len as _;
                Ok(())
            })
        }?;
        let decoded = Self::from_sockaddr(&addr);
        if decoded.size() > len {
            return Err(SocketError::Invalid);
        }
        Ok(decoded)
    }

    /// Encode the address as a platform `sockaddr` into `out`
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of bytes written, always [`SockAddress::size`]
    /// * `Err(SocketError::Invalid)` - Unknown family or `out` too small
    pub fn write_bytes(&self, out: &mut [u8]) -> SockResult<usize> {
        let addr = self.to_sockaddr()?;
        let len = addr.len() as usize;
        if out.len() < len {
            return Err(SocketError::Invalid);
        }
        // SAFETY: `as_ptr` points to a storage holding at least `len` initialized bytes.
        let raw = unsafe { std::slice::from_raw_parts(addr.as_ptr() as *const u8, len) };
        out[..len].copy_from_slice(raw);
        Ok(len)
    }

    /// Convert from a `socket2` address
    pub fn from_sockaddr(addr: &SockAddr) -> Self {
        match addr.as_socket() {
            Some(socket_addr) => SockAddress::from(socket_addr),
            None => SockAddress::Unknown {
                family: i32::from(addr.family()),
            },
        }
    }

    /// Convert to a `socket2` address for use in system calls
    pub fn to_sockaddr(&self) -> SockResult<SockAddr> {
        self.to_socket_addr()
            .map(SockAddr::from)
            .ok_or(SocketError::Invalid)
    }

    /// Convert to a standard library address, `None` for `Unknown`
    pub fn to_socket_addr(&self) -> Option<SocketAddr> {
        match self {
            SockAddress::V4(addr) => Some(SocketAddr::V4(*addr)),
            SockAddress::V6(addr) => Some(SocketAddr::V6(*addr)),
            SockAddress::Unknown { .. } => None,
        }
    }
}

impl From<SocketAddr> for SockAddress {
    fn from(addr: SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(v4) => SockAddress::V4(v4),
            SocketAddr::V6(v6) => SockAddress::V6(v6),
        }
    }
}

impl From<SocketAddrV4> for SockAddress {
    fn from(addr: SocketAddrV4) -> Self {
        SockAddress::V4(addr)
    }
}

impl From<SocketAddrV6> for SockAddress {
    fn from(addr: SocketAddrV6) -> Self {
        SockAddress::V6(addr)
    }
}

impl TryFrom<SockAddress> for SocketAddr {
    type Error = SocketError;

    fn try_from(addr: SockAddress) -> Result<Self, Self::Error> {
        addr.to_socket_addr().ok_or(SocketError::Invalid)
    }
}

/// Extended presentation form: `a.b.c.d:port` or `[addr]:port`
impl fmt::Display for SockAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SockAddress::V4(addr) => write!(f, "{}", addr),
            SockAddress::V6(addr) => write!(f, "{}", addr),
            SockAddress::Unknown { family } => write!(f, "<family {}>", family),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v4(text: &str) -> SockAddress {
        SockAddress::from_string(text, true).unwrap()
    }

    #[test]
    fn test_size_by_family() {
        assert_eq!(v4("10.1.2.3").size(), SOCKADDR_IN_SIZE);
        assert_eq!(SockAddress::any(AddressFamily::Ipv6).size(), SOCKADDR_IN6_SIZE);
        assert_eq!(SockAddress::Unknown { family: 17 }.size(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_sizes_match_platform_structures() {
        assert_eq!(SOCKADDR_IN_SIZE, std::mem::size_of::<libc::sockaddr_in>());
        assert_eq!(SOCKADDR_IN6_SIZE, std::mem::size_of::<libc::sockaddr_in6>());
        assert_eq!(SOCKADDR_STORAGE_SIZE, std::mem::size_of::<libc::sockaddr_storage>());
    }

    #[test]
    fn test_port() {
        assert_eq!(v4("10.0.0.1:7400").port(), Ok(7400));
        assert_eq!(v4("[::1]:7410").port(), Ok(7410));
        assert_eq!(SockAddress::Unknown { family: 1 }.port(), Err(SocketError::Invalid));
    }

    #[test]
    fn test_unspecified_and_loopback() {
        assert!(v4("0.0.0.0").is_unspecified());
        assert!(v4("::").is_unspecified());
        assert!(!v4("127.0.0.1").is_unspecified());

        assert!(v4("127.0.0.1").is_loopback());
        assert!(v4("127.12.0.9").is_loopback());
        assert!(v4("::1").is_loopback());
        assert!(v4("::ffff:127.0.0.1").is_loopback());
        assert!(!v4("192.168.1.1").is_loopback());
        assert!(!SockAddress::Unknown { family: 1 }.is_loopback());
    }

    #[test]
    fn test_same_subnet() {
        let mask = v4("255.255.255.0");
        assert_eq!(v4("192.168.1.5").same_subnet(&v4("192.168.1.200"), &mask), Ok(true));
        assert_eq!(v4("192.168.1.5").same_subnet(&v4("192.168.2.200"), &mask), Ok(false));

        let mask6 = v4("ffff:ffff:ffff:ffff::");
        assert_eq!(v4("fe80::1").same_subnet(&v4("fe80::2"), &mask6), Ok(true));
        assert_eq!(v4("fe80::1").same_subnet(&v4("fe81::1"), &mask6), Ok(false));
    }

    #[test]
    fn test_same_subnet_mixed_families() {
        let mask = v4("255.255.255.0");
        assert_eq!(
            v4("192.168.1.5").same_subnet(&v4("::1"), &mask),
            Err(SocketError::Invalid)
        );
    }

    #[test]
    fn test_set_any_keeps_port() {
        let mut addr = v4("192.168.1.5:9000");
        addr.set_any().unwrap();
        assert!(addr.is_unspecified());
        assert_eq!(addr.port(), Ok(9000));

        let mut addr6 = v4("[fe80::7]:9001");
        addr6.set_any().unwrap();
        assert!(addr6.is_unspecified());

        let mut unknown = SockAddress::Unknown { family: 17 };
        assert_eq!(unknown.set_any(), Err(SocketError::Invalid));
    }

    #[test]
    fn test_format_into_truncates() {
        let addr = v4("192.168.100.200");
        let mut small = [0u8; 7];
        assert_eq!(addr.format_into(&mut small), "192.168");

        let mut exact = [0u8; INET6_ADDRSTRLEN];
        assert_eq!(addr.format_into(&mut exact), "192.168.100.200");

        let mut empty: [u8; 0] = [];
        assert_eq!(addr.format_into(&mut empty), "");
    }

    #[test]
    fn test_extended_presentation_fits() {
        let addr = v4("[ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff]:65535");
        assert_eq!(addr.to_string(), "[ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff]:65535");
        assert!(addr.to_string().len() < INET6_ADDRSTRLEN_EXTENDED);
        assert_eq!(v4("10.0.0.1:80").to_string(), "10.0.0.1:80");
    }

    #[test]
    fn test_from_string_rejects_garbage() {
        assert_eq!(SockAddress::from_string("", true), Err(SocketError::Invalid));
        assert_eq!(SockAddress::from_string("not an address", true), Err(SocketError::Invalid));
        assert!(SockAddress::from_string("300.1.1.1:1", true).is_err());
    }

    #[test]
    fn test_from_string_without_ipv6() {
        assert_eq!(
            SockAddress::from_string_with("::1", true, &Capabilities::MINIMAL),
            Err(SocketError::Unavailable)
        );
        assert!(SockAddress::from_string_with("10.0.0.1", false, &Capabilities::MINIMAL).is_ok());
    }

    #[test]
    fn test_from_string_resolves_localhost() {
        let addr = SockAddress::from_string("localhost", true).unwrap();
        assert_eq!(addr.family(), Some(AddressFamily::Ipv4));
        assert!(addr.is_loopback());
    }

    #[test]
    fn test_family_raw_mapping() {
        assert_eq!(AddressFamily::from_raw(AddressFamily::Ipv4.raw()), Some(AddressFamily::Ipv4));
        assert_eq!(AddressFamily::from_raw(AddressFamily::Ipv6.raw()), Some(AddressFamily::Ipv6));
        assert_eq!(AddressFamily::from_raw(-1), None);
    }

    #[test]
    fn test_write_bytes_requires_room() {
        let addr = v4("10.0.0.1:1");
        let mut short = [0u8; SOCKADDR_IN_SIZE - 1];
        assert_eq!(addr.write_bytes(&mut short), Err(SocketError::Invalid));

        let mut exact = [0u8; SOCKADDR_IN_SIZE];
        assert_eq!(addr.write_bytes(&mut exact), Ok(SOCKADDR_IN_SIZE));

        let mut storage = [0xAAu8; SOCKADDR_STORAGE_SIZE];
        assert_eq!(addr.write_bytes(&mut storage), Ok(SOCKADDR_IN_SIZE));
        assert!(storage[SOCKADDR_IN_SIZE..].iter().all(|b| *b == 0xAA));

        let unknown = SockAddress::Unknown { family: 1 };
        assert_eq!(unknown.write_bytes(&mut storage), Err(SocketError::Invalid));
    }

    #[test]
    fn test_bytes_round_trip() {
        for text in ["192.168.1.5:7400", "[fe80::1]:7410"] {
            let addr = v4(text);
            let mut storage = [0u8; SOCKADDR_STORAGE_SIZE];
            let n = addr.write_bytes(&mut storage).unwrap();
            assert_eq!(SockAddress::from_bytes(&storage[..n]), Ok(addr));
            assert_eq!(SockAddress::from_bytes(&storage), Ok(addr));
        }
    }

    #[test]
    fn test_from_bytes_rejects_short_buffer() {
        let addr = v4("[fe80::1]:7410");
        let mut storage = [0u8; SOCKADDR_STORAGE_SIZE];
        addr.write_bytes(&mut storage).unwrap();
        assert_eq!(
            SockAddress::from_bytes(&storage[..SOCKADDR_IN_SIZE]),
            Err(SocketError::Invalid)
        );
        assert_eq!(SockAddress::from_bytes(&storage[..1]), Err(SocketError::Invalid));
    }
}

//! Capability Matrix
//!
//! Build-time description of which socket facilities the target platform
//! offers. Every other component branches on these flags; nothing writes them.

/// Platform socket capabilities
///
/// The four flags are fixed per target at compile time. [`Capabilities::CURRENT`]
/// describes the platform the crate was built for; other values exist so that
/// strategy selection can be exercised for platforms other than the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capabilities {
    /// IPv6 sockets and addresses are supported
    pub ipv6: bool,
    /// Interface indices can be queried with the `SIOCGIFINDEX` ioctl
    pub ifindex_ioctl: bool,
    /// Interface indices can be queried with a netlink link dump
    pub ifindex_netlink: bool,
    /// Source-specific multicast joins are supported
    pub source_specific_multicast: bool,
}

impl Capabilities {
    /// Capabilities of the platform this crate was compiled for
    pub const CURRENT: Capabilities = Capabilities {
        ipv6: cfg!(any(unix, windows)),
        ifindex_ioctl: cfg!(any(target_os = "linux", target_os = "android")),
        ifindex_netlink: cfg!(any(target_os = "linux", target_os = "android")),
        source_specific_multicast: cfg!(any(
            target_os = "linux",
            target_os = "android",
            target_os = "freebsd",
            target_os = "macos",
            target_os = "ios",
            windows
        )),
    };

    /// A platform with none of the optional facilities
    pub const MINIMAL: Capabilities = Capabilities {
        ipv6: false,
        ifindex_ioctl: false,
        ifindex_netlink: false,
        source_specific_multicast: false,
    };

    /// Whether any interface-index query mechanism is available
    pub fn has_interface_index(&self) -> bool {
        self.ifindex_ioctl || self.ifindex_netlink
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::CURRENT
    }
}

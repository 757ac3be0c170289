//! Interface Descriptor Types
//!
//! Descriptors produced by interface enumeration and the owned list that
//! carries them to the caller.

use std::ops::Deref;

use entities_socket_common::SockAddress;
use log::trace;

/// Terminator of a raw family filter list
pub const AF_NULL: i32 = -1;

/// Index reported when the platform offers no way to look one up
pub const NO_INDEX: u32 = 0;

/// Interface flags (`IFF_*` bits as reported by the platform)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InterfaceFlags(u32);

impl InterfaceFlags {
    /// Interface is administratively up
    pub const UP: Self = Self(1 << 0);
    /// Broadcast address is valid
    pub const BROADCAST: Self = Self(1 << 1);
    /// Loopback interface
    pub const LOOPBACK: Self = Self(1 << 3);
    /// Point-to-point link
    pub const POINTOPOINT: Self = Self(1 << 4);
    /// Resources allocated
    pub const RUNNING: Self = Self(1 << 6);
    /// Supports multicast
    #[cfg(any(target_os = "linux", target_os = "android"))]
    pub const MULTICAST: Self = Self(1 << 12);
    /// Supports multicast
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    pub const MULTICAST: Self = Self(1 << 15);

    /// Wrap raw platform flag bits
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Create empty flags
    pub fn new() -> Self {
        Self(0)
    }

    /// Add a flag
    pub fn with(self, flag: Self) -> Self {
        Self(self.0 | flag.0)
    }

    /// Check if a flag is set
    pub fn contains(self, flag: Self) -> bool {
        (self.0 & flag.0) == flag.0 && flag.0 != 0
    }

    /// Get raw value
    pub fn bits(self) -> u32 {
        self.0
    }
}

impl std::ops::BitOr for InterfaceFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// One address of one local network interface
///
/// An interface with several addresses yields one descriptor per address,
/// all sharing `name`, `index` and `flags`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddress {
    /// Interface name, e.g. `eth0`
    pub name: String,
    /// Interface index, or [`NO_INDEX`]
    pub index: u32,
    /// Interface flags
    pub flags: InterfaceFlags,
    /// Address assigned to the interface
    pub address: SockAddress,
    /// Netmask of `address`, if reported
    pub netmask: Option<SockAddress>,
    /// Broadcast address, if the interface has one
    pub broadcast: Option<SockAddress>,
}

impl InterfaceAddress {
    /// Whether this is a loopback interface
    pub fn is_loopback(&self) -> bool {
        self.flags.contains(InterfaceFlags::LOOPBACK)
    }

    /// Whether the interface is up
    pub fn is_up(&self) -> bool {
        self.flags.contains(InterfaceFlags::UP)
    }

    /// Whether `raw_family` passes `filter`; an empty filter passes everything
    pub fn matches(&self, filter: &[i32]) -> bool {
        filter.is_empty() || filter.contains(&self.address.raw_family())
    }
}

/// Ordered interface descriptors returned by one enumeration
///
/// The list owns every descriptor. [`InterfaceList::release`] consumes it, so
/// a list can be released only once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceList {
    entries: Vec<InterfaceAddress>,
}

impl InterfaceList {
    /// Wrap already-collected descriptors
    pub fn new(entries: Vec<InterfaceAddress>) -> Self {
        Self { entries }
    }

    /// Release every descriptor
    pub fn release(self) {
        trace!("releasing {} interface entries", self.entries.len());
        drop(self.entries);
    }

    /// Take the descriptors out of the list
    pub fn into_vec(self) -> Vec<InterfaceAddress> {
        self.entries
    }
}

impl Deref for InterfaceList {
    type Target = [InterfaceAddress];

    fn deref(&self) -> &Self::Target {
        &self.entries
    }
}

impl IntoIterator for InterfaceList {
    type Item = InterfaceAddress;
    type IntoIter = std::vec::IntoIter<InterfaceAddress>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a InterfaceList {
    type Item = &'a InterfaceAddress;
    type IntoIter = std::slice::Iter<'a, InterfaceAddress>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Release a list that may not exist; `None` is a no-op
pub fn release_list(list: Option<InterfaceList>) {
    if let Some(list) = list {
        list.release();
    }
}

/// Read a raw family filter up to its [`AF_NULL`] terminator
///
/// A list without a terminator is taken whole.
pub fn families_from_raw(raw: &[i32]) -> Vec<i32> {
    raw.iter().copied().take_while(|&af| af != AF_NULL).collect()
}

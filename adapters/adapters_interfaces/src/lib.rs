//! Adapters Layer: Network Interfaces
//!
//! Provides enumeration of local network interface addresses for binding and
//! multicast decisions.
//!
//! ## Overview
//!
//! The `adapters_interfaces` crate provides:
//! - **Descriptors**: `InterfaceAddress` with name, index, flags, address,
//!   netmask and broadcast address
//! - **Owned lists**: `InterfaceList`, released as one unit
//! - **Strategies**: index lookup by `SIOCGIFINDEX`, by netlink link dump, or
//!   none, chosen once from the capability matrix
//!
//! ## Architecture
//!
//! This crate is part of the adapters layer. It depends on:
//! - `entities_socket_common`: For addresses, capabilities and `SocketError`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use adapters_interfaces::{enumerate, families_from_raw, AF_NULL};
//! use entities_socket_common::AddressFamily;
//!
//! # fn main() -> Result<(), entities_socket_common::SocketError> {
//! let filter = families_from_raw(&[AddressFamily::Ipv4.raw(), AF_NULL]);
//! let list = enumerate(&filter)?;
//! for entry in &list {
//!     println!("{} #{} {}", entry.name, entry.index, entry.address);
//! }
//! list.release();
//! # Ok(())
//! # }
//! ```
//!
//! ## See Also
//!
//! - [`entities_socket_common`](../entities_socket_common/index.html): Addresses and errors
//! - [`adapters_socket`](../adapters_socket/index.html): Sockets and multicast membership

pub mod enumerator;
pub mod interface;

#[cfg(unix)]
mod ifaddrs;
#[cfg(any(target_os = "linux", target_os = "android"))]
pub mod ioctl;
#[cfg(any(target_os = "linux", target_os = "android"))]
pub mod netlink;

pub use enumerator::{
    enumerate, enumerate_with, select_enumerator, strategy_name, BoxedEnumerator,
    InterfaceEnumerator,
};
#[cfg(unix)]
pub use enumerator::PortableEnumerator;
pub use interface::{
    families_from_raw, release_list, InterfaceAddress, InterfaceFlags, InterfaceList, AF_NULL,
    NO_INDEX,
};

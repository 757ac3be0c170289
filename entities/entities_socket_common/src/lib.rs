//! Entities Layer: Socket Common
//!
//! Provides the platform-independent building blocks of the portable socket
//! layer: the build-time capability matrix, the error taxonomy shared by every
//! socket operation, and the family-tagged socket address type.
//!
//! ## Overview
//!
//! The `entities_socket_common` crate is part of the entities layer. It holds
//! no OS resources; everything here is a value type or a pure function.
//!
//! ## Modules
//!
//! - **[`capabilities`](capabilities/index.html)**: IPv6, interface-index query
//!   and source-specific multicast availability per target
//! - **[`error`](error/index.html)**: `SocketError` and `SockResult`
//! - **[`sockaddr`](sockaddr/index.html)**: `SockAddress` and its size, port,
//!   subnet and string conversions
//!
//! ## Usage
//!
//! ```rust
//! use entities_socket_common::SockAddress;
//!
//! let a = SockAddress::from_string("192.168.1.5", true).unwrap();
//! let b = SockAddress::from_string("192.168.1.200", true).unwrap();
//! let mask = SockAddress::from_string("255.255.255.0", true).unwrap();
//! assert_eq!(a.same_subnet(&b, &mask), Ok(true));
//! ```
//!
//! ## See Also
//!
//! - [`adapters_socket`](../adapters_socket/index.html): Socket handles, options and readiness waiting
//! - [`adapters_interfaces`](../adapters_interfaces/index.html): Network interface enumeration

pub mod capabilities;
pub mod error;
pub mod sockaddr;

pub use capabilities::Capabilities;
pub use error::{SockResult, SocketError};
pub use sockaddr::{
    AddressFamily, SockAddress, INET6_ADDRSTRLEN, INET6_ADDRSTRLEN_EXTENDED, SOCKADDR_IN6_SIZE,
    SOCKADDR_IN_SIZE, SOCKADDR_STORAGE_SIZE,
};

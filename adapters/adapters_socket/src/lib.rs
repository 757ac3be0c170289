//! Adapters Layer: Sockets
//!
//! Provides the socket operations of the portable socket layer on top of the
//! `socket2` crate and the platform `select` call.
//!
//! ## Overview
//!
//! The `adapters_socket` crate provides:
//! - **Socket lifecycle**: create, bind, send_to, recv_from, destroy
//! - **Blocking control**: `set_nonblocking` with `Busy` detection
//! - **Options**: raw `level`/`name` pass-through, named `SOL_SOCKET` options
//!   and multicast group membership
//! - **Readiness**: `wait` over handle sets with a timeout
//! - **Waitsets**: a triggerable set of sockets for a receive thread
//!
//! ## Architecture
//!
//! This crate is part of the adapters layer. It depends on:
//! - `entities_socket_common`: For addresses, capabilities and `SocketError`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use adapters_socket::{Socket, SocketType};
//! use entities_socket_common::{AddressFamily, SockAddress};
//!
//! # fn main() -> Result<(), entities_socket_common::SocketError> {
//! let socket = Socket::create(AddressFamily::Ipv4, SocketType::Datagram)?;
//! socket.bind(&SockAddress::from_string("127.0.0.1", true)?)?;
//! let port = socket.get_bound_address()?.port()?;
//! assert_ne!(port, 0);
//! # Ok(())
//! # }
//! ```
//!
//! ## See Also
//!
//! - [`entities_socket_common`](../entities_socket_common/index.html): Addresses and errors
//! - [`adapters_interfaces`](../adapters_interfaces/index.html): Network interface enumeration

pub mod config;
pub mod handle;
pub mod options;
pub mod select;
pub mod socket;
pub mod waitset;

pub use config::{SocketConfig, WaitsetConfig};
pub use handle::{RawHandle, SocketHandle};
pub use options::SocketOption;
pub use select::{wait, HandleSet};
pub use socket::{Socket, SocketType};
pub use waitset::{SockWaitset, WaitsetEvents};

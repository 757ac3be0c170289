//! API Facades Layer
//!
//! Single entry point to the portable socket layer. Callers that only need
//! sockets, addresses and interface lists depend on this crate alone.
//!
//! All facades re-export types and functions from the inner layers, plus
//! [`Platform`], which describes what the running build supports.

pub mod platform;

pub use platform::Platform;

pub use adapters_interfaces::{
    enumerate, families_from_raw, release_list, InterfaceAddress, InterfaceEnumerator,
    InterfaceFlags, InterfaceList, AF_NULL, NO_INDEX,
};
pub use adapters_socket::{
    wait, HandleSet, RawHandle, SockWaitset, Socket, SocketConfig, SocketHandle, SocketOption,
    SocketType, WaitsetConfig, WaitsetEvents,
};
pub use entities_socket_common::{
    AddressFamily, Capabilities, SockAddress, SockResult, SocketError, INET6_ADDRSTRLEN,
    INET6_ADDRSTRLEN_EXTENDED, SOCKADDR_IN6_SIZE, SOCKADDR_IN_SIZE, SOCKADDR_STORAGE_SIZE,
};

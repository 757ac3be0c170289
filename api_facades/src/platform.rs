//! Platform Description
//!
//! What the running build of the socket layer supports: the compile-time
//! capability matrix and the interface enumeration strategy chosen from it.

use std::fmt;

use adapters_interfaces::strategy_name;
use entities_socket_common::Capabilities;
use log::debug;

/// Description of the running platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    capabilities: Capabilities,
    interface_strategy: Option<&'static str>,
}

lazy_static::lazy_static! {
    static ref PLATFORM: Platform = {
        let platform = Platform {
            capabilities: Capabilities::CURRENT,
            interface_strategy: strategy_name(),
        };
        debug!("socket platform: {}", platform);
        platform
    };
}

impl Platform {
    /// The platform this process runs on
    pub fn current() -> &'static Platform {
        &PLATFORM
    }

    /// Capability matrix
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Name of the interface enumeration strategy, `None` when enumeration
    /// is unavailable
    pub fn interface_strategy(&self) -> Option<&'static str> {
        self.interface_strategy
    }

    /// Whether IPv6 sockets can be created
    pub fn supports_ipv6(&self) -> bool {
        self.capabilities.ipv6
    }

    /// Whether source-specific multicast joins are possible
    pub fn supports_source_specific_multicast(&self) -> bool {
        self.capabilities.source_specific_multicast
    }

    /// Whether enumerated interfaces carry a real index
    pub fn reports_interface_index(&self) -> bool {
        self.capabilities.has_interface_index() && self.interface_strategy != Some("portable")
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let yes_no = |b: bool| if b { "yes" } else { "no" };
        write!(
            f,
            "ipv6={} ssm={} interfaces={}",
            yes_no(self.capabilities.ipv6),
            yes_no(self.capabilities.source_specific_multicast),
            self.interface_strategy.unwrap_or("unavailable")
        )
    }
}

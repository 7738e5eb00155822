// ── Discovered endpoint types ──

use std::net::Ipv6Addr;

use cidr::Ipv6Cidr;
use serde::Serialize;

use crate::classify::prefix64;

/// A Matter end-device seen via `_matter._tcp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    pub name: String,
    pub address: Ipv6Addr,
}

impl Device {
    pub fn new(name: impl Into<String>, address: Ipv6Addr) -> Self {
        Self {
            name: name.into(),
            address,
        }
    }

    /// The /64 this device lives in.
    pub fn prefix(&self) -> Ipv6Cidr {
        prefix64(self.address)
    }
}

/// A Thread border router seen via `_meshcop._udp`.
///
/// `prefix` is always the /64 containing `address`; it is derived on
/// construction so it can never drift from the address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BorderRouter {
    pub name: String,
    pub address: Ipv6Addr,
    pub prefix: Ipv6Cidr,
}

impl BorderRouter {
    pub fn new(name: impl Into<String>, address: Ipv6Addr) -> Self {
        Self {
            name: name.into(),
            address,
            prefix: prefix64(address),
        }
    }
}

// ── Route domain types ──

use std::fmt;
use std::net::Ipv6Addr;

use cidr::Ipv6Cidr;
use serde::Serialize;

/// Identity of a route for diffing: the `(prefix, next_hop)` pair.
///
/// Labels, ids and the enabled flag are content, not identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RouteKey {
    pub prefix: Ipv6Cidr,
    pub next_hop: Ipv6Addr,
}

impl RouteKey {
    pub fn new(prefix: Ipv6Cidr, next_hop: Ipv6Addr) -> Self {
        Self { prefix, next_hop }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.prefix, self.next_hop)
    }
}

/// A route the current discovery state calls for. Recomputed every pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DesiredRoute {
    pub prefix: Ipv6Cidr,
    pub next_hop: Ipv6Addr,
    pub router_name: String,
}

impl DesiredRoute {
    pub fn key(&self) -> RouteKey {
        RouteKey::new(self.prefix, self.next_hop)
    }

    /// The router-side route that realises this desire, labelled
    /// `"{label_prefix} {router name}"` with DNS-SD escapes dropped.
    pub fn to_router_route(&self, label_prefix: &str) -> RouterRoute {
        RouterRoute {
            id: String::new(),
            prefix: self.prefix,
            next_hop: self.next_hop,
            label: route_label(label_prefix, &self.router_name),
            enabled: true,
        }
    }
}

/// A static route as the router reports it.
///
/// `id` is empty until the router has stored the route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouterRoute {
    pub id: String,
    pub prefix: Ipv6Cidr,
    pub next_hop: Ipv6Addr,
    pub label: String,
    pub enabled: bool,
}

impl RouterRoute {
    pub fn key(&self) -> RouteKey {
        RouteKey::new(self.prefix, self.next_hop)
    }

    /// Whether this route carries the managed-label marker. A blank
    /// marker matches nothing, so no route is ever claimed by accident.
    pub fn is_managed(&self, marker: &str) -> bool {
        let marker = marker.trim();
        !marker.is_empty() && self.label.contains(marker)
    }
}

pub fn route_label(label_prefix: &str, router_name: &str) -> String {
    format!("{label_prefix} {}", router_name.replace('\\', ""))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn label_strips_escapes() {
        assert_eq!(
            route_label("Thread route via", r"Living\ Room\ \(4\)"),
            "Thread route via Living Room (4)"
        );
    }

    #[test]
    fn key_ignores_label_and_enabled() {
        let prefix: Ipv6Cidr = "fd00:1111:2222:3333::/64".parse().unwrap();
        let hop: Ipv6Addr = "2001:4860:4860:1234::ff".parse().unwrap();
        let a = RouterRoute {
            id: "a".into(),
            prefix,
            next_hop: hop,
            label: "Thread route via Kitchen".into(),
            enabled: true,
        };
        let b = RouterRoute {
            id: "b".into(),
            label: "manual".into(),
            enabled: false,
            ..a.clone()
        };
        assert_eq!(a.key(), b.key());
        assert!(a.is_managed("Thread route via"));
        assert!(!b.is_managed("Thread route via"));
        assert_eq!(
            a.key().to_string(),
            "fd00:1111:2222:3333::/64->2001:4860:4860:1234::ff"
        );
    }

    #[test]
    fn blank_marker_manages_nothing() {
        let route = RouterRoute {
            id: "r1".into(),
            prefix: "fd00:1111:2222:3333::/64".parse().unwrap(),
            next_hop: "2001:4860:4860:1234::ff".parse().unwrap(),
            label: "office vpn (hand-made)".into(),
            enabled: true,
        };
        assert!(!route.is_managed(""));
        assert!(!route.is_managed("   "));
    }
}

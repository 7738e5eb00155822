// ── Route generation ──
//
// Turns the discovered devices and border routers into the set of
// /64 routes the router should carry.

use std::collections::{BTreeMap, BTreeSet};

use cidr::Ipv6Cidr;

use crate::classify::{is_routable_network, is_routable_next_hop};
use crate::model::{BorderRouter, DesiredRoute, Device, RouteKey};

/// Derive the desired routes from the current discovery snapshot.
///
/// Every routable device /64 that is not itself a border-router /64 gets
/// one route per border router with a routable (global) address. The
/// result holds each `(prefix, next_hop)` once and is sorted by key.
pub fn generate_routes(devices: &[Device], routers: &[BorderRouter]) -> Vec<DesiredRoute> {
    let device_prefixes: BTreeSet<Ipv6Cidr> = devices
        .iter()
        .map(Device::prefix)
        .filter(is_routable_network)
        .collect();

    let router_prefixes: BTreeSet<Ipv6Cidr> = routers
        .iter()
        .map(|r| r.prefix)
        .filter(is_routable_network)
        .collect();

    let mut routes: BTreeMap<RouteKey, DesiredRoute> = BTreeMap::new();
    for prefix in device_prefixes.difference(&router_prefixes) {
        for router in routers.iter().filter(|r| is_routable_next_hop(r.address)) {
            let route = DesiredRoute {
                prefix: *prefix,
                next_hop: router.address,
                router_name: router.name.clone(),
            };
            routes.insert(route.key(), route);
        }
    }

    routes.into_values().collect()
}

// ── Domain model ──
//
// Discovered endpoints and the route types the generator, reconciler and
// gateway exchange. Prefixes are always /64 `Ipv6Cidr` values.

pub mod device;
pub mod route;

pub use device::{BorderRouter, Device};
pub use route::{DesiredRoute, RouteKey, RouterRoute, route_label};

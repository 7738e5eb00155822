// Routing API wire types
//
// Every legacy endpoint wraps its payload in the `LegacyResponse<T>`
// envelope. Static routes use hyphenated field names (`static-route_network`)
// that are mapped onto snake_case here.

use serde::{Deserialize, Serialize};

// ── Response Envelope ────────────────────────────────────────────────

/// Standard UniFi legacy API response envelope.
///
/// ```json
/// { "meta": { "rc": "ok", "msg": "optional" }, "data": [...] }
/// ```
#[derive(Debug, Deserialize)]
pub struct LegacyResponse<T> {
    pub meta: Meta,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// Metadata from the legacy envelope. `rc` == `"ok"` means success.
#[derive(Debug, Deserialize)]
pub struct Meta {
    pub rc: String,
    #[serde(default)]
    pub msg: Option<String>,
}

// ── Static route ─────────────────────────────────────────────────────

pub const ROUTE_TYPE_STATIC: &str = "static-route";
pub const STATIC_ROUTE_TYPE_NEXTHOP: &str = "nexthop-route";
pub const GATEWAY_TYPE_DEFAULT: &str = "default";

/// A static route as stored by the router under `rest/routing`.
///
/// `id` is assigned by the router and is absent on create. The routing
/// collection also holds non-static entries, so most fields are defaulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticRoute {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub route_type: String,
    #[serde(rename = "static-route_network", default)]
    pub network: String,
    #[serde(rename = "static-route_nexthop", default)]
    pub nexthop: String,
    #[serde(rename = "static-route_type", default)]
    pub static_route_type: String,
    #[serde(default)]
    pub gateway_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
}

impl StaticRoute {
    /// Build a new enabled next-hop route ready to POST.
    pub fn nexthop(
        name: impl Into<String>,
        network: impl Into<String>,
        nexthop: impl Into<String>,
        gateway_device: Option<String>,
    ) -> Self {
        Self {
            id: None,
            enabled: true,
            name: name.into(),
            route_type: ROUTE_TYPE_STATIC.into(),
            network: network.into(),
            nexthop: nexthop.into(),
            static_route_type: STATIC_ROUTE_TYPE_NEXTHOP.into(),
            gateway_type: GATEWAY_TYPE_DEFAULT.into(),
            gateway_device,
            site_id: None,
        }
    }
}

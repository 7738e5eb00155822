//! `scan`: one-shot discovery.

use std::time::Duration;

use serde::Serialize;
use tabled::Tabled;
use threadroute_config::Config;
use threadroute_core::discovery;
use threadroute_core::{BorderRouter, DesiredRoute, Device, DiscoverySource, MdnsDiscovery, generate_routes};
use tracing::info;

use crate::cli::{GlobalOpts, ScanArgs};
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Prefix")]
    prefix: String,
}

impl From<&Device> for DeviceRow {
    fn from(d: &Device) -> Self {
        Self {
            name: d.name.clone(),
            address: d.address.to_string(),
            prefix: d.prefix().to_string(),
        }
    }
}

#[derive(Tabled)]
struct RouterRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Thread prefix")]
    prefix: String,
}

impl From<&BorderRouter> for RouterRow {
    fn from(r: &BorderRouter) -> Self {
        Self {
            name: r.name.clone(),
            address: r.address.to_string(),
            prefix: r.prefix.to_string(),
        }
    }
}

#[derive(Tabled)]
struct RouteRow {
    #[tabled(rename = "Prefix")]
    prefix: String,
    #[tabled(rename = "Next hop")]
    next_hop: String,
    #[tabled(rename = "Border router")]
    router: String,
}

impl From<&DesiredRoute> for RouteRow {
    fn from(r: &DesiredRoute) -> Self {
        Self {
            prefix: r.prefix.to_string(),
            next_hop: r.next_hop.to_string(),
            router: r.router_name.clone(),
        }
    }
}

#[derive(Serialize)]
struct ScanResult {
    devices: Vec<Device>,
    routers: Vec<BorderRouter>,
    routes: Vec<DesiredRoute>,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: &ScanArgs, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let (devices, routers) = discover(args, config).await?;
    let routes = generate_routes(&devices, &routers);
    let result = ScanResult {
        devices,
        routers,
        routes,
    };

    let out = output::render_single(
        &global.output,
        &result,
        |r| {
            [
                output::titled_table(
                    "Matter devices",
                    &r.devices.iter().map(DeviceRow::from).collect::<Vec<_>>(),
                ),
                output::titled_table(
                    "Thread border routers",
                    &r.routers.iter().map(RouterRow::from).collect::<Vec<_>>(),
                ),
                output::titled_table(
                    "Routes",
                    &r.routes.iter().map(RouteRow::from).collect::<Vec<_>>(),
                ),
            ]
            .join("\n\n")
        },
        |r| {
            r.routes
                .iter()
                .map(|route| format!("{} {}", route.prefix, route.next_hop))
                .collect::<Vec<_>>()
                .join("\n")
        },
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Enumerate both service kinds once, for `--timeout` or the configured
/// scan timeout.
pub(super) async fn discover(
    args: &ScanArgs,
    config: &Config,
) -> Result<(Vec<Device>, Vec<BorderRouter>), CliError> {
    let settings = config.daemon_settings()?;
    let timeout: Duration = args.timeout.map_or(settings.scan_timeout, |d| *d);

    info!(timeout = %humantime::format_duration(timeout), "scanning for Matter devices and border routers");
    let mdns = MdnsDiscovery::new()?;
    let found = discovery::scan(&mdns, timeout).await;
    mdns.shutdown();
    Ok(found?)
}

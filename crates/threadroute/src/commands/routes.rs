//! Route command handlers: read the router, preview reconciliation.

use chrono::Utc;
use serde::Serialize;
use tabled::Tabled;
use threadroute_config::Config;
use threadroute_core::{
    CoreError, Reconciler, RouterGateway, RouterRoute, UnifiGateway, generate_routes,
};

use crate::cli::{GlobalOpts, RoutesArgs, RoutesCommand, ScanArgs};
use crate::error::CliError;
use crate::output;

use super::scan;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct ListedRoute {
    #[serde(flatten)]
    route: RouterRoute,
    managed: bool,
}

#[derive(Tabled)]
struct RouteRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Prefix")]
    prefix: String,
    #[tabled(rename = "Next hop")]
    next_hop: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "Managed")]
    managed: String,
}

impl From<&ListedRoute> for RouteRow {
    fn from(l: &ListedRoute) -> Self {
        Self {
            id: l.route.id.clone(),
            prefix: l.route.prefix.to_string(),
            next_hop: l.route.next_hop.to_string(),
            label: l.route.label.clone(),
            enabled: yes_no(l.route.enabled),
            managed: yes_no(l.managed),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
enum Action {
    Add,
    Remove,
    Hold,
}

#[derive(Serialize)]
struct PlannedChange {
    action: Action,
    prefix: String,
    next_hop: String,
    label: String,
    /// Seconds of grace left for held routes.
    #[serde(skip_serializing_if = "Option::is_none")]
    remaining_secs: Option<u64>,
}

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Prefix")]
    prefix: String,
    #[tabled(rename = "Next hop")]
    next_hop: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Note")]
    note: String,
}

impl From<&PlannedChange> for PlanRow {
    fn from(c: &PlannedChange) -> Self {
        Self {
            action: action_name(c.action).into(),
            prefix: c.prefix.clone(),
            next_hop: c.next_hop.clone(),
            label: c.label.clone(),
            note: c
                .remaining_secs
                .map(|s| {
                    format!(
                        "removed in {} if still absent",
                        humantime::format_duration(std::time::Duration::from_secs(s))
                    )
                })
                .unwrap_or_default(),
        }
    }
}

fn yes_no(flag: bool) -> String {
    String::from(if flag { "yes" } else { "no" })
}

fn action_name(action: Action) -> &'static str {
    match action {
        Action::Add => "add",
        Action::Remove => "remove",
        Action::Hold => "hold",
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: RoutesArgs, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        RoutesCommand::List => list(config, global).await,
        RoutesCommand::Plan(scan_args) => plan(&scan_args, config, global).await,
    }
}

async fn connect(config: &Config) -> Result<UnifiGateway, CliError> {
    if !config.router.enabled {
        return Err(CoreError::RouterDisabled.into());
    }
    let router = config.router.to_router_config()?;
    Ok(UnifiGateway::connect(&router).await?)
}

/// Read the router's routes and release the session either way.
async fn read_routes(gateway: &UnifiGateway) -> Result<Vec<RouterRoute>, CliError> {
    let routes = gateway.list_routes().await;
    gateway.close().await;
    Ok(routes?)
}

async fn list(config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let label_prefix = config.daemon_settings()?.label_prefix;
    let gateway = connect(config).await?;
    let listed: Vec<ListedRoute> = read_routes(&gateway)
        .await?
        .into_iter()
        .map(|route| ListedRoute {
            managed: route.is_managed(&label_prefix),
            route,
        })
        .collect();

    let out = output::render_list(
        &global.output,
        &listed,
        |l| RouteRow::from(l),
        |l| format!("{} {} {}", l.route.id, l.route.prefix, l.route.next_hop),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// What the daemon would do right now. A fresh daemon holds every
/// managed route it does not want for a full grace period, so nothing
/// is ever shown as removed on a first pass.
async fn plan(args: &ScanArgs, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let settings = config.daemon_settings()?;
    let gateway = connect(config).await?;
    let (devices, routers) = scan::discover(args, config).await?;
    let desired = generate_routes(&devices, &routers);
    let current = read_routes(&gateway).await?;

    let mut reconciler = Reconciler::new(settings.grace_period, settings.label_prefix);
    let diff = reconciler.reconcile(&current, &desired, Utc::now());

    let changes: Vec<PlannedChange> = diff
        .to_remove
        .iter()
        .map(|r| PlannedChange {
            action: Action::Remove,
            prefix: r.prefix.to_string(),
            next_hop: r.next_hop.to_string(),
            label: r.label.clone(),
            remaining_secs: None,
        })
        .chain(diff.to_add.iter().map(|r| PlannedChange {
            action: Action::Add,
            prefix: r.prefix.to_string(),
            next_hop: r.next_hop.to_string(),
            label: r.label.clone(),
            remaining_secs: None,
        }))
        .chain(diff.held.iter().map(|h| PlannedChange {
            action: Action::Hold,
            prefix: h.key.prefix.to_string(),
            next_hop: h.key.next_hop.to_string(),
            label: h.label.clone(),
            remaining_secs: Some(h.remaining.as_secs()),
        }))
        .collect();

    if changes.is_empty() && !global.quiet {
        eprintln!("Router routes are up to date");
    }
    let out = output::render_list(
        &global.output,
        &changes,
        |c| PlanRow::from(c),
        |c| format!("{} {} {}", action_name(c.action), c.prefix, c.next_hop),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

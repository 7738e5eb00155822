// ── Daemon lifecycle ──
//
// Background tasks: one discovery monitor per service kind, a periodic
// refresh that prunes stale entries and rescans, and the reconcile loop
// that turns the current snapshot into router changes.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use strum::IntoEnumIterator;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::DaemonConfig;
use crate::discovery::{self, Announcement, DiscoverySource, Registry, ServiceKind, Tracked};
use crate::gateway::RouterGateway;
use crate::generate::generate_routes;
use crate::model::{BorderRouter, DesiredRoute, Device};
use crate::sync::{RouteSync, SyncReport};

/// Point-in-time view of the daemon's state.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub devices: Vec<Tracked<Device>>,
    pub routers: Vec<Tracked<BorderRouter>>,
    pub desired: Vec<DesiredRoute>,
    pub last_sync: Option<Arc<SyncReport>>,
}

/// State shared between the discovery and reconcile tasks.
struct Shared {
    devices: Registry<Device>,
    routers: Registry<BorderRouter>,
    last_sync: watch::Sender<Option<Arc<SyncReport>>>,
}

impl Shared {
    fn record(&self, kind: ServiceKind, ann: Announcement, seen_at: DateTime<Utc>) {
        let (is_new, name, address) = match kind {
            ServiceKind::Matter => {
                let device = Device::new(ann.instance, ann.address);
                let (name, address) = (device.name.clone(), device.address);
                (self.devices.upsert(device, seen_at), name, address)
            }
            ServiceKind::BorderRouter => {
                let router = BorderRouter::new(ann.instance, ann.address);
                let (name, address) = (router.name.clone(), router.address);
                (self.routers.upsert(router, seen_at), name, address)
            }
        };
        if is_new {
            info!(%kind, name = %name, %address, "discovered");
        } else {
            debug!(%kind, name = %name, %address, "refreshed");
        }
    }
}

/// A running daemon. Dropping it without [`shutdown`](Self::shutdown)
/// leaves the tasks running until the runtime stops.
pub struct Daemon<D: DiscoverySource + 'static, G: RouterGateway + 'static> {
    shared: Arc<Shared>,
    discovery: Arc<D>,
    gateway: Option<Arc<G>>,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl<D: DiscoverySource + 'static, G: RouterGateway + 'static> Daemon<D, G> {
    /// Spawn all background tasks. Without a gateway the daemon only
    /// discovers and logs the routes it would want.
    pub fn start(config: DaemonConfig, discovery: Arc<D>, gateway: Option<Arc<G>>) -> Self {
        let (last_sync, _) = watch::channel(None);
        let shared = Arc::new(Shared {
            devices: Registry::new(),
            routers: Registry::new(),
            last_sync,
        });
        let cancel = CancellationToken::new();
        let mut handles = Vec::new();

        for kind in ServiceKind::iter() {
            handles.push(tokio::spawn(monitor_task(
                kind,
                Arc::clone(&shared),
                Arc::clone(&discovery),
                config.scan_timeout,
                cancel.child_token(),
            )));
        }

        if !config.refresh_interval.is_zero() {
            handles.push(tokio::spawn(refresh_task(
                Arc::clone(&shared),
                Arc::clone(&discovery),
                config.clone(),
                cancel.child_token(),
            )));
        }

        let sync = RouteSync::new(
            config.grace_period,
            config.label_prefix.clone(),
            config.settle_delay,
        );
        handles.push(tokio::spawn(reconcile_task(
            Arc::clone(&shared),
            gateway.clone(),
            sync,
            config.reconcile_interval,
            cancel.child_token(),
        )));

        info!(
            grace = %humantime::format_duration(config.grace_period),
            router = gateway.is_some(),
            "daemon started"
        );

        Self {
            shared,
            discovery,
            gateway,
            cancel,
            handles,
        }
    }

    /// Current devices, routers, the routes they imply, and the last
    /// sync outcome.
    pub fn snapshot(&self) -> Snapshot {
        let devices: Vec<Tracked<Device>> = self
            .shared
            .devices
            .snapshot()
            .iter()
            .map(|t| (**t).clone())
            .collect();
        let routers: Vec<Tracked<BorderRouter>> = self
            .shared
            .routers
            .snapshot()
            .iter()
            .map(|t| (**t).clone())
            .collect();
        let desired = generate_routes(
            &devices.iter().map(|t| t.item.clone()).collect::<Vec<_>>(),
            &routers.iter().map(|t| t.item.clone()).collect::<Vec<_>>(),
        );
        Snapshot {
            devices,
            routers,
            desired,
            last_sync: self.shared.last_sync.borrow().clone(),
        }
    }

    /// Stop every task, wait for them, and release the router session.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for result in futures_util::future::join_all(self.handles).await {
            if let Err(e) = result {
                warn!(error = %e, "background task ended abnormally");
            }
        }
        if let Some(gateway) = &self.gateway {
            gateway.close().await;
        }
        self.discovery.shutdown();
        info!("daemon stopped");
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Initial scan, then live announcements until cancelled.
async fn monitor_task<D: DiscoverySource>(
    kind: ServiceKind,
    shared: Arc<Shared>,
    discovery: Arc<D>,
    scan_timeout: Duration,
    cancel: CancellationToken,
) {
    tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        found = discovery.enumerate(kind, scan_timeout) => match found {
            Ok(anns) => {
                info!(%kind, count = anns.len(), "initial scan complete");
                let now = Utc::now();
                for ann in anns {
                    shared.record(kind, ann, now);
                }
            }
            Err(e) => warn!(%kind, error = %e, "initial scan failed"),
        },
    }

    let mut announcements = match discovery.subscribe(kind, cancel.child_token()) {
        Ok(rx) => rx,
        Err(e) => {
            error!(%kind, error = %e, "cannot listen for announcements");
            return;
        }
    };

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            ann = announcements.recv() => match ann {
                Some(ann) => shared.record(kind, ann, Utc::now()),
                None => {
                    warn!(%kind, "announcement stream ended");
                    break;
                }
            },
        }
    }
}

/// Prune entries not seen within `device_expiration`, then rescan to
/// catch anything the live listener missed.
async fn refresh_task<D: DiscoverySource>(
    shared: Arc<Shared>,
    discovery: Arc<D>,
    config: DaemonConfig,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(config.refresh_interval);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let now = Utc::now();
                if let Some(cutoff) = cutoff(now, config.device_expiration) {
                    let devices = shared.devices.prune_older_than(cutoff);
                    let routers = shared.routers.prune_older_than(cutoff);
                    if devices > 0 || routers > 0 {
                        info!(devices, routers, "removed expired discovery entries");
                    }
                }

                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    found = discovery::scan(discovery.as_ref(), config.scan_timeout) => match found {
                        Ok((devices, routers)) => {
                            debug!(devices = devices.len(), routers = routers.len(), "periodic rescan");
                            let now = Utc::now();
                            for d in devices {
                                shared.record(ServiceKind::Matter, Announcement { instance: d.name, address: d.address }, now);
                            }
                            for r in routers {
                                shared.record(ServiceKind::BorderRouter, Announcement { instance: r.name, address: r.address }, now);
                            }
                        }
                        Err(e) => warn!(error = %e, "periodic rescan failed"),
                    },
                }
            }
        }
    }
}

/// Generate desired routes from the current snapshot and, with a
/// gateway, apply them.
async fn reconcile_task<G: RouterGateway>(
    shared: Arc<Shared>,
    gateway: Option<Arc<G>>,
    mut sync: RouteSync,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let devices = shared.devices.items();
                let routers = shared.routers.items();
                let desired = generate_routes(&devices, &routers);
                debug!(
                    devices = devices.len(),
                    routers = routers.len(),
                    routes = desired.len(),
                    "discovery state"
                );
                for route in &desired {
                    debug!(prefix = %route.prefix, next_hop = %route.next_hop, router = %route.router_name, "desired route");
                }

                let Some(gateway) = gateway.as_deref() else {
                    continue;
                };

                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    outcome = sync.run_pass(gateway, &desired, Utc::now()) => match outcome {
                        Ok(report) => {
                            log_report(&report, devices.len(), routers.len(), desired.len());
                            shared.last_sync.send_replace(Some(Arc::new(report)));
                        }
                        Err(e) => warn!(error = %e, "router update skipped"),
                    },
                }
            }
        }
    }
}

fn log_report(report: &SyncReport, devices: usize, routers: usize, desired: usize) {
    if report.is_noop() && report.held.is_empty() {
        debug!(devices, routers, desired, "routes up to date");
        return;
    }
    info!(
        devices,
        routers,
        desired,
        added = report.added.len(),
        removed = report.removed.len(),
        failed = report.failed_adds.len() + report.failed_deletes.len(),
        held = report.held.len(),
        "route update"
    );
    for held in &report.held {
        info!(
            route = %held.key,
            remaining = %humantime::format_duration(Duration::from_secs(held.remaining.as_secs())),
            first_sighting = held.first_sighting,
            "route within grace period, not removing"
        );
    }
}

fn cutoff(now: DateTime<Utc>, age: Duration) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(TimeDelta::from_std(age).ok()?)
}

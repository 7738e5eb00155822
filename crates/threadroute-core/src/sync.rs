// ── Route application ──
//
// One reconciliation pass against a live gateway: read the router's
// routes (recovering the session once), diff them, delete what has
// outlived its grace, then add what is missing.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::gateway::{GatewayError, RouterGateway};
use crate::model::{DesiredRoute, RouteKey, RouterRoute};
use crate::reconcile::{GraceTracker, HeldRoute, Reconciler, elapsed};

/// A route operation the router refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedRoute {
    pub key: RouteKey,
    pub error: String,
}

/// What one pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub added: Vec<RouteKey>,
    /// Deleted, or found already gone.
    pub removed: Vec<RouteKey>,
    /// Missing on the router but submitted recently; not sent again.
    pub pending: Vec<RouteKey>,
    pub failed_adds: Vec<FailedRoute>,
    pub failed_deletes: Vec<FailedRoute>,
    pub held: Vec<HeldRoute>,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.failed_adds.is_empty()
            && self.failed_deletes.is_empty()
    }
}

/// Owns reconciliation state across passes.
///
/// Besides the grace tracker this keeps the set of routes already
/// submitted, so an add the router has not yet reflected in its listing
/// is not posted twice.
#[derive(Debug)]
pub struct RouteSync {
    reconciler: Reconciler,
    submitted: HashMap<RouteKey, DateTime<Utc>>,
    settle_delay: Duration,
}

impl RouteSync {
    pub fn new(grace_period: Duration, label_prefix: impl Into<String>, settle_delay: Duration) -> Self {
        Self {
            reconciler: Reconciler::new(grace_period, label_prefix),
            submitted: HashMap::new(),
            settle_delay,
        }
    }

    pub fn tracker(&self) -> &GraceTracker {
        self.reconciler.tracker()
    }

    pub fn is_submitted(&self, key: &RouteKey) -> bool {
        self.submitted.contains_key(key)
    }

    /// Run one pass as of `now`.
    ///
    /// An `Err` means the router could not be listed and the pass was
    /// skipped; no state changed.
    pub async fn run_pass<G: RouterGateway>(
        &mut self,
        gateway: &G,
        desired: &[DesiredRoute],
        now: DateTime<Utc>,
    ) -> Result<SyncReport, GatewayError> {
        let current = list_with_recovery(gateway).await?;

        self.expire_submitted(&current, desired, now);
        let diff = self.reconciler.reconcile(&current, desired, now);

        let mut report = SyncReport {
            held: diff.held,
            ..SyncReport::default()
        };

        for route in &diff.to_remove {
            self.remove(gateway, route, &mut report).await;
        }

        for route in &diff.to_add {
            let key = route.key();
            if self.submitted.contains_key(&key) {
                debug!(route = %key, "add already submitted, waiting for router");
                report.pending.push(key);
                continue;
            }
            match gateway.add_route(route).await {
                Ok(()) => {
                    info!(route = %key, label = %route.label, "added route");
                    self.submitted.insert(key, now);
                    report.added.push(key);
                }
                Err(e) => {
                    warn!(route = %key, error = %e, "failed to add route");
                    report.failed_adds.push(FailedRoute {
                        key,
                        error: e.to_string(),
                    });
                }
            }
        }

        if !report.added.is_empty() && !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        Ok(report)
    }

    async fn remove<G: RouterGateway>(
        &mut self,
        gateway: &G,
        route: &RouterRoute,
        report: &mut SyncReport,
    ) {
        let key = route.key();
        match gateway.delete_route(&route.id).await {
            Ok(()) => {
                info!(route = %key, id = %route.id, "deleted route");
            }
            Err(e) if e.is_not_found() => {
                info!(route = %key, id = %route.id, "route already gone, dropping from tracking");
            }
            Err(e) => {
                warn!(route = %key, id = %route.id, error = %e, "failed to delete route");
                report.failed_deletes.push(FailedRoute {
                    key,
                    error: e.to_string(),
                });
                return;
            }
        }
        self.reconciler.tracker_mut().forget(&key);
        self.submitted.remove(&key);
        report.removed.push(key);
    }

    /// Forget submissions the router now shows, that never showed up
    /// within a grace period, or that are no longer wanted.
    fn expire_submitted(&mut self, current: &[RouterRoute], desired: &[DesiredRoute], now: DateTime<Utc>) {
        let visible: HashSet<RouteKey> = current.iter().map(RouterRoute::key).collect();
        let wanted: HashSet<RouteKey> = desired.iter().map(DesiredRoute::key).collect();
        let grace = self.reconciler.grace_period();
        self.submitted.retain(|key, at| {
            !visible.contains(key) && wanted.contains(key) && elapsed(now, *at) < grace
        });
    }
}

/// List routes; on a stale session refresh it and try once more.
async fn list_with_recovery<G: RouterGateway>(gateway: &G) -> Result<Vec<RouterRoute>, GatewayError> {
    match gateway.list_routes().await {
        Ok(routes) => Ok(routes),
        Err(GatewayError::TransientAuth { message }) => {
            info!(reason = %message, "router session rejected, re-authenticating");
            gateway.invalidate_session().await;
            gateway.list_routes().await
        }
        Err(e @ GatewayError::RateLimited { .. }) => {
            warn!(error = %e, "router rate limit reached, skipping this cycle");
            gateway.invalidate_session().await;
            Err(e)
        }
        Err(e) => Err(e),
    }
}

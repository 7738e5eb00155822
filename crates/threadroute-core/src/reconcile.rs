// ── Route reconciliation ──
//
// Diffs the desired routes against what the router carries, holding
// managed routes for a grace period after they stop being desired.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{DesiredRoute, RouteKey, RouterRoute};

/// Time elapsed between `since` and `now`; clock steps backwards count as zero.
pub(crate) fn elapsed(now: DateTime<Utc>, since: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or_default()
}

/// Last time each route was confirmed desired.
///
/// Lives for the process lifetime only.
#[derive(Debug, Default, Clone)]
pub struct GraceTracker {
    last_desired: HashMap<RouteKey, DateTime<Utc>>,
}

impl GraceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_desired(&self, key: &RouteKey) -> Option<DateTime<Utc>> {
        self.last_desired.get(key).copied()
    }

    /// Record that `key` is desired as of `now`.
    pub fn touch(&mut self, key: RouteKey, now: DateTime<Utc>) {
        self.last_desired.insert(key, now);
    }

    /// Drop `key`, e.g. once its route is gone from the router.
    pub fn forget(&mut self, key: &RouteKey) -> bool {
        self.last_desired.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.last_desired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_desired.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RouteKey, &DateTime<Utc>)> {
        self.last_desired.iter()
    }
}

/// A managed route kept on the router although it is no longer desired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeldRoute {
    pub key: RouteKey,
    pub label: String,
    /// Grace left before the route becomes eligible for removal.
    pub remaining: Duration,
    /// The route had no history in this process and was just seeded.
    pub first_sighting: bool,
}

/// Outcome of one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteDiff {
    /// Routes to create, labelled and enabled.
    pub to_add: Vec<RouterRoute>,
    /// Managed routes whose grace has run out. These carry router ids.
    pub to_remove: Vec<RouterRoute>,
    pub held: Vec<HeldRoute>,
}

impl RouteDiff {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Owns the grace tracker and the rules for what may be added or removed.
#[derive(Debug, Clone)]
pub struct Reconciler {
    grace_period: Duration,
    label_prefix: String,
    tracker: GraceTracker,
}

impl Reconciler {
    /// `label_prefix` is both the start of every label this system writes
    /// and the marker that makes a router route eligible for removal.
    pub fn new(grace_period: Duration, label_prefix: impl Into<String>) -> Self {
        Self {
            grace_period,
            label_prefix: label_prefix.into(),
            tracker: GraceTracker::new(),
        }
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    pub fn label_prefix(&self) -> &str {
        &self.label_prefix
    }

    pub fn tracker(&self) -> &GraceTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut GraceTracker {
        &mut self.tracker
    }

    /// Compare `current` against `desired` as of `now`.
    ///
    /// Only routes carrying the label marker are ever removed. A managed
    /// route with no tracker history is seeded with `now` and held for a
    /// full grace period; one whose last desire is at least
    /// `grace_period` old is removed. Every desired key is refreshed in
    /// the tracker.
    pub fn reconcile(
        &mut self,
        current: &[RouterRoute],
        desired: &[DesiredRoute],
        now: DateTime<Utc>,
    ) -> RouteDiff {
        let desired_by_key: BTreeMap<RouteKey, &DesiredRoute> =
            desired.iter().map(|d| (d.key(), d)).collect();

        let mut diff = RouteDiff::default();

        for route in current {
            let key = route.key();
            if desired_by_key.contains_key(&key) || !route.is_managed(&self.label_prefix) {
                continue;
            }

            let Some(last) = self.tracker.last_desired(&key) else {
                self.tracker.touch(key, now);
                diff.held.push(HeldRoute {
                    key,
                    label: route.label.clone(),
                    remaining: self.grace_period,
                    first_sighting: true,
                });
                continue;
            };

            let age = elapsed(now, last);
            if age < self.grace_period {
                diff.held.push(HeldRoute {
                    key,
                    label: route.label.clone(),
                    remaining: self.grace_period - age,
                    first_sighting: false,
                });
            } else {
                diff.to_remove.push(route.clone());
            }
        }

        for key in desired_by_key.keys() {
            self.tracker.touch(*key, now);
        }

        let present: HashSet<RouteKey> = current.iter().map(RouterRoute::key).collect();
        diff.to_add = desired_by_key
            .iter()
            .filter(|(key, _)| !present.contains(key))
            .map(|(_, d)| d.to_router_route(&self.label_prefix))
            .collect();

        diff
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::Ipv6Addr;

    use chrono::TimeDelta;
    use cidr::Ipv6Cidr;
    use pretty_assertions::assert_eq;

    use super::*;

    const MARKER: &str = "Thread route via";
    const GRACE: Duration = Duration::from_secs(600);

    fn now() -> DateTime<Utc> {
        "2026-03-01T12:00:00Z".parse().unwrap()
    }

    fn desired(prefix: &str, hop: &str) -> DesiredRoute {
        DesiredRoute {
            prefix: prefix.parse::<Ipv6Cidr>().unwrap(),
            next_hop: hop.parse::<Ipv6Addr>().unwrap(),
            router_name: "Kitchen".into(),
        }
    }

    fn on_router(id: &str, prefix: &str, hop: &str, label: &str) -> RouterRoute {
        RouterRoute {
            id: id.into(),
            prefix: prefix.parse().unwrap(),
            next_hop: hop.parse().unwrap(),
            label: label.into(),
            enabled: true,
        }
    }

    fn managed(id: &str, prefix: &str, hop: &str) -> RouterRoute {
        on_router(id, prefix, hop, "Thread route via Kitchen")
    }

    #[test]
    fn never_seen_route_is_seeded_not_removed() {
        let mut rec = Reconciler::new(GRACE, MARKER);
        let stale = managed("b", "fd00:aaaa::/64", "2001:4860:4860:1234::ff");

        let diff = rec.reconcile(std::slice::from_ref(&stale), &[], now());

        assert!(diff.to_remove.is_empty());
        assert_eq!(rec.tracker().last_desired(&stale.key()), Some(now()));
        assert_eq!(diff.held.len(), 1);
        assert!(diff.held[0].first_sighting);
        assert_eq!(diff.held[0].remaining, GRACE);
    }

    #[test]
    fn blank_marker_never_removes_manual_routes() {
        let mut rec = Reconciler::new(GRACE, "  ".trim());
        let manual = on_router("m", "fd00:bbbb::/64", "2001:4860:4860:1234::ff", "office vpn (hand-made)");

        let first = rec.reconcile(std::slice::from_ref(&manual), &[], now());
        let later = rec.reconcile(
            std::slice::from_ref(&manual),
            &[],
            now() + TimeDelta::seconds(601),
        );

        assert!(first.to_remove.is_empty() && first.held.is_empty());
        assert!(later.to_remove.is_empty() && later.held.is_empty());
        assert_eq!(rec.tracker().last_desired(&manual.key()), None);
    }

    #[test]
    fn grace_boundaries() {
        let route = managed("b", "fd00:aaaa::/64", "2001:4860:4860:1234::ff");

        let mut within = Reconciler::new(GRACE, MARKER);
        within
            .tracker_mut()
            .touch(route.key(), now() - TimeDelta::seconds(599));
        let diff = within.reconcile(std::slice::from_ref(&route), &[], now());
        assert!(diff.to_remove.is_empty());
        assert_eq!(diff.held[0].remaining, Duration::from_secs(1));

        let mut expired = Reconciler::new(GRACE, MARKER);
        expired
            .tracker_mut()
            .touch(route.key(), now() - TimeDelta::seconds(601));
        let diff = expired.reconcile(std::slice::from_ref(&route), &[], now());
        assert_eq!(diff.to_remove, vec![route.clone()]);

        let mut exact = Reconciler::new(GRACE, MARKER);
        exact
            .tracker_mut()
            .touch(route.key(), now() - TimeDelta::seconds(600));
        let diff = exact.reconcile(std::slice::from_ref(&route), &[], now());
        assert_eq!(diff.to_remove.len(), 1);
    }

    #[test]
    fn future_timestamps_count_as_fresh() {
        let route = managed("b", "fd00:aaaa::/64", "2001:4860:4860:1234::ff");
        let mut rec = Reconciler::new(GRACE, MARKER);
        rec.tracker_mut()
            .touch(route.key(), now() + TimeDelta::seconds(30));

        let diff = rec.reconcile(std::slice::from_ref(&route), &[], now());
        assert!(diff.to_remove.is_empty());
        assert_eq!(diff.held[0].remaining, GRACE);
    }

    #[test]
    fn present_and_desired_is_untouched() {
        let mut rec = Reconciler::new(GRACE, MARKER);
        let want = desired("fd00:1111:2222:3333::/64", "2001:4860:4860:1234::ff");
        let have = managed("a", "fd00:1111:2222:3333::/64", "2001:4860:4860:1234::ff");

        let diff = rec.reconcile(&[have], std::slice::from_ref(&want), now());

        assert!(diff.is_empty());
        assert!(diff.held.is_empty());
        assert_eq!(rec.tracker().last_desired(&want.key()), Some(now()));
    }

    #[test]
    fn unmanaged_routes_are_never_removed() {
        let mut rec = Reconciler::new(GRACE, MARKER);
        let manual = on_router("m", "fd00:aaaa::/64", "2001:4860:4860:1234::ff", "office vpn");
        rec.tracker_mut()
            .touch(manual.key(), now() - TimeDelta::hours(5));

        let diff = rec.reconcile(&[manual], &[], now());

        assert!(diff.to_remove.is_empty());
        assert!(diff.held.is_empty());
    }

    #[test]
    fn unmanaged_route_with_desired_key_suppresses_add() {
        let mut rec = Reconciler::new(GRACE, MARKER);
        let want = desired("fd00:1111:2222:3333::/64", "2001:4860:4860:1234::ff");
        let manual = on_router("m", "fd00:1111:2222:3333::/64", "2001:4860:4860:1234::ff", "by hand");

        let diff = rec.reconcile(&[manual], &[want], now());
        assert!(diff.to_add.is_empty());
    }

    #[test]
    fn mixed_scenario_adds_new_and_removes_expired() {
        let mut rec = Reconciler::new(GRACE, MARKER);

        let a = managed("a", "fd00:1111:2222:3333::/64", "2001:4860:4860:1234::ff");
        let b = managed("b", "fd00:4444:5555:6666::/64", "2001:4860:4860:1234::ff");
        rec.tracker_mut()
            .touch(a.key(), now() - TimeDelta::minutes(5));
        rec.tracker_mut()
            .touch(b.key(), now() - TimeDelta::minutes(15));

        let want_a = desired("fd00:1111:2222:3333::/64", "2001:4860:4860:1234::ff");
        let want_c = desired("fd00:7777:8888:9999::/64", "2001:4860:4860:1234::fe");

        let diff = rec.reconcile(&[a.clone(), b.clone()], &[want_a, want_c.clone()], now());

        assert_eq!(diff.to_remove, vec![b]);
        assert_eq!(diff.to_add.len(), 1);
        let added = &diff.to_add[0];
        assert_eq!(added.key(), want_c.key());
        assert_eq!(added.label, "Thread route via Kitchen");
        assert!(added.enabled);
        assert!(added.id.is_empty());
        assert_eq!(rec.tracker().last_desired(&a.key()), Some(now()));
    }

    #[test]
    fn duplicate_desired_routes_add_once() {
        let mut rec = Reconciler::new(GRACE, MARKER);
        let want = desired("fd00:1111:2222:3333::/64", "2001:4860:4860:1234::ff");

        let diff = rec.reconcile(&[], &[want.clone(), want], now());
        assert_eq!(diff.to_add.len(), 1);
        assert_eq!(rec.tracker().len(), 1);
    }
}

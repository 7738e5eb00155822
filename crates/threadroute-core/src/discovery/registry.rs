// ── Discovery registry ──
//
// Concurrent store of discovered endpoints keyed by (name, address).
// Listeners upsert while the reconcile task reads whole snapshots; a
// reader never sees a half-applied update.

use std::net::Ipv6Addr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::watch;

use crate::model::{BorderRouter, Device};

/// Anything the registry can key by `(name, address)`.
pub trait Discovered: Clone + Send + Sync + 'static {
    fn name(&self) -> &str;
    fn address(&self) -> Ipv6Addr;
}

impl Discovered for Device {
    fn name(&self) -> &str {
        &self.name
    }

    fn address(&self) -> Ipv6Addr {
        self.address
    }
}

impl Discovered for BorderRouter {
    fn name(&self) -> &str {
        &self.name
    }

    fn address(&self) -> Ipv6Addr {
        self.address
    }
}

/// A registry entry with the time it was last announced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tracked<T> {
    #[serde(flatten)]
    pub item: T,
    pub last_seen: DateTime<Utc>,
}

type Key = (String, Ipv6Addr);
type Snapshot<T> = Arc<Vec<Arc<Tracked<T>>>>;

/// `DashMap` storage plus a `watch` snapshot rebuilt on every mutation.
pub struct Registry<T: Discovered> {
    by_key: DashMap<Key, Arc<Tracked<T>>>,
    snapshot: watch::Sender<Snapshot<T>>,
}

impl<T: Discovered> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Discovered> Registry<T> {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            by_key: DashMap::new(),
            snapshot,
        }
    }

    /// Insert or replace the entry for `item`'s key, stamped `seen_at`.
    /// Returns `true` if the key was new.
    pub fn upsert(&self, item: T, seen_at: DateTime<Utc>) -> bool {
        let key = (item.name().to_owned(), item.address());
        let is_new = self
            .by_key
            .insert(
                key,
                Arc::new(Tracked {
                    item,
                    last_seen: seen_at,
                }),
            )
            .is_none();
        self.rebuild_snapshot();
        is_new
    }

    /// Drop entries last seen before `cutoff`. Returns how many went.
    pub fn prune_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        // Counted in place: `len()` before and after would miss removals
        // offset by concurrent inserts.
        let mut removed = 0;
        self.by_key.retain(|_, entry| {
            let keep = entry.last_seen >= cutoff;
            if !keep {
                removed += 1;
            }
            keep
        });
        if removed > 0 {
            self.rebuild_snapshot();
        }
        removed
    }

    /// Current entries, sorted by name then address (cheap `Arc` clone).
    pub fn snapshot(&self) -> Snapshot<T> {
        self.snapshot.borrow().clone()
    }

    /// Current items without their timestamps.
    pub fn items(&self) -> Vec<T> {
        self.snapshot().iter().map(|t| t.item.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Collect under the `watch` lock so concurrent rebuilds publish in
    /// order: the last one to run has seen every completed mutation.
    fn rebuild_snapshot(&self) {
        self.snapshot.send_modify(|snap| {
            let mut values: Vec<Arc<Tracked<T>>> =
                self.by_key.iter().map(|r| Arc::clone(r.value())).collect();
            values.sort_by(|a, b| {
                a.item
                    .name()
                    .cmp(b.item.name())
                    .then_with(|| a.item.address().cmp(&b.item.address()))
            });
            *snap = Arc::new(values);
        });
    }
}

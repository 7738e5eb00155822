// ── Service discovery ──
//
// Where devices and border routers come from. A `DiscoverySource` yields
// `(instance, address)` announcements for a service kind; `Registry`
// holds what has been seen, with last-seen times for pruning.

pub mod mdns;
pub mod registry;

use std::future::Future;
use std::net::{IpAddr, Ipv6Addr};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::CoreError;
use crate::model::{BorderRouter, Device};

pub use mdns::MdnsDiscovery;
pub use registry::{Registry, Tracked};

/// The two DNS-SD service types this system listens for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::EnumIter,
)]
pub enum ServiceKind {
    /// Matter end-devices (`_matter._tcp`).
    #[strum(serialize = "matter")]
    Matter,
    /// Thread border routers (`_meshcop._udp`).
    #[strum(serialize = "border-router")]
    BorderRouter,
}

impl ServiceKind {
    /// Fully qualified DNS-SD service type.
    pub fn service_type(self) -> &'static str {
        match self {
            Self::Matter => "_matter._tcp.local.",
            Self::BorderRouter => "_meshcop._udp.local.",
        }
    }
}

/// One resolved `(instance, IPv6 address)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    /// Instance name with the service suffix and DNS-SD escapes removed.
    pub instance: String,
    pub address: Ipv6Addr,
}

impl Announcement {
    /// Keep only real IPv6 addresses: IPv4 and IPv4-mapped are dropped.
    pub fn from_ip(instance: impl Into<String>, ip: IpAddr) -> Option<Self> {
        match ip {
            IpAddr::V6(address) if address.to_ipv4_mapped().is_none() => Some(Self {
                instance: instance.into(),
                address,
            }),
            _ => None,
        }
    }
}

/// Something that can find Matter devices and Thread border routers.
pub trait DiscoverySource: Send + Sync {
    /// One-shot scan: everything that resolves within `timeout`.
    fn enumerate(
        &self,
        kind: ServiceKind,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<Announcement>, CoreError>> + Send;

    /// Live announcements until `cancel` fires, then the channel closes.
    fn subscribe(
        &self,
        kind: ServiceKind,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<Announcement>, CoreError>;

    /// Stop any background machinery. Called once on daemon shutdown.
    fn shutdown(&self) {}
}

/// Discover both kinds concurrently and convert to domain types.
pub async fn scan<D: DiscoverySource>(
    source: &D,
    timeout: Duration,
) -> Result<(Vec<Device>, Vec<BorderRouter>), CoreError> {
    let (devices, routers) = tokio::join!(
        source.enumerate(ServiceKind::Matter, timeout),
        source.enumerate(ServiceKind::BorderRouter, timeout),
    );
    let devices = devices?
        .into_iter()
        .map(|a| Device::new(a.instance, a.address))
        .collect();
    let routers = routers?
        .into_iter()
        .map(|a| BorderRouter::new(a.instance, a.address))
        .collect();
    Ok((devices, routers))
}

// ── Instance names ──────────────────────────────────────────────────

/// Human-readable instance name from a DNS-SD full name.
///
/// `Living\ Room\ TV._meshcop._udp.local.` becomes `Living Room TV`.
/// When `fullname` does not end in `service_type` the name is cut at the
/// first unescaped dot instead.
pub fn instance_name(fullname: &str, service_type: &str) -> String {
    let suffix = format!(".{}", service_type.trim_start_matches('.'));
    let raw = fullname
        .strip_suffix(&suffix)
        .or_else(|| fullname.strip_suffix(suffix.trim_end_matches('.')))
        .unwrap_or_else(|| until_unescaped_dot(fullname));
    unescape(raw)
}

fn until_unescaped_dot(s: &str) -> &str {
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '.' => return &s[..i],
            _ => {}
        }
    }
    s
}

/// Remove DNS-SD escapes: `\X` is `X` and `\DDD` is the byte `DDD`.
pub fn unescape(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while let Some(&b) = bytes.get(i) {
        if b != b'\\' {
            out.push(b);
            i += 1;
            continue;
        }
        let digits = bytes.get(i + 1..i + 4).filter(|d| d.iter().all(u8::is_ascii_digit));
        if let Some(value) = digits
            .and_then(|d| std::str::from_utf8(d).ok())
            .and_then(|d| d.parse::<u8>().ok())
        {
            out.push(value);
            i += 4;
        } else if let Some(&next) = bytes.get(i + 1) {
            out.push(next);
            i += 2;
        } else {
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

//! mDNS discovery source using mdns-sd.
//!
//! One-shot scans run on their own short-lived daemon so they never
//! disturb a long-lived browse for the same service type.

use std::collections::HashSet;
use std::time::Duration;

use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::{Announcement, DiscoverySource, ServiceKind, instance_name};
use crate::error::CoreError;

const SUBSCRIBE_BUFFER: usize = 64;

pub struct MdnsDiscovery {
    daemon: ServiceDaemon,
}

impl MdnsDiscovery {
    pub fn new() -> Result<Self, CoreError> {
        Ok(Self {
            daemon: start_daemon()?,
        })
    }
}

fn start_daemon() -> Result<ServiceDaemon, CoreError> {
    ServiceDaemon::new().map_err(|e| CoreError::Discovery {
        message: format!("failed to start mDNS daemon: {e}"),
    })
}

fn announcements(kind: ServiceKind, info: &ServiceInfo) -> Vec<Announcement> {
    let instance = instance_name(info.get_fullname(), kind.service_type());
    info.get_addresses()
        .iter()
        .filter_map(|ip| Announcement::from_ip(instance.clone(), *ip))
        .collect()
}

impl DiscoverySource for MdnsDiscovery {
    async fn enumerate(
        &self,
        kind: ServiceKind,
        timeout: Duration,
    ) -> Result<Vec<Announcement>, CoreError> {
        let service_type = kind.service_type();
        let daemon = start_daemon()?;
        let events = daemon.browse(service_type).map_err(|e| CoreError::Discovery {
            message: format!("browse {service_type} failed: {e}"),
        })?;

        let deadline = Instant::now() + timeout;
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        loop {
            match tokio::time::timeout_at(deadline, events.recv_async()).await {
                Ok(Ok(ServiceEvent::ServiceResolved(info))) => {
                    for ann in announcements(kind, &info) {
                        if seen.insert((ann.instance.clone(), ann.address)) {
                            found.push(ann);
                        }
                    }
                }
                Ok(Ok(other)) => trace!(?other, "mDNS event"),
                Ok(Err(_)) => {
                    debug!(%kind, "mDNS browse channel closed early");
                    break;
                }
                Err(_) => break,
            }
        }

        if let Err(e) = daemon.stop_browse(service_type) {
            trace!(error = %e, "stop_browse failed");
        }
        if let Err(e) = daemon.shutdown() {
            trace!(error = %e, "mDNS daemon shutdown failed");
        }

        debug!(%kind, count = found.len(), "scan complete");
        Ok(found)
    }

    fn subscribe(
        &self,
        kind: ServiceKind,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<Announcement>, CoreError> {
        let service_type = kind.service_type();
        let events = self
            .daemon
            .browse(service_type)
            .map_err(|e| CoreError::Discovery {
                message: format!("browse {service_type} failed: {e}"),
            })?;

        let (tx, rx) = mpsc::channel(SUBSCRIBE_BUFFER);
        let daemon = self.daemon.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    event = events.recv_async() => match event {
                        Ok(ServiceEvent::ServiceResolved(info)) => {
                            let mut closed = false;
                            for ann in announcements(kind, &info) {
                                if tx.send(ann).await.is_err() {
                                    closed = true;
                                    break;
                                }
                            }
                            if closed {
                                break;
                            }
                        }
                        Ok(ServiceEvent::ServiceRemoved(_, fullname)) => {
                            debug!(%kind, fullname = %fullname, "service removed");
                        }
                        Ok(_) => {}
                        Err(_) => {
                            warn!(%kind, "mDNS browse channel closed");
                            break;
                        }
                    },
                }
            }
            if let Err(e) = daemon.stop_browse(service_type) {
                trace!(error = %e, "stop_browse failed");
            }
        });

        Ok(rx)
    }

    fn shutdown(&self) {
        if let Err(e) = self.daemon.shutdown() {
            debug!(error = %e, "mDNS daemon shutdown failed");
        }
    }
}

//! `run`: the long-lived daemon.

use std::future::Future;
use std::sync::Arc;

use threadroute_config::Config;
use threadroute_core::{Daemon, MdnsDiscovery, UnifiGateway};
use tracing::{info, warn};

use crate::error::CliError;

pub async fn handle(config: &Config) -> Result<(), CliError> {
    let settings = config.to_daemon_config()?;
    let shutdown = shutdown_signal()?;

    let gateway = match &settings.router {
        Some(router) => {
            info!(url = %router.url, site = %router.site, "router integration enabled");
            Some(Arc::new(UnifiGateway::connect(router).await?))
        }
        None => {
            warn!("router integration disabled, desired routes will only be logged");
            None
        }
    };
    let discovery = Arc::new(MdnsDiscovery::new()?);

    info!("monitoring for Matter devices and Thread border routers");
    let daemon = Daemon::start(settings, discovery, gateway);

    let signal = shutdown.await;
    info!(signal, "shutting down");
    daemon.shutdown().await;
    Ok(())
}

/// Listen for SIGINT and SIGTERM; the future names whichever came first.
#[cfg(unix)]
fn shutdown_signal() -> std::io::Result<impl Future<Output = &'static str>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = tokio::signal::ctrl_c() => "SIGINT",
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> std::io::Result<impl Future<Output = &'static str>> {
    Ok(async {
        let _ = tokio::signal::ctrl_c().await;
        "SIGINT"
    })
}

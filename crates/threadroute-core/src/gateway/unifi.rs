// UniFi router gateway
//
// Adapts `RouterClient` to the `RouterGateway` capability. The session
// is explicit state here: a login timestamp behind a mutex, refreshed
// when missing or too old and dropped on request.

use std::net::Ipv6Addr;
use std::time::Duration;

use cidr::Ipv6Inet;
use secrecy::SecretString;
use threadroute_api::{ControllerPlatform, RouterClient, StaticRoute};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{GatewayError, RouterGateway};
use crate::config::RouterConfig;
use crate::model::RouterRoute;

/// Static-route gateway backed by a UniFi router's legacy API.
pub struct UnifiGateway {
    client: RouterClient,
    username: String,
    password: SecretString,
    session_max_age: Duration,
    gateway_device: Option<String>,
    /// When the current session was established; `None` when logged out.
    session: Mutex<Option<Instant>>,
}

impl UnifiGateway {
    /// Build the HTTP client and resolve the platform.
    ///
    /// With no platform configured the router is probed; if the probe
    /// fails, UniFi OS is assumed and the first request will tell.
    pub async fn connect(config: &RouterConfig) -> Result<Self, GatewayError> {
        let transport = config.transport();
        let platform = match config.platform {
            Some(platform) => platform,
            None => match RouterClient::detect_platform(&config.url, &transport).await {
                Ok(platform) => {
                    debug!(%platform, "detected router platform");
                    platform
                }
                Err(e) => {
                    warn!(error = %e, "platform detection failed, assuming UniFi OS");
                    ControllerPlatform::UnifiOs
                }
            },
        };

        let client = RouterClient::new(config.url.clone(), config.site.clone(), platform, &transport)?;
        Ok(Self::with_client(client, config))
    }

    /// Wrap an existing client (tests, custom transports).
    pub fn with_client(client: RouterClient, config: &RouterConfig) -> Self {
        Self {
            client,
            username: config.username.clone(),
            password: config.password.clone(),
            session_max_age: config.session_max_age,
            gateway_device: config.gateway_device.clone(),
            session: Mutex::new(None),
        }
    }

    /// Log in unless a session younger than `session_max_age` exists.
    pub async fn ensure_session(&self) -> Result<(), GatewayError> {
        let mut session = self.session.lock().await;
        match *session {
            Some(since) if since.elapsed() <= self.session_max_age => {
                debug!(age = ?since.elapsed(), "reusing router session");
                return Ok(());
            }
            Some(since) => info!(
                age = %humantime::format_duration(Duration::from_secs(since.elapsed().as_secs())),
                "router session expired, logging in again"
            ),
            None => info!("logging in to router"),
        }

        self.client
            .login(&self.username, &self.password)
            .await
            .map_err(login_error)?;
        *session = Some(Instant::now());
        Ok(())
    }

    pub async fn has_session(&self) -> bool {
        self.session.lock().await.is_some()
    }
}

impl RouterGateway for UnifiGateway {
    async fn list_routes(&self) -> Result<Vec<RouterRoute>, GatewayError> {
        self.ensure_session().await?;
        let raw = self.client.list_static_routes().await?;
        let total = raw.len();
        let routes: Vec<RouterRoute> = raw.into_iter().filter_map(to_router_route).collect();
        debug!(total, ipv6 = routes.len(), "read router routes");
        Ok(routes)
    }

    async fn add_route(&self, route: &RouterRoute) -> Result<(), GatewayError> {
        self.ensure_session().await?;
        let body = StaticRoute::nexthop(
            route.label.clone(),
            route.prefix.to_string(),
            route.next_hop.to_string(),
            self.gateway_device.clone(),
        );
        self.client.create_static_route(&body).await?;
        Ok(())
    }

    async fn delete_route(&self, id: &str) -> Result<(), GatewayError> {
        self.ensure_session().await?;
        self.client.delete_static_route(id).await?;
        Ok(())
    }

    async fn invalidate_session(&self) {
        debug!("dropping router session");
        *self.session.lock().await = None;
    }

    async fn close(&self) {
        let mut session = self.session.lock().await;
        if session.take().is_some() {
            if let Err(e) = self.client.logout().await {
                warn!(error = %e, "logout failed (non-fatal)");
            }
        }
    }
}

/// Login failures are not a stale session: retrying at once would only
/// burn attempts against the router's lockout.
fn login_error(err: threadroute_api::Error) -> GatewayError {
    match err {
        threadroute_api::Error::Authentication { message } => GatewayError::LoginRefused { message },
        other => other.into(),
    }
}

/// Keep only IPv6 routes with an id; anything else is not ours to manage.
fn to_router_route(route: StaticRoute) -> Option<RouterRoute> {
    let id = route.id.filter(|id| !id.is_empty())?;
    let prefix = route.network.trim().parse::<Ipv6Inet>().ok()?.network();
    let next_hop = route.nexthop.trim().parse::<Ipv6Addr>().ok()?;
    Some(RouterRoute {
        id,
        prefix,
        next_hop,
        label: route.name,
        enabled: route.enabled,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn raw(id: Option<&str>, network: &str, nexthop: &str) -> StaticRoute {
        StaticRoute {
            id: id.map(str::to_owned),
            ..StaticRoute::nexthop("Thread route via Kitchen", network, nexthop, None)
        }
    }

    #[test]
    fn converts_ipv6_routes() {
        let route = to_router_route(raw(
            Some("r1"),
            "fd00:1111:2222:3333::/64",
            "2001:4860:4860:1234::ff",
        ))
        .unwrap();
        assert_eq!(route.id, "r1");
        assert_eq!(route.prefix.to_string(), "fd00:1111:2222:3333::/64");
        assert_eq!(route.label, "Thread route via Kitchen");
    }

    #[test]
    fn skips_ipv4_unparseable_and_unsaved_routes() {
        assert!(to_router_route(raw(Some("r1"), "10.0.0.0/8", "192.168.1.1")).is_none());
        assert!(to_router_route(raw(Some("r2"), "", "")).is_none());
        assert!(to_router_route(raw(None, "fd00::/64", "2001:4860::1")).is_none());
        assert!(to_router_route(raw(Some(""), "fd00::/64", "2001:4860::1")).is_none());
    }
}

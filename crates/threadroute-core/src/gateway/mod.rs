// ── Router gateway ──
//
// The capability the sync loop needs from a router: list, add and
// delete static routes. Errors are folded into the classes the loop
// knows how to recover from.

pub mod unifi;

use std::future::Future;

use thiserror::Error;

use crate::model::RouterRoute;

pub use unifi::UnifiGateway;

/// Gateway failures, classified by how the caller should react.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Credentials went stale: refresh the session and retry.
    #[error("router session rejected: {message}")]
    TransientAuth { message: String },

    /// Back off and skip this cycle.
    #[error("router rate limited (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    /// The route is already gone.
    #[error("route not found on router: {message}")]
    NotFound { message: String },

    /// The router refused the credentials. Retrying at once would only
    /// count against its login lockout.
    #[error("router login refused: {message}")]
    LoginRefused { message: String },

    /// The router could not be reached. The loop skips the cycle as for
    /// `Other`; the CLI reports it with its own exit code.
    #[error("router unreachable: {message}")]
    Unreachable { message: String, timed_out: bool },

    #[error("router error: {message}")]
    Other { message: String },
}

impl GatewayError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<threadroute_api::Error> for GatewayError {
    fn from(err: threadroute_api::Error) -> Self {
        if err.is_auth_expired() {
            return Self::TransientAuth {
                message: err.to_string(),
            };
        }
        if err.is_gone() {
            return Self::NotFound {
                message: err.to_string(),
            };
        }
        match err {
            threadroute_api::Error::RateLimited { retry_after_secs } => {
                Self::RateLimited { retry_after_secs }
            }
            threadroute_api::Error::Transport(e) if e.is_timeout() || e.is_connect() => {
                Self::Unreachable {
                    message: e.to_string(),
                    timed_out: e.is_timeout(),
                }
            }
            other => Self::Other {
                message: other.to_string(),
            },
        }
    }
}

/// A router whose static-route table can be read and edited.
///
/// Implementations own their session state; the sync loop only asks for
/// a refresh through [`invalidate_session`](Self::invalidate_session).
pub trait RouterGateway: Send + Sync {
    /// Every IPv6 static route the router reports.
    fn list_routes(&self) -> impl Future<Output = Result<Vec<RouterRoute>, GatewayError>> + Send;

    /// Create `route`. Its `id` is ignored.
    fn add_route(&self, route: &RouterRoute)
    -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Delete the route with router id `id`.
    fn delete_route(&self, id: &str) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Drop any cached session so the next call authenticates afresh.
    fn invalidate_session(&self) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Release the session on shutdown.
    fn close(&self) -> impl Future<Output = ()> + Send {
        async {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_fold_into_gateway_classes() {
        let auth: GatewayError = threadroute_api::Error::Authentication {
            message: "401".into(),
        }
        .into();
        assert!(matches!(auth, GatewayError::TransientAuth { .. }));

        let limited: GatewayError =
            threadroute_api::Error::RateLimited { retry_after_secs: 9 }.into();
        assert_eq!(limited, GatewayError::RateLimited { retry_after_secs: 9 });

        let gone: GatewayError = threadroute_api::Error::InvalidId { id: "r1".into() }.into();
        assert!(gone.is_not_found());
        let missing: GatewayError = threadroute_api::Error::NotFound {
            message: "no such route".into(),
        }
        .into();
        assert!(missing.is_not_found());

        let other: GatewayError = threadroute_api::Error::Api {
            message: "api.err.Invalid".into(),
        }
        .into();
        assert!(matches!(other, GatewayError::Other { .. }));
    }
}

use thiserror::Error;

/// Everything that can go wrong talking to the router.
///
/// `threadroute-core` folds these into the gateway error classes the
/// reconcile loop reacts to.
#[derive(Debug, Error)]
pub enum Error {
    // ── Session ─────────────────────────────────────────────────────
    /// Login was refused, or the router no longer accepts the session.
    #[error("router rejected the credentials or session: {message}")]
    Authentication { message: String },

    /// HTTP 429 or the login lockout marker. `0` when the router gave no
    /// Retry-After.
    #[error("router is rate limiting, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    // ── Connection ──────────────────────────────────────────────────
    #[error("request to router failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("bad router URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("TLS setup failed: {0}")]
    Tls(String),

    // ── Routing API ─────────────────────────────────────────────────
    #[error("not found on router: {message}")]
    NotFound { message: String },

    /// `api.err.IdInvalid`: the router has no object with this id, which
    /// is what it says about a route deleted in the meantime.
    #[error("router does not know id {id}")]
    InvalidId { id: String },

    /// Non-ok envelope (`meta.rc`) or an unexpected status.
    #[error("router API error: {message}")]
    Api { message: String },

    /// A 2xx body that is not the expected envelope. `body` is kept whole
    /// for debugging.
    #[error("unexpected router response: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Logging in again might help.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// The object the request named is not on the router (any more).
    pub fn is_gone(&self) -> bool {
        match self {
            Self::NotFound { .. } | Self::InvalidId { .. } => true,
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gone_covers_not_found_and_invalid_id() {
        assert!(
            Error::NotFound {
                message: "x".into()
            }
            .is_gone()
        );
        assert!(Error::InvalidId { id: "abc".into() }.is_gone());
        assert!(
            !Error::Api {
                message: "boom".into()
            }
            .is_gone()
        );
    }

    #[test]
    fn auth_and_rate_limit_predicates() {
        assert!(
            Error::Authentication {
                message: "bad".into()
            }
            .is_auth_expired()
        );
        assert!(!Error::RateLimited { retry_after_secs: 5 }.is_auth_expired());
    }
}

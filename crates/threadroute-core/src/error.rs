// ── Core error types ──
//
// Errors surfaced by the daemon and one-shot operations. Gateway
// failures keep their recovery class; everything else is descriptive.

use thiserror::Error;

use crate::gateway::GatewayError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Discovery failed: {message}")]
    Discovery { message: String },

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    /// An operation needed the router but none is configured.
    #[error("Router integration is disabled")]
    RouterDisabled,
}

impl From<threadroute_api::Error> for CoreError {
    fn from(err: threadroute_api::Error) -> Self {
        match err {
            threadroute_api::Error::InvalidUrl(e) => Self::Config {
                message: format!("Invalid router URL: {e}"),
            },
            other => Self::Gateway(other.into()),
        }
    }
}

//! CLI error types with miette diagnostics.
//!
//! Maps core and config errors into user-facing errors with actionable
//! help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use threadroute_config::ConfigError;
use threadroute_core::{CoreError, GatewayError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to the router: {message}")]
    #[diagnostic(
        code(threadroute::connection_failed),
        help(
            "Check that the router is reachable and router.hostname is right.\n\
             Self-signed certificate? Set router.insecure = true or router.ca_cert."
        )
    )]
    ConnectionFailed { message: String },

    #[error("Router request timed out: {message}")]
    #[diagnostic(
        code(threadroute::timeout),
        help("Increase router.timeout or check the router's responsiveness.")
    )]
    Timeout { message: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Router login failed: {message}")]
    #[diagnostic(
        code(threadroute::auth_failed),
        help(
            "Verify router.username and the password.\n\
             The password is read from THREADROUTE_ROUTER__PASSWORD or UBIQUITY_PASSWORD,\n\
             then the keyring (service \"threadroute\", user \"<hostname>/password\"),\n\
             then router.password in the config file."
        )
    )]
    AuthFailed { message: String },

    #[error("Router is rate limiting logins")]
    #[diagnostic(
        code(threadroute::rate_limited),
        help("Wait {retry_after_secs}s (or a few minutes) before trying again.")
    )]
    RateLimited { retry_after_secs: u64 },

    #[error("No router password configured for '{hostname}'")]
    #[diagnostic(
        code(threadroute::no_credentials),
        help(
            "Set UBIQUITY_PASSWORD, store it in the keyring under service \"threadroute\",\n\
             user \"{hostname}/password\", or set router.password in the config file."
        )
    )]
    NoCredentials { hostname: String },

    // ── Router ───────────────────────────────────────────────────────

    #[error("Router integration is disabled")]
    #[diagnostic(
        code(threadroute::router_disabled),
        help("Set router.enabled = true in the config file, or UBIQUITY_ENABLED=true.")
    )]
    RouterDisabled,

    #[error("Router error: {message}")]
    #[diagnostic(code(threadroute::router))]
    Router { message: String },

    // ── Discovery ────────────────────────────────────────────────────

    #[error("mDNS discovery failed: {message}")]
    #[diagnostic(
        code(threadroute::discovery),
        help("mDNS needs multicast on the local network; check firewall rules for UDP 5353.")
    )]
    Discovery { message: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(threadroute::validation))]
    Validation { field: String, reason: String },

    #[error("Could not load configuration")]
    #[diagnostic(
        code(threadroute::config),
        help("Check the file shown by: threadroute config path")
    )]
    Config {
        #[source]
        source: ConfigError,
    },

    #[error("Internal error: {0}")]
    #[diagnostic(code(threadroute::internal))]
    Internal(String),

    // ── IO ───────────────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::RateLimited { .. } | Self::NoCredentials { .. } => {
                exit_code::AUTH
            }
            Self::Validation { .. } | Self::RouterDisabled => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<GatewayError> for CliError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::TransientAuth { message } | GatewayError::LoginRefused { message } => {
                Self::AuthFailed { message }
            }
            GatewayError::RateLimited { retry_after_secs } => Self::RateLimited { retry_after_secs },
            GatewayError::Unreachable {
                message,
                timed_out: true,
            } => Self::Timeout { message },
            GatewayError::Unreachable { message, .. } => Self::ConnectionFailed { message },
            GatewayError::NotFound { message } | GatewayError::Other { message } => {
                Self::Router { message }
            }
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Gateway(e) => e.into(),
            CoreError::Discovery { message } => Self::Discovery { message },
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::RouterDisabled => Self::RouterDisabled,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { hostname } => Self::NoCredentials { hostname },
            other => Self::Config { source: other },
        }
    }
}

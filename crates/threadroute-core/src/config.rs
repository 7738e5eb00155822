// ── Runtime daemon configuration ──
//
// What the daemon needs to run: router connection details and the
// timing knobs of discovery and reconciliation. Built by the CLI from
// the config crate; core never reads files or the environment.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use threadroute_api::{ControllerPlatform, TlsMode, TransportConfig};
use url::Url;

pub const DEFAULT_LABEL_PREFIX: &str = "Thread route via";
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10 * 60);

/// TLS verification strategy for the router connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed certs).
    DangerAcceptInvalid,
}

/// Connection details for the one router whose routes are managed.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Router root URL (e.g. `https://unifi.local`).
    pub url: Url,
    pub username: String,
    pub password: SecretString,
    pub site: String,
    pub tls: TlsVerification,
    pub timeout: Duration,
    /// `None` probes the router to find out.
    pub platform: Option<ControllerPlatform>,
    /// Log in again once the session is older than this.
    pub session_max_age: Duration,
    /// Gateway MAC stamped on created routes, if any.
    pub gateway_device: Option<String>,
}

impl RouterConfig {
    pub fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }
}

/// Everything the daemon loop is parameterised by.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// `None` runs discovery only and never touches a router.
    pub router: Option<RouterConfig>,
    pub grace_period: Duration,
    pub reconcile_interval: Duration,
    /// Pause after submitting additions before the next read.
    pub settle_delay: Duration,
    pub label_prefix: String,
    pub scan_timeout: Duration,
    pub refresh_interval: Duration,
    /// Discovered entries not re-announced for this long are pruned.
    pub device_expiration: Duration,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            router: None,
            grace_period: DEFAULT_GRACE_PERIOD,
            reconcile_interval: Duration::from_secs(5),
            settle_delay: Duration::from_secs(2),
            label_prefix: DEFAULT_LABEL_PREFIX.into(),
            scan_timeout: Duration::from_secs(10),
            refresh_interval: Duration::from_secs(5 * 60),
            device_expiration: Duration::from_secs(30 * 60),
        }
    }
}

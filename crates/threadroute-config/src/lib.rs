//! Configuration for the threadroute daemon.
//!
//! A TOML file layered under `THREADROUTE_*` environment variables and
//! the older `UBIQUITY_*` / `ROUTE_GRACE_PERIOD` variables, router
//! password resolution (env, keyring, plaintext), and translation into
//! `threadroute_core::DaemonConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use threadroute_core::config::{DEFAULT_GRACE_PERIOD, DEFAULT_LABEL_PREFIX};
use threadroute_core::{ControllerPlatform, DaemonConfig, RouterConfig, TlsVerification};

const KEYRING_SERVICE: &str = "threadroute";
const ENV_PREFIX: &str = "THREADROUTE_";
const REDACTED: &str = "********";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no router password configured for '{hostname}'")]
    NoCredentials { hostname: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub router: RouterSection,

    #[serde(default)]
    pub routes: RoutesSection,

    #[serde(default)]
    pub discovery: DiscoverySection,
}

/// `[router]`: the UniFi router whose static routes are managed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RouterSection {
    /// Without this the daemon only discovers and logs.
    pub enabled: bool,

    /// Hostname or full URL (e.g. "unifi.local", "https://192.168.1.1:8443").
    pub hostname: String,

    pub username: String,

    /// Plaintext password. Prefer the keyring or an environment variable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    pub site: String,

    /// Accept self-signed certificates.
    pub insecure: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    pub timeout: String,

    /// "auto", "unifi-os" or "classic".
    pub platform: String,

    pub session_max_age: String,

    /// Gateway MAC stamped on created routes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_device: Option<String>,
}

impl Default for RouterSection {
    fn default() -> Self {
        Self {
            enabled: false,
            hostname: "unifi.local".into(),
            username: "ubnt".into(),
            password: None,
            site: "default".into(),
            insecure: false,
            ca_cert: None,
            timeout: "30s".into(),
            platform: "auto".into(),
            session_max_age: "5m".into(),
            gateway_device: None,
        }
    }
}

/// `[routes]`: reconciliation timing and route labelling.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutesSection {
    pub grace_period: String,
    pub reconcile_interval: String,
    pub settle_delay: String,
    pub label_prefix: String,
}

impl Default for RoutesSection {
    fn default() -> Self {
        Self {
            grace_period: "10m".into(),
            reconcile_interval: "5s".into(),
            settle_delay: "2s".into(),
            label_prefix: DEFAULT_LABEL_PREFIX.into(),
        }
    }
}

/// `[discovery]`: mDNS scanning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoverySection {
    pub scan_timeout: String,
    pub refresh_interval: String,
    pub device_expiration: String,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            scan_timeout: "10s".into(),
            refresh_interval: "5m".into(),
            device_expiration: "30m".into(),
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "threadroute", "threadroute").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("threadroute");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load defaults, then `path` if it exists, then the environment.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

    if path.is_file() {
        debug!(path = %path.display(), "reading config file");
        let text = std::fs::read_to_string(path)?;
        figment = figment.merge(Toml::string(&text));
    } else {
        debug!(path = %path.display(), "no config file, using defaults");
    }

    let mut config: Config = figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()?;
    apply_legacy_env(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Apply the `UBIQUITY_*` and `ROUTE_GRACE_PERIOD` variables. Booleans
/// are on only for the exact value `true`; empty values are ignored.
fn apply_legacy_env(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let set = |key: &str| lookup(key).filter(|v| !v.is_empty());

    if let Some(v) = set("UBIQUITY_ENABLED") {
        config.router.enabled = v == "true";
    }
    if let Some(v) = set("UBIQUITY_ROUTER_HOSTNAME") {
        config.router.hostname = v;
    }
    if let Some(v) = set("UBIQUITY_USERNAME") {
        config.router.username = v;
    }
    if let Some(v) = set("UBIQUITY_INSECURE_SSL") {
        config.router.insecure = v == "true";
    }
    if let Some(v) = set("ROUTE_GRACE_PERIOD") {
        config.routes.grace_period = v;
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the router password: environment, then keyring, then file.
pub fn resolve_password(router: &RouterSection) -> Result<SecretString, ConfigError> {
    resolve_password_with(
        router,
        |key| std::env::var(key).ok(),
        |hostname| {
            keyring::Entry::new(KEYRING_SERVICE, &format!("{hostname}/password"))
                .and_then(|entry| entry.get_password())
                .ok()
        },
    )
}

fn resolve_password_with(
    router: &RouterSection,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Env var
    for key in ["THREADROUTE_ROUTER__PASSWORD", "UBIQUITY_PASSWORD"] {
        if let Some(pw) = env(key).filter(|v| !v.is_empty()) {
            return Ok(SecretString::from(pw));
        }
    }

    // 2. Keyring
    if let Some(pw) = keyring(&router.hostname) {
        return Ok(SecretString::from(pw));
    }

    // 3. Plaintext in config
    if let Some(ref pw) = router.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        hostname: router.hostname.clone(),
    })
}

// ── Translation ─────────────────────────────────────────────────────

fn parse_duration(field: &str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value.trim())
        .map_err(|e| invalid(field, format!("'{value}' is not a duration: {e}")))
}

/// An unusable grace period is not fatal: warn and keep the default.
fn grace_period(value: &str) -> Duration {
    match humantime::parse_duration(value.trim()) {
        Ok(d) => d,
        Err(e) => {
            warn!(
                value,
                error = %e,
                default = %humantime::format_duration(DEFAULT_GRACE_PERIOD),
                "invalid route grace period, using default"
            );
            DEFAULT_GRACE_PERIOD
        }
    }
}

/// Bare hostnames get `https://`; full URLs are kept.
fn router_url(hostname: &str) -> Result<url::Url, ConfigError> {
    let hostname = hostname.trim();
    if hostname.is_empty() {
        return Err(invalid("router.hostname", "must not be empty"));
    }
    let raw = if hostname.contains("://") {
        hostname.to_owned()
    } else {
        format!("https://{hostname}")
    };
    raw.parse()
        .map_err(|e| invalid("router.hostname", format!("invalid URL '{raw}': {e}")))
}

fn platform(value: &str) -> Result<Option<ControllerPlatform>, ConfigError> {
    if value.eq_ignore_ascii_case("auto") || value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|reason: String| invalid("router.platform", reason))
}

impl RouterSection {
    /// Build the core connection settings, resolving the password.
    pub fn to_router_config(&self) -> Result<RouterConfig, ConfigError> {
        self.to_router_config_with(resolve_password(self)?)
    }

    fn to_router_config_with(&self, password: SecretString) -> Result<RouterConfig, ConfigError> {
        let tls = if self.insecure {
            TlsVerification::DangerAcceptInvalid
        } else if let Some(ref ca) = self.ca_cert {
            TlsVerification::CustomCa(ca.clone())
        } else {
            TlsVerification::SystemDefaults
        };

        Ok(RouterConfig {
            url: router_url(&self.hostname)?,
            username: self.username.clone(),
            password,
            site: self.site.clone(),
            tls,
            timeout: parse_duration("router.timeout", &self.timeout)?,
            platform: platform(&self.platform)?,
            session_max_age: parse_duration("router.session_max_age", &self.session_max_age)?,
            gateway_device: self.gateway_device.clone().filter(|d| !d.is_empty()),
        })
    }
}

impl Config {
    /// Translate into the daemon's runtime settings. The router is
    /// included only when enabled, and then needs a password.
    pub fn to_daemon_config(&self) -> Result<DaemonConfig, ConfigError> {
        let mut daemon = self.daemon_settings()?;
        if self.router.enabled {
            daemon.router = Some(self.router.to_router_config()?);
        }
        Ok(daemon)
    }

    /// Discovery and reconciliation settings, without the router.
    pub fn daemon_settings(&self) -> Result<DaemonConfig, ConfigError> {
        let reconcile_interval =
            parse_duration("routes.reconcile_interval", &self.routes.reconcile_interval)?;
        if reconcile_interval.is_zero() {
            return Err(invalid("routes.reconcile_interval", "must be greater than zero"));
        }
        // The prefix is the only thing telling managed routes from manual ones.
        let label_prefix = self.routes.label_prefix.trim();
        if label_prefix.is_empty() {
            return Err(invalid("routes.label_prefix", "must not be empty"));
        }

        Ok(DaemonConfig {
            router: None,
            grace_period: grace_period(&self.routes.grace_period),
            reconcile_interval,
            settle_delay: parse_duration("routes.settle_delay", &self.routes.settle_delay)?,
            label_prefix: label_prefix.to_owned(),
            scan_timeout: parse_duration("discovery.scan_timeout", &self.discovery.scan_timeout)?,
            refresh_interval: parse_duration(
                "discovery.refresh_interval",
                &self.discovery.refresh_interval,
            )?,
            device_expiration: parse_duration(
                "discovery.device_expiration",
                &self.discovery.device_expiration,
            )?,
        })
    }

    /// Copy with the plaintext password masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.router.password.is_some() {
            copy.router.password = Some(REDACTED.into());
        }
        copy
    }

    /// Pretty TOML of the redacted configuration.
    pub fn to_redacted_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&self.redacted())?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use figment::Jail;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn no_keyring(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_translate_without_router() {
        let daemon = Config::default().to_daemon_config().unwrap();
        assert!(daemon.router.is_none());
        assert_eq!(daemon.grace_period, Duration::from_secs(600));
        assert_eq!(daemon.reconcile_interval, Duration::from_secs(5));
        assert_eq!(daemon.settle_delay, Duration::from_secs(2));
        assert_eq!(daemon.label_prefix, "Thread route via");
        assert_eq!(daemon.scan_timeout, Duration::from_secs(10));
        assert_eq!(daemon.refresh_interval, Duration::from_secs(300));
        assert_eq!(daemon.device_expiration, Duration::from_secs(1800));
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
                [router]
                hostname = "192.168.1.1"
                platform = "classic"

                [routes]
                grace_period = "90s"
                label_prefix = "Matter via"
            "#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.router.hostname, "192.168.1.1");
        assert_eq!(config.router.username, "ubnt");
        assert_eq!(config.routes.label_prefix, "Matter via");

        let daemon = config.daemon_settings().unwrap();
        assert_eq!(daemon.grace_period, Duration::from_secs(90));
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.routes, RoutesSection::default());
    }

    #[test]
    fn malformed_file_is_a_figment_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[router\nenabled = ").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Figment(_))));
    }

    #[test]
    fn prefixed_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[routes]\nsettle_delay = \"1s\"\n")?;
            jail.set_env("THREADROUTE_ROUTES__SETTLE_DELAY", "3s");
            jail.set_env("THREADROUTE_DISCOVERY__SCAN_TIMEOUT", "4s");

            let config = load_config(Path::new("config.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.routes.settle_delay, "3s");
            assert_eq!(config.discovery.scan_timeout, "4s");
            Ok(())
        });
    }

    #[test]
    fn legacy_env_variables_apply_last() {
        let mut config = Config::default();
        apply_legacy_env(
            &mut config,
            env(&[
                ("UBIQUITY_ENABLED", "true"),
                ("UBIQUITY_ROUTER_HOSTNAME", "gw.lan"),
                ("UBIQUITY_USERNAME", "admin"),
                ("UBIQUITY_INSECURE_SSL", "yes"),
                ("ROUTE_GRACE_PERIOD", "1h"),
            ]),
        );
        assert!(config.router.enabled);
        assert_eq!(config.router.hostname, "gw.lan");
        assert_eq!(config.router.username, "admin");
        assert!(!config.router.insecure);
        assert_eq!(config.routes.grace_period, "1h");
    }

    #[test]
    fn empty_legacy_values_are_ignored() {
        let mut config = Config::default();
        apply_legacy_env(&mut config, env(&[("UBIQUITY_ROUTER_HOSTNAME", "")]));
        assert_eq!(config.router.hostname, "unifi.local");
    }

    #[test]
    fn invalid_grace_period_falls_back_to_default() {
        assert_eq!(grace_period("ten minutes"), DEFAULT_GRACE_PERIOD);
        assert_eq!(grace_period(""), DEFAULT_GRACE_PERIOD);
        assert_eq!(grace_period("1h30m"), Duration::from_secs(5400));
    }

    #[test]
    fn other_invalid_durations_are_rejected() {
        let mut config = Config::default();
        config.discovery.scan_timeout = "soon".into();
        let err = config.daemon_settings().unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation { ref field, .. } if field == "discovery.scan_timeout")
        );

        let mut config = Config::default();
        config.routes.reconcile_interval = "0s".into();
        assert!(config.daemon_settings().is_err());
    }

    #[test]
    fn blank_label_prefix_is_rejected() {
        for blank in ["", "   "] {
            let mut config = Config::default();
            config.routes.label_prefix = blank.into();
            let err = config.daemon_settings().unwrap_err();
            assert!(
                matches!(err, ConfigError::Validation { ref field, .. } if field == "routes.label_prefix")
            );
        }

        let mut config = Config::default();
        config.routes.label_prefix = "  Thread route via  ".into();
        assert_eq!(config.daemon_settings().unwrap().label_prefix, "Thread route via");
    }

    #[test]
    fn password_prefers_env_then_keyring_then_file() {
        let router = RouterSection {
            password: Some("from-file".into()),
            ..RouterSection::default()
        };

        let pw = resolve_password_with(&router, env(&[("UBIQUITY_PASSWORD", "from-env")]), no_keyring)
            .unwrap();
        assert_eq!(pw.expose_secret(), "from-env");

        let pw = resolve_password_with(&router, env(&[]), |host| {
            (host == "unifi.local").then(|| "from-keyring".to_owned())
        })
        .unwrap();
        assert_eq!(pw.expose_secret(), "from-keyring");

        let pw = resolve_password_with(&router, env(&[]), no_keyring).unwrap();
        assert_eq!(pw.expose_secret(), "from-file");
    }

    #[test]
    fn missing_password_is_no_credentials() {
        let err = resolve_password_with(&RouterSection::default(), env(&[]), no_keyring).unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { ref hostname } if hostname == "unifi.local"));
    }

    #[test]
    fn router_section_translates() {
        let router = RouterSection {
            hostname: "192.168.1.1:8443".into(),
            insecure: true,
            platform: "unifi-os".into(),
            gateway_device: Some(String::new()),
            ..RouterSection::default()
        };
        let cfg = router.to_router_config_with("pw".to_owned().into()).unwrap();
        assert_eq!(cfg.url.as_str(), "https://192.168.1.1:8443/");
        assert_eq!(cfg.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(cfg.platform, Some(ControllerPlatform::UnifiOs));
        assert_eq!(cfg.session_max_age, Duration::from_secs(300));
        assert!(cfg.gateway_device.is_none());

        let auto = RouterSection::default()
            .to_router_config_with("pw".to_owned().into())
            .unwrap();
        assert!(auto.platform.is_none());
        assert_eq!(auto.tls, TlsVerification::SystemDefaults);
    }

    #[test]
    fn unknown_platform_is_rejected() {
        let router = RouterSection {
            platform: "cloud".into(),
            ..RouterSection::default()
        };
        assert!(router.to_router_config_with("pw".to_owned().into()).is_err());
    }

    #[test]
    fn redaction_masks_only_the_password() {
        let mut config = Config::default();
        config.router.password = Some("hunter2".into());
        let text = config.to_redacted_toml().unwrap();
        assert!(!text.contains("hunter2"));
        assert!(text.contains(REDACTED));
        assert!(text.contains("unifi.local"));
    }
}

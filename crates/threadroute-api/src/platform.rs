use std::fmt;
use std::str::FromStr;

/// The platform type of the UniFi router.
///
/// Determines the URL prefix in front of the legacy API and the login path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPlatform {
    /// UniFi OS device (UDM, UCG, etc.) -- port 443, `/proxy/network/` prefix.
    UnifiOs,
    /// Standalone Network Application -- port 8443, no prefix.
    ClassicController,
}

impl ControllerPlatform {
    /// The path prefix for legacy API endpoints.
    pub fn legacy_prefix(self) -> &'static str {
        match self {
            Self::UnifiOs => "/proxy/network",
            Self::ClassicController => "",
        }
    }

    /// The login endpoint path.
    pub fn login_path(self) -> &'static str {
        match self {
            Self::UnifiOs => "/api/auth/login",
            Self::ClassicController => "/api/login",
        }
    }

    /// The logout endpoint path.
    pub fn logout_path(self) -> &'static str {
        match self {
            Self::UnifiOs => "/api/auth/logout",
            Self::ClassicController => "/api/logout",
        }
    }
}

impl fmt::Display for ControllerPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UnifiOs => "unifi-os",
            Self::ClassicController => "classic",
        })
    }
}

impl FromStr for ControllerPlatform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unifi-os" | "unifios" | "udm" => Ok(Self::UnifiOs),
            "classic" | "standalone" => Ok(Self::ClassicController),
            other => Err(format!(
                "expected 'unifi-os' or 'classic', got '{other}'"
            )),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_platform_names() {
        assert_eq!(
            "unifi-os".parse::<ControllerPlatform>().unwrap(),
            ControllerPlatform::UnifiOs
        );
        assert_eq!(
            "Classic".parse::<ControllerPlatform>().unwrap(),
            ControllerPlatform::ClassicController
        );
        assert!("cloud".parse::<ControllerPlatform>().is_err());
    }

    #[test]
    fn prefixes_match_platform() {
        assert_eq!(ControllerPlatform::UnifiOs.legacy_prefix(), "/proxy/network");
        assert_eq!(ControllerPlatform::ClassicController.legacy_prefix(), "");
        assert_eq!(ControllerPlatform::ClassicController.login_path(), "/api/login");
    }
}

// Router session handling
//
// Cookie-based login/logout plus platform detection. A successful login
// leaves the session cookie in the client's jar and the CSRF token in the
// client; both are dropped again on logout.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::client::{LOGIN_LIMIT_MARKER, RouterClient, csrf_from, retry_after};
use crate::error::Error;
use crate::platform::ControllerPlatform;
use crate::transport::TransportConfig;

impl RouterClient {
    /// Log in with username/password.
    ///
    /// A 429 response, or a body carrying the router's login-limit marker,
    /// becomes [`Error::RateLimited`] so callers can back off instead of
    /// burning more attempts.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<(), Error> {
        let url = self.base_url().join(self.platform().login_path())?;

        debug!("logging in at {}", url);

        let body = json!({
            "username": username,
            "password": password.expose_secret(),
        });

        let resp = self
            .http()
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        let token = csrf_from(resp.headers());

        if !status.is_success() {
            let retry_after_secs = retry_after(resp.headers());
            let text = resp.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS || text.contains(LOGIN_LIMIT_MARKER) {
                return Err(Error::RateLimited { retry_after_secs });
            }
            return Err(Error::Authentication {
                message: format!("login failed (HTTP {status}): {text}"),
            });
        }

        self.set_csrf_token(token);
        debug!("login successful");
        Ok(())
    }

    /// End the current session and forget the CSRF token.
    pub async fn logout(&self) -> Result<(), Error> {
        let url = self.base_url().join(self.platform().logout_path())?;

        debug!("logging out at {}", url);

        self.http().post(url).send().await.map_err(Error::Transport)?;
        self.set_csrf_token(None);

        debug!("logout complete");
        Ok(())
    }

    /// Auto-detect the router platform by probing login endpoints.
    ///
    /// UniFi OS answers `/api/auth/login` with something other than 404
    /// (usually 401 or 405). Anything else that answers `/api/login` is
    /// treated as a classic controller.
    pub async fn detect_platform(
        base_url: &Url,
        transport: &TransportConfig,
    ) -> Result<ControllerPlatform, Error> {
        let http = transport.build_client()?;

        let unifi_os_url = base_url.join(ControllerPlatform::UnifiOs.login_path())?;
        debug!("probing UniFi OS at {}", unifi_os_url);

        if let Ok(resp) = http.get(unifi_os_url).send().await {
            if resp.status() != reqwest::StatusCode::NOT_FOUND {
                debug!("detected UniFi OS platform");
                return Ok(ControllerPlatform::UnifiOs);
            }
        }

        let classic_url = base_url.join(ControllerPlatform::ClassicController.login_path())?;
        debug!("probing classic controller at {}", classic_url);

        match http.get(classic_url).send().await {
            Ok(_) => {
                debug!("detected classic controller");
                Ok(ControllerPlatform::ClassicController)
            }
            Err(e) => Err(Error::Transport(e)),
        }
    }
}

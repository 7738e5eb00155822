// Router HTTP client
//
// One `reqwest::Client` per router, the site-scoped URL scheme, the CSRF
// token UniFi OS wants on mutating calls, and the classification of every
// response into data or an `Error`. Session and route endpoints live in
// `session.rs` and `routes.rs`.

use std::sync::{PoisonError, RwLock};

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::LegacyResponse;
use crate::platform::ControllerPlatform;
use crate::transport::TransportConfig;

/// Marker the router puts in the body when it locks out further logins.
pub(crate) const LOGIN_LIMIT_MARKER: &str = "AUTHENTICATION_FAILED_LIMIT_REACHED";

const CSRF_HEADER: &str = "X-CSRF-Token";
const CSRF_ROTATED_HEADER: &str = "X-Updated-CSRF-Token";

/// UniFi OS sometimes answers 200 with `{"error":{"code":N,"message":".."}}`.
#[derive(serde::Deserialize)]
struct OsErrorBody {
    error: Option<OsError>,
}

#[derive(serde::Deserialize)]
struct OsError {
    code: u16,
    message: Option<String>,
}

/// The CSRF token of the current session, if the router issued one.
#[derive(Default)]
struct Csrf(RwLock<Option<String>>);

impl Csrf {
    fn replace(&self, token: Option<String>) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    fn attach(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.0.read().unwrap_or_else(PoisonError::into_inner).as_deref() {
            Some(token) => builder.header(CSRF_HEADER, token),
            None => builder,
        }
    }
}

/// The token a response carries, preferring a rotated one.
pub(crate) fn csrf_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CSRF_ROTATED_HEADER)
        .or_else(|| headers.get(CSRF_HEADER))
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

pub(crate) fn retry_after(headers: &HeaderMap) -> u64 {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

/// HTTP client for one router site's legacy `rest/` API.
///
/// Every call returns the unwrapped `data` array of the
/// `{ meta: { rc, msg }, data: [...] }` envelope.
pub struct RouterClient {
    http: reqwest::Client,
    base_url: Url,
    site: String,
    platform: ControllerPlatform,
    csrf: Csrf,
}

impl RouterClient {
    /// `base_url` is the router root, e.g. `https://192.168.1.1`.
    pub fn new(
        base_url: Url,
        site: String,
        platform: ControllerPlatform,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        Ok(Self::with_client(
            transport.build_client()?,
            base_url,
            site,
            platform,
        ))
    }

    /// Use a caller-built `reqwest::Client`. It needs a cookie store for
    /// sessions to survive past login.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        site: String,
        platform: ControllerPlatform,
    ) -> Self {
        Self {
            http,
            base_url,
            site,
            platform,
            csrf: Csrf::default(),
        }
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn platform(&self) -> ControllerPlatform {
        self.platform
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn set_csrf_token(&self, token: Option<String>) {
        trace!(present = token.is_some(), "CSRF token updated");
        self.csrf.replace(token);
    }

    /// `{base}{platform prefix}/api/s/{site}/{path}`
    pub(crate) fn site_url(&self, path: &str) -> Result<Url, Error> {
        let url = format!(
            "{}{}/api/s/{}/{path}",
            self.base_url.as_str().trim_end_matches('/'),
            self.platform.legacy_prefix().trim_end_matches('/'),
            self.site,
        );
        Ok(Url::parse(&url)?)
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, Error> {
        self.send(Method::GET, url, None::<&()>).await
    }

    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<Vec<T>, Error> {
        self.send(Method::POST, url, Some(body)).await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, Error> {
        self.send(Method::DELETE, url, None::<&()>).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&(impl Serialize + Sync)>,
    ) -> Result<Vec<T>, Error> {
        debug!(%method, %url, "router request");
        let mutating = method != Method::GET;
        let mut builder = self.http.request(method, url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        if mutating {
            builder = self.csrf.attach(builder);
        }

        let resp = builder.send().await.map_err(Error::Transport)?;
        if let Some(token) = csrf_from(resp.headers()) {
            self.set_csrf_token(Some(token));
        }
        read_envelope(resp).await
    }
}

/// Turn a response into the envelope's `data`, or the error it stands for.
///
/// The status decides first: 401 means the session is gone, 429 (or the
/// lockout marker in any body) is a rate limit, 404 is not-found. Only a
/// success status gets its body parsed as an envelope.
async fn read_envelope<T: DeserializeOwned>(resp: reqwest::Response) -> Result<Vec<T>, Error> {
    let status = resp.status();
    match status {
        StatusCode::UNAUTHORIZED => {
            return Err(Error::Authentication {
                message: "session expired or invalid credentials".into(),
            });
        }
        StatusCode::TOO_MANY_REQUESTS => {
            return Err(Error::RateLimited {
                retry_after_secs: retry_after(resp.headers()),
            });
        }
        _ => {}
    }

    let body = resp.text().await.map_err(Error::Transport)?;
    if body.contains(LOGIN_LIMIT_MARKER) {
        return Err(Error::RateLimited {
            retry_after_secs: 0,
        });
    }

    match status {
        StatusCode::NOT_FOUND => {
            return Err(Error::NotFound {
                message: envelope_message(&body).unwrap_or_else(|| preview(&body)),
            });
        }
        StatusCode::FORBIDDEN => {
            return Err(Error::Api {
                message: "the router account may not manage routes (HTTP 403)".into(),
            });
        }
        s if !s.is_success() => {
            return Err(Error::Api {
                message: envelope_message(&body)
                    .unwrap_or_else(|| format!("HTTP {s}: {}", preview(&body))),
            });
        }
        _ => {}
    }

    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    if let Ok(OsErrorBody { error: Some(err) }) = serde_json::from_str(&body) {
        let message = err.message.unwrap_or_default();
        return Err(if err.code == 401 {
            Error::Authentication { message }
        } else {
            Error::Api {
                message: format!("UniFi OS error {}: {message}", err.code),
            }
        });
    }

    let envelope: LegacyResponse<T> =
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body starts {:?})", preview(&body)),
            body: body.clone(),
        })?;

    if envelope.meta.rc == "ok" {
        Ok(envelope.data)
    } else {
        Err(Error::Api {
            message: envelope
                .meta
                .msg
                .unwrap_or_else(|| format!("rc={}", envelope.meta.rc)),
        })
    }
}

/// `meta.msg` of an error body, when the body is an envelope at all.
fn envelope_message(body: &str) -> Option<String> {
    serde_json::from_str::<LegacyResponse<serde_json::Value>>(body)
        .ok()
        .and_then(|env| env.meta.msg)
}

fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}

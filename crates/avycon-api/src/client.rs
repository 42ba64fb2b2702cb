// DVR session client
//
// Owns the connection (`reqwest::Client`), drives the Digest login and
// carries the resulting session cookie and CSRF token on every request.
// Endpoint wrappers live in `endpoints.rs` as inherent methods built on
// the single `request` primitive here.

use std::future::Future;
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use chrono::{Local, NaiveDateTime};
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, WWW_AUTHENTICATE};
use secrecy::SecretString;
use serde_json::{Value, json};
use tracing::{debug, trace};
use url::Url;

use crate::auth::{
    Challenge, Credentials, DigestHandshake, PLACEHOLDER_BASIC, Qop, generate_cnonce,
};
use crate::envelope::{self, ResponseBody};
use crate::error::Error;
use crate::session::{CSRF_HEADER, SESSION_COOKIE, SessionGrant, SessionState};
use crate::transport::ClientConfig;

/// Login endpoint; the only one that speaks Digest.
pub const LOGIN_PATH: &str = "/API/Web/Login";

/// Body sent on a POST when the caller supplies none. The DVR rejects
/// body-less POSTs.
const EMPTY_JSON_BODY: &[u8] = b"{}";

const JSON_CONTENT_TYPE: &str = "application/json";

const NOT_OPEN: &str = "connection is not open; call open() or authenticate() first";

/// Format of the cache-busting query key, e.g. `2024-01-02@03:04:05`.
const CACHE_BUSTER_FORMAT: &str = "%Y-%m-%d@%H:%M:%S";

/// How `execute` treats a successful response that is not JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentPolicy {
    RequireJson,
    AllowRaw,
}

/// Async client for one authenticated session against one DVR.
///
/// Cheaply cloneable; clones share the connection and session. The
/// connection is opened by [`open`](Self::open) or
/// [`authenticate`](Self::authenticate) and released by
/// [`close`](Self::close). Use [`oneshot`](Self::oneshot) to get the
/// close on every exit path.
#[derive(Clone)]
pub struct AvyconClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    base_url: Url,
    config: ClientConfig,
    http: ArcSwapOption<reqwest::Client>,
    session: ArcSwap<SessionState>,
}

impl AvyconClient {
    /// Create a client for the DVR at `base_url`. No I/O happens here.
    pub fn new(base_url: Url, config: ClientConfig) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                base_url,
                config,
                http: ArcSwapOption::empty(),
                session: ArcSwap::from_pointee(SessionState::new()),
            }),
        }
    }

    /// Parse `base_url` and create a client.
    pub fn parse(base_url: &str, config: ClientConfig) -> Result<Self, Error> {
        Ok(Self::new(Url::parse(base_url)?, config))
    }

    /// Open, authenticate, run `f`, close.
    ///
    /// The connection is closed whether authentication fails, `f` fails,
    /// or everything succeeds.
    pub async fn oneshot<F, Fut, T, E>(
        base_url: Url,
        config: ClientConfig,
        username: &str,
        password: &SecretString,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce(AvyconClient) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<Error>,
    {
        let client = Self::new(base_url, config);
        let result = match client.authenticate(username, password).await {
            Ok(_) => f(client.clone()).await,
            Err(e) => Err(e.into()),
        };
        client.close();
        result
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// The DVR base URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// A consistent snapshot of the current session.
    pub fn session(&self) -> Arc<SessionState> {
        self.inner.session.load_full()
    }

    /// Whether the connection resource currently exists.
    pub fn is_open(&self) -> bool {
        self.inner.http.load().is_some()
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Create the connection resource if it does not exist yet.
    pub fn open(&self) -> Result<(), Error> {
        if self.is_open() {
            return Ok(());
        }
        let http = Arc::new(self.inner.config.build_client()?);
        self.inner
            .http
            .rcu(|current| current.clone().or_else(|| Some(Arc::clone(&http))));
        debug!(base_url = %self.inner.base_url, "connection opened");
        Ok(())
    }

    /// Release the connection and drop the session cookie and token.
    ///
    /// Idempotent, and safe on a client that was never opened. The Digest
    /// nonce count survives.
    pub fn close(&self) {
        if self.inner.http.swap(None).is_some() {
            debug!(base_url = %self.inner.base_url, "connection closed");
        }
        self.inner.session.rcu(|prev| Arc::new(prev.cleared()));
    }

    fn connection(&self) -> Result<Arc<reqwest::Client>, Error> {
        self.inner.http.load_full().ok_or(Error::State(NOT_OPEN))
    }

    // ── Authentication ───────────────────────────────────────────────

    /// Log in with HTTP Digest authentication.
    ///
    /// Sends an unauthenticated POST to collect the challenge, answers it,
    /// and on success swaps in a new session (cookie, CSRF token, nonce
    /// count + 1) as one unit. Returns the decoded login envelope.
    ///
    /// If this call opened the connection and the login fails, the
    /// connection is released again before the error is returned.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<Value, Error> {
        let opened_here = !self.is_open();
        self.open()?;
        let result = self.login(username, password).await;
        if result.is_err() && opened_here {
            self.close();
        }
        result
    }

    async fn login(&self, username: &str, password: &SecretString) -> Result<Value, Error> {
        let http = self.connection()?;
        let url = self.inner.base_url.join(LOGIN_PATH)?;

        debug!("requesting digest challenge at {url}");
        let priming = http.post(url.clone()).send().await?;
        let priming_status = priming.status();
        let header = priming
            .headers()
            .get(WWW_AUTHENTICATE)
            .map(|v| {
                v.to_str()
                    .map(String::from)
                    .map_err(|e| Error::protocol(format!("unreadable WWW-Authenticate header: {e}")))
            })
            .transpose()?
            .ok_or_else(|| {
                Error::protocol(format!(
                    "missing WWW-Authenticate header (HTTP {priming_status})"
                ))
            })?;
        let priming_body = priming.bytes().await?;

        let challenge = Challenge::parse(&header)?;
        let credentials = Credentials::new(username, password.clone());
        let cnonce = generate_cnonce();
        let nonce_count = self.inner.session.load().nonce_count();
        let authorization = DigestHandshake {
            method: Method::POST.as_str(),
            uri: url.path(),
            challenge: &challenge,
            credentials: &credentials,
            cnonce: &cnonce,
            nonce_count,
            entity_body: &priming_body,
        }
        .authorization();

        debug!(
            realm = %challenge.realm,
            qop = challenge.qop.as_ref().map(Qop::as_str),
            nonce_count,
            "answering digest challenge"
        );

        let body = json!({
            "data": {
                "remote_terminal_info": self.inner.config.terminal_info,
            },
        });
        let resp = http
            .post(url)
            .header(AUTHORIZATION, authorization)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let cookie = resp
            .cookies()
            .find(|c| c.name() == SESSION_COOKIE)
            .map(|c| c.value().to_owned());
        let csrf_token = resp
            .headers()
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(Error::Authentication {
                status: status.as_u16(),
                body: text,
            });
        }

        let grant = SessionGrant {
            cookie,
            csrf_token,
            credentials,
        };
        let previous = self
            .inner
            .session
            .rcu(|prev| Arc::new(prev.established(grant.clone())));
        trace!(
            nonce_count = previous.nonce_count().saturating_add(1),
            "session snapshot replaced"
        );
        debug!("login successful");

        serde_json::from_str(&text)
            .map_err(|e| Error::protocol(format!("login response is not JSON: {e}")))
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Send an authenticated request and return the decoded JSON envelope.
    ///
    /// A POST without `body` sends `{}`. Non-2xx responses, and 2xx
    /// responses reporting `"result": "failed"`, become [`Error::Api`].
    /// A 2xx response that is not JSON is a [`Error::Protocol`].
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, Error> {
        match self
            .execute(method, path, body, ContentPolicy::RequireJson)
            .await?
        {
            ResponseBody::Json(value) => Ok(value),
            ResponseBody::Raw(_) => Err(Error::protocol("unexpected content type")),
        }
    }

    /// Like [`request`](Self::request), but a 2xx response that is not
    /// JSON is returned as [`ResponseBody::Raw`] instead of failing.
    ///
    /// This is the only call that skips content-type validation; it exists
    /// for callers fetching non-JSON resources (media segments, manifests)
    /// with the session headers attached.
    pub async fn request_passthrough(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<ResponseBody, Error> {
        self.execute(method, path, body, ContentPolicy::AllowRaw)
            .await
    }

    /// POST with an optional JSON body.
    pub(crate) async fn post(&self, path: &str, body: Option<&Value>) -> Result<Value, Error> {
        self.request(Method::POST, path, body).await
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        policy: ContentPolicy,
    ) -> Result<ResponseBody, Error> {
        let http = self.connection()?;
        let session = self.session();
        let url = self.request_url(path, Local::now().naive_local())?;

        debug!("{method} {}", url.path());

        let payload = match body {
            Some(value) => Some(
                serde_json::to_vec(value)
                    .map_err(|e| Error::protocol(format!("unencodable request body: {e}")))?,
            ),
            None if method == Method::POST => Some(EMPTY_JSON_BODY.to_vec()),
            None => None,
        };

        let mut builder = http
            .request(method, url)
            .header(AUTHORIZATION, PLACEHOLDER_BASIC);
        if let Some(cookie) = session.cookie_header() {
            builder = builder.header(COOKIE, cookie);
        }
        if let Some(token) = session.csrf_token() {
            builder = builder.header(CSRF_HEADER, token);
        }
        if let Some(payload) = payload {
            builder = builder.header(CONTENT_TYPE, JSON_CONTENT_TYPE).body(payload);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let bytes = resp.bytes().await?.to_vec();

        let body = if content_type.as_deref().is_some_and(is_json_content_type) {
            match serde_json::from_slice(&bytes) {
                Ok(value) => ResponseBody::Json(value),
                Err(e) if status.is_success() => {
                    return Err(Error::protocol(format!("malformed JSON body: {e}")));
                }
                Err(_) => ResponseBody::Raw(bytes),
            }
        } else {
            ResponseBody::Raw(bytes)
        };

        if !status.is_success() {
            return Err(Error::api(status.as_u16(), body));
        }

        match body {
            ResponseBody::Json(value) if envelope::is_failed(&value) => {
                Err(Error::api(status.as_u16(), ResponseBody::Json(value)))
            }
            ResponseBody::Raw(_) if policy == ContentPolicy::RequireJson => {
                Err(Error::protocol(format!(
                    "unexpected content type {:?}",
                    content_type.as_deref().unwrap_or("<none>")
                )))
            }
            body => Ok(body),
        }
    }

    /// Join `path` onto the base URL and append the cache-busting key.
    fn request_url(&self, path: &str, now: NaiveDateTime) -> Result<Url, Error> {
        let mut url = self.inner.base_url.join(path)?;
        let stamp = cache_buster(now);
        let query = match url.query() {
            Some(existing) if !existing.is_empty() => format!("{existing}&{stamp}="),
            _ => format!("{stamp}="),
        };
        url.set_query(Some(&query));
        Ok(url)
    }
}

impl std::fmt::Debug for AvyconClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvyconClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("open", &self.is_open())
            .field("session", &self.session())
            .finish()
    }
}

/// The cache-busting query key for `now`: `YYYY-MM-DD@HH:MM:SS`.
pub fn cache_buster(now: NaiveDateTime) -> String {
    now.format(CACHE_BUSTER_FORMAT).to_string()
}

fn is_json_content_type(value: &str) -> bool {
    value
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(JSON_CONTENT_TYPE))
}

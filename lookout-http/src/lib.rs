//! Minimal HTTP client with safe logging and flexible auth.
//!
//! - Request options: headers, `Auth`, timeout, absolute URLs
//! - JSON POST, plain-text GET and streaming POST helpers
//! - Never logs secret values (auth headers are redacted)
//! - Optional *raw* request/response logging via `LOOKOUT_HTTP_RAW=1`
//!
//! Requests are sent exactly once. Callers decide what a failure means.
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), lookout_http::HttpError> {
//! let client = lookout_http::HttpClient::new("https://api.example.com")?;
//! let got: serde_json::Value = client
//!     .post_json_opts(
//!         "v1/items",
//!         &serde_json::json!({ "q": "rust" }),
//!         lookout_http::RequestOpts::default(),
//!     )
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response headers, body snippets (truncated), final errors, and
//! (optionally) raw request/response lines (target `http.raw`).

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
pub use reqwest::StatusCode;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;
use uuid::Uuid;

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "LOOKOUT_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024;
const SNIPPET_MAX: usize = 500;

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

fn is_secret_header(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "authorization" | "x-api-key" | "x-subscription-token" | "cookie" | "proxy-authorization"
    )
}

/// Render a best-effort curl command for repro/debug, with secrets redacted.
fn make_curl(method: &Method, url: &Url, headers: &HeaderMap, body: Option<&[u8]>) -> String {
    let mut parts = vec!["curl".to_string(), format!("-X{method}")];
    for (name, val) in redact_headers(headers) {
        parts.push(format!("-H '{}: {}'", name, val.replace('\'', r"'\''")));
    }
    if let Some(bytes) = body {
        match std::str::from_utf8(bytes) {
            Ok(s) => {
                let s = truncate_utf8(s, RAW_MAX_BODY);
                parts.push(format!("-d '{}'", s.replace('\'', r"'\''")));
            }
            Err(_) => parts.push(format!("--data-binary @- # ({} bytes)", bytes.len())),
        }
    }
    parts.push(format!("'{}'", url.as_str()));
    parts.join(" ")
}

/// Redact sensitive headers for logging
fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let val = if is_secret_header(&key) {
                "<redacted>".to_string()
            } else {
                v.to_str().unwrap_or("").to_string()
            };
            (key, val)
        })
        .collect()
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

// ==============================
// Auth & Request Options
// ==============================

/// Authentication strategies supported by the HTTP client helpers.
///
/// ```
/// use lookout_http::Auth;
///
/// let bearer = Auth::Bearer("token");
/// match bearer {
///     Auth::Bearer(value) => assert_eq!(value, "token"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// Authorization: Bearer <token>
    Bearer(&'a str),
    /// Custom header (e.g., Serper: X-API-KEY)
    Header {
        name: HeaderName,
        value: HeaderValue,
    },
    None,
}

impl Auth<'_> {
    /// Build a custom-header auth, rejecting values that are not valid header bytes.
    pub fn header(name: &str, value: &str) -> Result<Self, HttpError> {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| HttpError::Build(format!("invalid header name {name}: {e}")))?;
        let mut value = HeaderValue::from_str(value.trim())
            .map_err(|e| HttpError::Build(format!("invalid {name} header: {e}")))?;
        value.set_sensitive(true);
        Ok(Auth::Header {
            name: header_name,
            value,
        })
    }

    fn kind(&self) -> &'static str {
        match self {
            Auth::Bearer(_) => "bearer",
            Auth::Header { .. } => "header",
            Auth::None => "none",
        }
    }
}

/// Per-request tuning knobs for the HTTP client.
///
/// ```
/// use lookout_http::RequestOpts;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(5)),
///     allow_absolute: true,
///     ..Default::default()
/// };
///
/// assert_eq!(opts.timeout.unwrap().as_secs(), 5);
/// assert!(opts.auth.is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub auth: Option<Auth<'a>>,
    pub headers: Option<HeaderMap>,
    /// If true and `path` is an absolute URL, use it as-is (ignore base).
    pub allow_absolute: bool,
}

// ==============================
// Client
// ==============================

#[derive(Clone)]
pub struct HttpClient {
    base: Option<Url>,
    inner: Client,
    /// Total request timeout applied when a request does not set its own.
    /// `None` means the request may wait indefinitely once connected.
    pub default_timeout: Option<Duration>,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// ```no_run
    /// use lookout_http::{HttpClient, HttpError};
    ///
    /// let client = HttpClient::new("https://api.example.com")?;
    /// assert!(client.default_timeout.is_none());
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        Ok(Self {
            base: Some(base),
            inner: build_inner()?,
            default_timeout: None,
        })
    }

    /// Construct a client with no base URL; every path must be absolute.
    ///
    /// ```no_run
    /// use lookout_http::{HttpClient, HttpError};
    ///
    /// let client = HttpClient::unanchored()?;
    /// assert!(client.base().is_none());
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn unanchored() -> Result<Self, HttpError> {
        Ok(Self {
            base: None,
            inner: build_inner()?,
            default_timeout: None,
        })
    }

    /// Set a default total timeout for every request.
    ///
    /// ```no_run
    /// use lookout_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com")?
    ///     .with_timeout(Duration::from_secs(2));
    /// assert_eq!(client.default_timeout, Some(Duration::from_secs(2)));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = Some(dur);
        self
    }

    pub fn base(&self) -> Option<&Url> {
        self.base.as_ref()
    }

    /// POST JSON and decode a JSON response.
    pub async fn post_json_opts<B, T>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let (req_id, resp) = self.send(Method::POST, path, Some(body), &opts).await?;
        let (status, headers, bytes) = read_body(&req_id, resp).await?;
        if !status.is_success() {
            return Err(api_error(&req_id, status, &headers, &bytes));
        }

        let snippet = snip_body(&bytes);
        serde_json::from_slice::<T>(&bytes).map_err(|e| {
            tracing::warn!(
                req_id=%req_id,
                serde_line=%e.line(),
                serde_col=%e.column(),
                serde_err=%e,
                body_snippet=%snippet,
                "http.response.decode_error"
            );
            HttpError::Decode(e.to_string(), snippet)
        })
    }

    /// GET a resource and return its status and body as text.
    ///
    /// Any status that carries a body is handed back; only transport
    /// failures are errors. Bytes that are not valid UTF-8 are replaced
    /// rather than rejected.
    pub async fn get_text(
        &self,
        path: &str,
        opts: RequestOpts<'_>,
    ) -> Result<(StatusCode, String), HttpError> {
        let (req_id, resp) = self.send::<()>(Method::GET, path, None, &opts).await?;
        let (status, _headers, bytes) = read_body(&req_id, resp).await?;
        Ok((status, String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// POST JSON and hand back the live response so the caller can consume
    /// the body incrementally. Non-success statuses are drained and turned
    /// into [`HttpError::Api`].
    pub async fn post_stream<B>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<Response, HttpError>
    where
        B: Serialize + ?Sized,
    {
        let (req_id, resp) = self.send(Method::POST, path, Some(body), &opts).await?;
        if resp.status().is_success() {
            return Ok(resp);
        }
        let (status, headers, bytes) = read_body(&req_id, resp).await?;
        Err(api_error(&req_id, status, &headers, &bytes))
    }

    // ==============================
    // Core request implementation
    // ==============================

    fn resolve(&self, path: &str, allow_absolute: bool) -> Result<Url, HttpError> {
        match &self.base {
            Some(base) => {
                if allow_absolute {
                    if let Ok(abs) = Url::parse(path) {
                        return Ok(abs);
                    }
                }
                base.join(path).map_err(|e| HttpError::Url(e.to_string()))
            }
            None => Url::parse(path).map_err(|e| HttpError::Url(format!("{path}: {e}"))),
        }
    }

    fn build<B>(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&B>,
        opts: &RequestOpts<'_>,
    ) -> Result<(RequestBuilder, Option<Vec<u8>>), HttpError>
    where
        B: Serialize + ?Sized,
    {
        let mut rb = self.inner.request(method.clone(), url.clone());

        if let Some(timeout) = opts.timeout.or(self.default_timeout) {
            rb = rb.timeout(timeout);
        }

        // Serialize ourselves so raw logging sees the exact bytes sent.
        let mut body_bytes = None;
        if let Some(b) = body {
            let bytes = serde_json::to_vec(b).map_err(|e| HttpError::Build(e.to_string()))?;
            rb = rb
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(bytes.clone());
            body_bytes = Some(bytes);
        }

        if let Some(hdrs) = &opts.headers {
            rb = rb.headers(hdrs.clone());
        }

        match &opts.auth {
            Some(Auth::Bearer(tok)) => {
                let tok = sanitize_api_key(tok)?;
                rb = rb.bearer_auth(tok);
            }
            Some(Auth::Header { name, value }) => {
                rb = rb.header(name, value);
            }
            Some(Auth::None) | None => {}
        }

        Ok((rb, body_bytes))
    }

    async fn send<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        opts: &RequestOpts<'_>,
    ) -> Result<(String, Response), HttpError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.resolve(path, opts.allow_absolute)?;
        let (rb, body_bytes) = self.build(&method, &url, body, opts)?;

        let req_id = format!("r{}", Uuid::new_v4().simple());
        let timeout_ms = opts
            .timeout
            .or(self.default_timeout)
            .map(|t| t.as_millis() as u64);

        tracing::debug!(
            req_id=%req_id,
            method=%method,
            host_path=%format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
            ?timeout_ms,
            auth_kind=opts.auth.as_ref().map(Auth::kind).unwrap_or("none"),
            has_body=%body.is_some(),
            "http.request.start"
        );

        if raw_enabled() {
            let mut merged = opts.headers.clone().unwrap_or_default();
            if let Some(Auth::Header { name, value }) = &opts.auth {
                merged.insert(name.clone(), value.clone());
            }
            let curl = make_curl(&method, &url, &merged, body_bytes.as_deref());
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }

        let t0 = Instant::now();
        let resp = rb.send().await.map_err(|err| {
            tracing::warn!(
                req_id=%req_id,
                timeout=err.is_timeout(),
                connect=err.is_connect(),
                message=%err,
                "http.network_error.send"
            );
            HttpError::Network(err.to_string())
        })?;

        tracing::debug!(
            req_id=%req_id,
            status=%resp.status(),
            duration_ms=t0.elapsed().as_millis() as u64,
            content_length=?resp.content_length(),
            x_request_id=%request_id_of(resp.headers()),
            "http.response.headers"
        );

        Ok((req_id, resp))
    }
}

// ==============================
// Helpers
// ==============================

fn build_inner() -> Result<Client, HttpError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .user_agent(concat!("lookout/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| HttpError::Build(e.to_string()))
}

async fn read_body(
    req_id: &str,
    resp: Response,
) -> Result<(StatusCode, HeaderMap, Vec<u8>), HttpError> {
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = resp.bytes().await.map_err(|err| {
        tracing::warn!(
            req_id=%req_id,
            timeout=err.is_timeout(),
            message=%err,
            "http.network_error.body"
        );
        HttpError::Network(err.to_string())
    })?;

    if raw_enabled() {
        let text = String::from_utf8_lossy(&bytes);
        tracing::info!(
            target: "http.raw",
            %req_id,
            %status,
            headers=?redact_headers(&headers),
            body=%truncate_utf8(&text, RAW_MAX_BODY),
            truncated=bytes.len() > RAW_MAX_BODY
        );
    }
    tracing::trace!(
        req_id=%req_id,
        body_len=bytes.len(),
        body_snippet=%snip_body(&bytes),
        "http.response.body_snippet"
    );

    Ok((status, headers, bytes.to_vec()))
}

fn api_error(req_id: &str, status: StatusCode, headers: &HeaderMap, body: &[u8]) -> HttpError {
    let message = extract_error_message(body);
    let request_id = request_id_of(headers).to_string();
    tracing::warn!(
        req_id=%req_id,
        %status,
        message=%message,
        x_request_id=%request_id,
        "http.error"
    );
    HttpError::Api {
        status,
        message,
        request_id,
    }
}

fn request_id_of(headers: &HeaderMap) -> &str {
    headers
        .get("x-request-id")
        .or_else(|| headers.get("x-correlation-id"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
}

fn extract_error_message(body: &[u8]) -> String {
    // OpenAI style: {"error":{"message":"..."}}
    #[derive(Deserialize)]
    struct OpenAiEnv {
        error: OpenAiDetail,
    }
    #[derive(Deserialize)]
    struct OpenAiDetail {
        message: String,
    }

    // Generic: {"message":"..."} or {"detail":"..."} or {"error":"..."}
    #[derive(Deserialize)]
    struct Msg {
        #[serde(default)]
        message: String,
        #[serde(default)]
        detail: String,
        #[serde(default)]
        error: String,
    }

    if let Ok(env) = serde_json::from_slice::<OpenAiEnv>(body) {
        return env.error.message;
    }
    if let Ok(m) = serde_json::from_slice::<Msg>(body) {
        for candidate in [m.message, m.detail, m.error] {
            if !candidate.is_empty() {
                return candidate;
            }
        }
    }
    snip_body(body)
}

fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn snip_body(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let snip = truncate_utf8(&text, SNIPPET_MAX);
    if snip.len() < text.len() {
        format!("{snip}...")
    } else {
        snip.to_string()
    }
}

fn sanitize_api_key(raw: &str) -> Result<String, HttpError> {
    // Trim outer spaces/quotes that sneak in from .env files.
    let mut s = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();

    s.retain(|ch| !ch.is_ascii_whitespace());

    if !s.is_ascii() {
        return Err(HttpError::Build("API key contains non-ASCII bytes".into()));
    }
    if s.bytes().any(|b| b < 0x20 || b == 0x7F) {
        return Err(HttpError::Build(
            "API key contains control characters".into(),
        ));
    }

    HeaderValue::from_str(&format!("Bearer {s}"))
        .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
    Ok(s)
}

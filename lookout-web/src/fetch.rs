use anyhow::Context;
use lookout_common::{LookoutError, Result};
use lookout_http::{HttpClient, RequestOpts};
use std::time::{Duration, Instant};

/// Default bound on a single page download.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Downloads the raw document behind a result link.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_html(&self, url: &str) -> Result<String>;
}

/// Plain GET with a fixed timeout.
///
/// The body is returned whatever its content type or status code; error
/// pages often still carry readable text. Only transport failures fail.
#[derive(Clone)]
pub struct HttpPageFetcher {
    http: HttpClient,
    timeout: Duration,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = HttpClient::unanchored().context("failed to build page fetch client")?;
        Ok(Self { http, timeout })
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        let started = Instant::now();
        let result = self
            .http
            .get_text(
                url,
                RequestOpts {
                    timeout: Some(self.timeout),
                    ..Default::default()
                },
            )
            .await;

        match result {
            Ok((status, body)) => {
                tracing::debug!(
                    target: "web.fetch",
                    %url,
                    status = status.as_u16(),
                    body_len = body.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "fetch.page.success"
                );
                Ok(body)
            }
            Err(e) => {
                tracing::warn!(
                    target: "web.fetch",
                    %url,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "fetch.page.error"
                );
                Err(LookoutError::Fetch(e.to_string()))
            }
        }
    }
}

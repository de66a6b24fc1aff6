//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client
//! - Rotating the User-Agent per request
//! - Retry with randomized, attempt-scaled backoff for transient failures
//! - A politeness delay paid by the calling worker after every fetch
//! - Error classification (permanent vs transient)

use crate::config::FetchSettings;
use rand::Rng;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT};
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum redirect hops followed per request
const MAX_REDIRECTS: usize = 10;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Typed fetch failure; the caller records the URL as failed
#[derive(Debug, Error)]
pub enum FetchError {
    /// Permanent HTTP status (404, 410, other 4xx except 408/429)
    #[error("HTTP {status}")]
    Status { status: u16 },

    /// The redirect chain ended on an error page
    #[error("redirected to error page {final_url}")]
    ErrorPage { final_url: String },

    /// Content-Type is neither HTML nor XML
    #[error("not an HTML document ({content_type})")]
    NotHtml { content_type: String },

    /// Non-retryable request failure (redirect loop, invalid request)
    #[error("request failed: {0}")]
    Request(String),

    /// Transient failures on every attempt of the retry budget
    #[error("gave up after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

impl FetchError {
    /// Returns true if retrying the same URL later would not help
    pub fn is_permanent(&self) -> bool {
        !matches!(self, Self::Exhausted { .. })
    }
}

/// A successfully fetched document
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// Final URL after redirects
    pub final_url: Url,
    pub status: u16,
    pub body: String,
}

/// Outcome of a single attempt
enum AttemptError {
    Permanent(FetchError),
    Transient(String),
}

/// Issues rate-limited GETs with retry and rotating identity headers
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    settings: FetchSettings,
}

impl Fetcher {
    /// Builds the fetcher and its HTTP client
    pub fn new(settings: FetchSettings) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&settings)?;
        Ok(Self { client, settings })
    }

    /// Fetches a URL, retrying transient failures up to the attempt budget
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 404/410, other 4xx | Immediate → `Status` |
    /// | HTTP 408/429/5xx | Retry with backoff |
    /// | Timeout / connection error | Retry with backoff |
    /// | Redirect to an error page | Immediate → `ErrorPage` |
    /// | Non-HTML Content-Type | Immediate → `NotHtml` |
    /// | Redirect loop / chain > 10 | Immediate → `Request` |
    ///
    /// The politeness delay is slept after the final outcome either way.
    pub async fn fetch(&self, url: &Url) -> Result<FetchedDocument, FetchError> {
        let result = self.fetch_with_retries(url).await;

        let pause = self.settings.delay.sample();
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }

        result
    }

    async fn fetch_with_retries(&self, url: &Url) -> Result<FetchedDocument, FetchError> {
        let attempts = self.settings.attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.attempt(url).await {
                Ok(document) => return Ok(document),
                Err(AttemptError::Permanent(e)) => return Err(e),
                Err(AttemptError::Transient(message)) => {
                    tracing::debug!(
                        "Attempt {}/{} for {} failed: {}",
                        attempt,
                        attempts,
                        url,
                        message
                    );
                    last_error = message;

                    if attempt < attempts {
                        let backoff = self.backoff_delay(attempt);
                        if !backoff.is_zero() {
                            tokio::time::sleep(backoff).await;
                        }
                    }
                }
            }
        }

        Err(FetchError::Exhausted {
            attempts,
            last_error,
        })
    }

    async fn attempt(&self, url: &Url) -> Result<FetchedDocument, AttemptError> {
        let user_agent = self.pick_user_agent();

        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, user_agent)
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9,zh-CN;q=0.8")
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        let final_url = response.url().clone();

        if let Some(reason) = classify_status(status) {
            return Err(reason);
        }

        if final_url != *url && is_error_page(&final_url) {
            return Err(AttemptError::Permanent(FetchError::ErrorPage {
                final_url: final_url.to_string(),
            }));
        }

        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            let lowered = content_type.to_ascii_lowercase();
            if !lowered.contains("html") && !lowered.contains("xml") {
                return Err(AttemptError::Permanent(FetchError::NotHtml {
                    content_type: content_type.to_string(),
                }));
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| AttemptError::Transient(format!("body read failed: {}", e)))?;

        Ok(FetchedDocument {
            final_url,
            status: status.as_u16(),
            body,
        })
    }

    /// Picks a User-Agent uniformly at random from the pool
    fn pick_user_agent(&self) -> String {
        let pool = &self.settings.user_agents;
        if pool.is_empty() {
            return concat!("blog-harvester/", env!("CARGO_PKG_VERSION")).to_string();
        }
        let idx = rand::rng().random_range(0..pool.len());
        pool[idx].clone()
    }

    /// Randomized backoff scaled by the attempt number
    fn backoff_delay(&self, attempt: u32) -> Duration {
        self.settings.backoff.sample() * attempt
    }
}

/// Builds an HTTP client with the configured timeouts
///
/// The User-Agent is set per request, not on the client.
pub fn build_http_client(settings: &FetchSettings) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(settings.timeout)
        .connect_timeout(CONNECT_TIMEOUT)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

fn classify_status(status: StatusCode) -> Option<AttemptError> {
    if status.is_success() {
        return None;
    }

    let code = status.as_u16();
    let transient = status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS;

    if transient {
        Some(AttemptError::Transient(format!("HTTP {}", code)))
    } else {
        Some(AttemptError::Permanent(FetchError::Status { status: code }))
    }
}

fn classify_request_error(e: reqwest::Error) -> AttemptError {
    if e.is_timeout() {
        AttemptError::Transient("request timeout".to_string())
    } else if e.is_connect() {
        AttemptError::Transient(format!("connection error: {}", e))
    } else if e.is_redirect() || e.is_builder() {
        AttemptError::Permanent(FetchError::Request(e.to_string()))
    } else {
        AttemptError::Transient(e.to_string())
    }
}

/// Error-page heuristic for redirect targets
fn is_error_page(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    path.contains("404") || path.contains("error")
}

//! Bounded HTTP fetching.
//!
//! Every request is a single GET raced against its own deadline. When the
//! deadline passes, the in-flight request future is dropped, which cancels
//! it and releases the connection. Transport failures of every kind (DNS,
//! TLS, refused connections, timeouts, unreadable bodies) come back as
//! `None`: for this application a site being down is data, not an error.

use crate::error::AuditError;
use reqwest::header::{CONTENT_TYPE, HeaderMap, LAST_MODIFIED};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, instrument};

/// Default client identifier sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!(
    "friend_link_audit/",
    env!("CARGO_PKG_VERSION"),
    " (+friend link activity checker)"
);

/// A response that arrived before its deadline.
///
/// `body` is only read for success statuses; it is empty otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub last_modified: Option<String>,
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Trait for bounded page retrieval.
///
/// Implementors never fail loudly: no response within `timeout`, or any
/// transport failure, is reported as `None`.
pub trait PageFetcher {
    /// Retrieve `url` with a single GET.
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL to request
    /// * `timeout` - Upper bound on the whole exchange, body included
    ///
    /// # Returns
    ///
    /// The final response (any status) or `None` on timeout or transport error.
    async fn fetch(&self, url: &str, timeout: Duration) -> Option<FetchedPage>;
}

/// [`PageFetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher that identifies itself as `user_agent` and follows
    /// up to ten redirects.
    ///
    /// # Errors
    ///
    /// [`AuditError::Client`] if the TLS backend cannot be initialised.
    pub fn new(user_agent: &str) -> Result<Self, AuditError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }
}

fn header_string(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
}

impl PageFetcher for HttpFetcher {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch(&self, url: &str, timeout: Duration) -> Option<FetchedPage> {
        let exchange = async {
            let response = self.client.get(url).send().await?;
            let status = response.status();
            let final_url = response.url().to_string();
            let content_type = header_string(response.headers(), CONTENT_TYPE);
            let last_modified = header_string(response.headers(), LAST_MODIFIED);
            let body = if status.is_success() {
                response.text().await?
            } else {
                String::new()
            };
            Ok::<_, reqwest::Error>(FetchedPage {
                url: final_url,
                status,
                content_type,
                last_modified,
                body,
            })
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok(page)) => {
                debug!(status = %page.status, bytes = page.body.len(), "Fetched");
                Some(page)
            }
            Ok(Err(e)) => {
                debug!(error = %e, "Request failed");
                None
            }
            Err(_) => {
                debug!(?timeout, "Request timed out; cancelled");
                None
            }
        }
    }
}

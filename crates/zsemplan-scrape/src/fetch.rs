//! Concurrent page fetching with per-item failure isolation.
//!
//! ```text
//! requests ──► stream::iter ──► buffered(max_in_flight) ──► Vec<Result<T, FetchError>>
//!                                   │                          (input order)
//!                                   └─ every fetch bounded by one shared deadline
//! ```
//!
//! One failing item never aborts its siblings, and nothing is retried.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use zsemplan_core::config::FetchConfig;

/// A page to fetch: URL plus extra request headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A response body together with where it actually came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub requested_url: String,
    /// URL after redirects.
    pub final_url: String,
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    /// Non-success status or a redirect away from the requested page is a failure.
    ///
    /// The school site answers a missing day with a redirect to its front page
    /// rather than a 404.
    pub fn ensure_served(self) -> Result<Self, FetchError> {
        if !(200..300).contains(&self.status) {
            return Err(FetchError::Status {
                url: self.requested_url,
                status: self.status,
            });
        }
        let requested = reqwest::Url::parse(&self.requested_url)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| self.requested_url.clone());
        if requested != self.final_url {
            return Err(FetchError::Redirected {
                requested: self.requested_url,
                resolved: self.final_url,
            });
        }
        Ok(self)
    }
}

/// Per-item failure. Contained in fan-out results, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("{requested} was redirected to {resolved}")]
    Redirected { requested: String, resolved: String },

    #[error("{url} still pending at the run deadline")]
    DeadlineExceeded { url: String },

    #[error("Could not parse {url}: {reason}")]
    Parse { url: String, reason: String },
}

/// Retrieves one page. Implemented over reqwest and by [`StaticFetcher`].
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedPage, FetchError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanOutOptions {
    pub max_in_flight: usize,
    /// Measured from the start of the fan-out.
    pub deadline: Duration,
}

impl From<&FetchConfig> for FanOutOptions {
    fn from(config: &FetchConfig) -> Self {
        Self {
            max_in_flight: config.max_in_flight,
            deadline: Duration::from_secs(config.deadline_secs),
        }
    }
}

impl Default for FanOutOptions {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

/// Fetch every request and parse each page, returning one result per request in
/// input order. Requests still pending at the deadline fail with
/// [`FetchError::DeadlineExceeded`].
pub async fn fan_out<T, F>(
    fetcher: &dyn PageFetcher,
    requests: &[FetchRequest],
    options: FanOutOptions,
    parse: F,
) -> Vec<Result<T, FetchError>>
where
    F: Fn(FetchedPage) -> Result<T, FetchError> + Sync,
    T: Send,
{
    let deadline = tokio::time::Instant::now() + options.deadline;
    let parse = &parse;

    // Owned requests: a closure over `&FetchRequest` makes this future non-`Send`.
    futures::stream::iter(requests.iter().cloned())
        .map(move |request: FetchRequest| async move {
            let outcome = match tokio::time::timeout_at(deadline, fetcher.fetch(&request)).await {
                Ok(fetched) => fetched.and_then(FetchedPage::ensure_served).and_then(parse),
                Err(_) => Err(FetchError::DeadlineExceeded {
                    url: request.url.clone(),
                }),
            };
            if let Err(e) = &outcome {
                tracing::warn!("⚠️ {e}");
            }
            outcome
        })
        .buffered(options.max_in_flight.max(1))
        .collect()
        .await
}

// ─── Canned pages ───────────────────────────────────────────

#[derive(Debug, Clone)]
enum Canned {
    Page {
        status: u16,
        body: String,
        final_url: Option<String>,
    },
    Unreachable(String),
}

/// Serves canned pages from memory. Unknown URLs answer 404.
/// Every request it receives is kept for inspection.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    pages: HashMap<String, Canned>,
    delays: HashMap<String, Duration>,
    received: Mutex<Vec<FetchRequest>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests received so far, in arrival order.
    pub fn received(&self) -> Vec<FetchRequest> {
        self.received
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(
            url.into(),
            Canned::Page {
                status: 200,
                body: body.into(),
                final_url: None,
            },
        );
        self
    }

    pub fn with_status(mut self, url: impl Into<String>, status: u16) -> Self {
        self.pages.insert(
            url.into(),
            Canned::Page {
                status,
                body: String::new(),
                final_url: None,
            },
        );
        self
    }

    /// Answer `url` with a 200 page that was reached via a redirect to `to`.
    pub fn with_redirect(mut self, url: impl Into<String>, to: impl Into<String>) -> Self {
        self.pages.insert(
            url.into(),
            Canned::Page {
                status: 200,
                body: String::new(),
                final_url: Some(to.into()),
            },
        );
        self
    }

    pub fn with_unreachable(mut self, url: impl Into<String>, reason: impl Into<String>) -> Self {
        self.pages.insert(url.into(), Canned::Unreachable(reason.into()));
        self
    }

    pub fn with_delay(mut self, url: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(url.into(), delay);
        self
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedPage, FetchError> {
        if let Ok(mut received) = self.received.lock() {
            received.push(request.clone());
        }
        if let Some(delay) = self.delays.get(&request.url) {
            tokio::time::sleep(*delay).await;
        }
        match self.pages.get(&request.url) {
            Some(Canned::Page {
                status,
                body,
                final_url,
            }) => Ok(FetchedPage {
                requested_url: request.url.clone(),
                final_url: final_url.clone().unwrap_or_else(|| request.url.clone()),
                status: *status,
                body: body.clone(),
            }),
            Some(Canned::Unreachable(reason)) => Err(FetchError::Transport {
                url: request.url.clone(),
                reason: reason.clone(),
            }),
            None => Ok(FetchedPage {
                requested_url: request.url.clone(),
                final_url: request.url.clone(),
                status: 404,
                body: String::new(),
            }),
        }
    }
}

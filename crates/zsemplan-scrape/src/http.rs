//! reqwest-backed [`PageFetcher`].

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use zsemplan_core::config::SourceConfig;
use zsemplan_core::{Result, ZsemError};

use crate::fetch::{FetchError, FetchRequest, FetchedPage, PageFetcher};

/// Fetches pages over HTTP, following redirects so callers can detect them.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(source: &SourceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(source.user_agent.as_str())
            .timeout(Duration::from_secs(source.request_timeout_secs))
            .build()
            .map_err(|e| ZsemError::Http(format!("Client error: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> std::result::Result<FetchedPage, FetchError> {
        let transport = |e: reqwest::Error| FetchError::Transport {
            url: request.url.clone(),
            reason: e.to_string(),
        };

        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let start = std::time::Instant::now();
        let response = builder.send().await.map_err(transport)?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text().await.map_err(transport)?;

        tracing::debug!(
            "GET {} → {} ({:.0}ms, {} bytes)",
            request.url,
            status,
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(FetchedPage {
            requested_url: request.url.clone(),
            final_url,
            status,
            body,
        })
    }
}

/// `Authorization: Basic base64(user:password)`.
pub fn basic_auth_header(username: &str, password: &str) -> (String, String) {
    let token = base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
    ("Authorization".to_string(), format!("Basic {token}"))
}

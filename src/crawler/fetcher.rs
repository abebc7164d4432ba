//! HTTP fetch collaborator
//!
//! This module handles:
//! - Building the HTTP client with the configured user agent
//! - GET requests with response classification
//! - A bounded pool of in-flight fetches that reports completions and
//!   idleness to the engine as explicit events

use crate::config::UserAgentConfig;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use tokio::task::JoinSet;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched an HTML page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// Response was not HTML
    ContentMismatch {
        /// The Content-Type received
        content_type: String,
    },

    /// Non-2xx response
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, body read failure)
    NetworkError {
        /// Error description
        error: String,
    },
}

impl FetchResult {
    /// Short description of a failed fetch, for logging
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            Self::Success { .. } => None,
            Self::ContentMismatch { content_type } => {
                Some(format!("expected HTML, got {}", content_type))
            }
            Self::HttpError { status_code } => Some(format!("HTTP {}", status_code)),
            Self::NetworkError { error } => Some(error.clone()),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use harvester::config::UserAgentConfig;
/// use harvester::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "Harvester".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and classifies the response
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx, `text/html` or no Content-Type | Success |
/// | 2xx, other Content-Type | ContentMismatch |
/// | non-2xx after redirects | HttpError |
/// | timeout, connect error, body error | NetworkError |
///
/// No retries happen here; a failed URL is simply reported.
pub async fn fetch_url(client: &Client, url: &str) -> FetchResult {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            let error = if e.is_timeout() {
                "Request timeout".to_string()
            } else if e.is_connect() {
                "Connection refused".to_string()
            } else {
                e.to_string()
            };
            return FetchResult::NetworkError { error };
        }
    };

    let status = response.status();
    let final_url = response.url().to_string();

    if !status.is_success() {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
        };
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !content_type.is_empty() && !content_type.contains("text/html") {
        return FetchResult::ContentMismatch { content_type };
    }

    match response.text().await {
        Ok(body) => FetchResult::Success {
            final_url,
            status_code: status.as_u16(),
            body,
        },
        Err(e) => FetchResult::NetworkError {
            error: e.to_string(),
        },
    }
}

/// Event reported by the fetch pool to the engine's control loop
#[derive(Debug)]
pub enum FetchEvent {
    /// A fetch finished (successfully or not)
    Completed { url: String, result: FetchResult },

    /// Nothing is in flight
    Idle,
}

/// Bounded set of concurrently running fetches
pub struct FetchPool {
    client: Client,
    limit: usize,
    tasks: JoinSet<(String, FetchResult)>,
}

impl FetchPool {
    pub fn new(client: Client, limit: usize) -> Self {
        Self {
            client,
            limit: limit.max(1),
            tasks: JoinSet::new(),
        }
    }

    pub fn has_capacity(&self) -> bool {
        self.tasks.len() < self.limit
    }

    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Starts fetching a URL in the background
    pub fn submit(&mut self, url: String) {
        let client = self.client.clone();
        self.tasks.spawn(async move {
            let result = fetch_url(&client, &url).await;
            (url, result)
        });
    }

    /// Waits for the next completion, or reports `Idle` if nothing is running
    ///
    /// Cancel-safe: a completion not yet returned stays in the pool.
    pub async fn next_event(&mut self) -> FetchEvent {
        loop {
            match self.tasks.join_next().await {
                None => return FetchEvent::Idle,
                Some(Ok((url, result))) => return FetchEvent::Completed { url, result },
                Some(Err(e)) => {
                    // The URL is lost with the task; it was never marked visited.
                    tracing::warn!("Fetch task ended abnormally: {}", e);
                }
            }
        }
    }

    /// Abandons every in-flight fetch; returns how many were dropped
    pub fn abort_all(&mut self) -> usize {
        let abandoned = self.tasks.len();
        self.tasks.abort_all();
        self.tasks.detach_all();
        abandoned
    }
}

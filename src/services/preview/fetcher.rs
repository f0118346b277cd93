use std::io::Read;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use ureq::Agent;

use super::head::{extract_head_meta, head_closed};

/// Stop reading a page after this many bytes even if `</head>` never showed up.
pub const MAX_HEAD_BYTES: usize = 512 * 1024;

const READ_CHUNK: usize = 8 * 1024;

/// 预览抓取错误
#[derive(Debug, PartialEq, Eq)]
pub enum FetchError {
    Request(String),
    Status(u16),
    Read(String),
    Timeout,
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request(msg) => write!(f, "request failed: {}", msg),
            Self::Status(code) => write!(f, "destination answered HTTP {}", code),
            Self::Read(msg) => write!(f, "failed to read body: {}", msg),
            Self::Timeout => write!(f, "timed out"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Source of a destination's head metadata.
#[async_trait]
pub trait HeadFetcher: Send + Sync {
    /// Ordered `<meta>` markup from the page at `url`.
    async fn fetch_head(&self, url: &str) -> Result<Vec<String>, FetchError>;
}

/// Fetches pages over HTTP with a shared blocking agent.
pub struct HttpHeadFetcher {
    agent: Agent,
}

impl HttpHeadFetcher {
    pub fn new(timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self { agent }
    }

    fn fetch_sync(agent: Agent, url: String) -> Result<Vec<String>, FetchError> {
        let mut resp = agent
            .get(&url)
            .header("Accept", "text/html,application/xhtml+xml")
            .header(
                "User-Agent",
                concat!("bridge/", env!("CARGO_PKG_VERSION"), " (link preview)"),
            )
            .call()
            .map_err(|e| match e {
                ureq::Error::StatusCode(code) => FetchError::Status(code),
                ureq::Error::Timeout(_) => FetchError::Timeout,
                other => FetchError::Request(other.to_string()),
            })?;

        let mut reader = resp.body_mut().as_reader();
        let mut buf = Vec::with_capacity(READ_CHUNK);
        let mut chunk = [0u8; READ_CHUNK];
        while buf.len() < MAX_HEAD_BYTES {
            let n = reader
                .read(&mut chunk)
                .map_err(|e| FetchError::Read(e.to_string()))?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if head_closed(&buf) {
                break;
            }
        }
        buf.truncate(MAX_HEAD_BYTES);

        let html = String::from_utf8_lossy(&buf);
        let tags = extract_head_meta(&html);
        debug!("Fetched {} bytes from {}, {} meta tags", buf.len(), url, tags.len());
        Ok(tags)
    }
}

#[async_trait]
impl HeadFetcher for HttpHeadFetcher {
    async fn fetch_head(&self, url: &str) -> Result<Vec<String>, FetchError> {
        let agent = self.agent.clone();
        let url = url.to_string();
        tokio::task::spawn_blocking(move || Self::fetch_sync(agent, url))
            .await
            .map_err(|e| FetchError::Request(format!("fetch task failed: {}", e)))?
    }
}

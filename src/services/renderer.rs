//! Redirect response rendering
//!
//! Plain mode is an HTTP redirect. Enriched mode returns a small HTML page
//! carrying the destination's `<meta>` tags (for link-preview crawlers) and a
//! script redirect. Enrichment is best effort: any fetch failure or timeout
//! falls back to the exact plain-mode response.

use std::sync::Arc;
use std::time::Duration;

use actix_web::http::StatusCode;
use tracing::{debug, warn};

use crate::config::{RedirectConfig, RedirectStatus};

use super::preview::{FetchError, HeadFetcher, HttpHeadFetcher, escape_html};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedRedirect {
    Redirect { status: StatusCode, location: String },
    Html { location: String, body: String },
}

impl RenderedRedirect {
    pub fn location(&self) -> &str {
        match self {
            Self::Redirect { location, .. } | Self::Html { location, .. } => location,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Redirect { status, .. } => *status,
            Self::Html { .. } => StatusCode::OK,
        }
    }
}

/// How a response came to be plain or enriched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enrichment {
    Disabled,
    Enriched,
    Degraded,
}

impl Enrichment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Enrichment::Disabled => "disabled",
            Enrichment::Enriched => "enriched",
            Enrichment::Degraded => "degraded",
        }
    }
}

pub struct RedirectRenderer {
    status: RedirectStatus,
    fetcher: Option<Arc<dyn HeadFetcher>>,
    timeout: Duration,
}

impl RedirectRenderer {
    /// Plain redirects only.
    pub fn new(status: RedirectStatus) -> Self {
        Self {
            status,
            fetcher: None,
            timeout: Duration::from_secs(2),
        }
    }

    pub fn with_enrichment(mut self, fetcher: Arc<dyn HeadFetcher>, timeout: Duration) -> Self {
        self.fetcher = Some(fetcher);
        self.timeout = timeout;
        self
    }

    pub fn from_config(config: &RedirectConfig) -> Self {
        let renderer = Self::new(config.status);
        if config.enrich {
            let timeout = config.enrich_timeout();
            renderer.with_enrichment(Arc::new(HttpHeadFetcher::new(timeout)), timeout)
        } else {
            renderer
        }
    }

    pub fn enrichment_enabled(&self) -> bool {
        self.fetcher.is_some()
    }

    pub fn plain(&self, destination: &str) -> RenderedRedirect {
        RenderedRedirect::Redirect {
            status: self.status.status_code(),
            location: destination.to_string(),
        }
    }

    /// Never fails: without a usable preview the plain redirect is returned.
    pub async fn render(&self, destination: &str) -> (RenderedRedirect, Enrichment) {
        let Some(fetcher) = &self.fetcher else {
            return (self.plain(destination), Enrichment::Disabled);
        };

        let fetched = match tokio::time::timeout(self.timeout, fetcher.fetch_head(destination)).await
        {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        };

        match fetched {
            Ok(tags) => {
                debug!("Enriching redirect to {} with {} tags", destination, tags.len());
                let body = enriched_document(destination, &tags);
                (
                    RenderedRedirect::Html {
                        location: destination.to_string(),
                        body,
                    },
                    Enrichment::Enriched,
                )
            }
            Err(e) => {
                warn!("Preview fetch for {} failed, plain redirect: {}", destination, e);
                (self.plain(destination), Enrichment::Degraded)
            }
        }
    }
}

fn enriched_document(destination: &str, tags: &[String]) -> String {
    let href = escape_html(destination);
    format!(
        concat!(
            "<!DOCTYPE html><html><head>{tags}</head><body>",
            "<noscript><a href=\"{href}\">Click here to continue to: {href}</a></noscript>",
            "<script>window.location.replace(\"{js}\");</script>",
            "</body></html>"
        ),
        tags = tags.concat(),
        href = href,
        js = escape_js_string(destination),
    )
}

/// Escape for a double-quoted string inside an inline `<script>`.
fn escape_js_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(c),
        }
    }
    out
}

//! Destination page metadata used by enriched redirects

mod fetcher;
mod head;

pub use fetcher::{FetchError, HeadFetcher, HttpHeadFetcher, MAX_HEAD_BYTES};
pub use head::{escape_html, extract_head_meta, head_closed};

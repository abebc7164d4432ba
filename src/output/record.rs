use serde::{Deserialize, Serialize};

/// One extracted page, written exactly once to exactly one shard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlRecord {
    /// Final URL of the page (after redirects)
    pub url: String,

    /// Cleaned plain text
    pub text: String,

    /// Top-level domain of `url`
    pub domain: String,

    /// Cross-domain links in document order, without duplicates
    pub links: Vec<String>,

    pub title: String,
}

impl CrawlRecord {
    /// Serializes the record as a single JSON line
    ///
    /// `serde_json` escapes control characters inside strings, so the output
    /// never contains a raw newline. Shard repair relies on this.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for the harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    /// Seed URL prefixes: the initial frontier and the traversal allow-list
    pub seeds: Vec<String>,
    #[serde(default)]
    pub filter: FilterConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Maximum number of fetches in flight at once
    pub max_concurrent_fetches: u32,

    /// Pages whose cleaned text is shorter than this are not recorded
    pub min_text_length: usize,

    /// Seconds without a heartbeat before the watchdog stops the engine
    pub idle_timeout_secs: u64,

    /// Watchdog poll cadence (milliseconds)
    pub poll_interval_ms: u64,

    /// How long in-flight fetches may keep running once draining starts
    pub drain_grace_secs: u64,

    /// Wall-clock lifetime of one output shard
    pub shard_interval_secs: u64,

    /// Fixed pause between two supervisor cycles (milliseconds)
    pub restart_delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 16,
            min_text_length: 100,
            idle_timeout_secs: 60,
            poll_interval_ms: 1000,
            drain_grace_secs: 10,
            shard_interval_secs: 60,
            restart_delay_ms: 1000,
        }
    }
}

impl CrawlerConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn drain_grace(&self) -> Duration {
        Duration::from_secs(self.drain_grace_secs)
    }

    pub fn shard_interval(&self) -> Duration {
        Duration::from_secs(self.shard_interval_secs)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

impl UserAgentConfig {
    /// Formats the `User-Agent` header value: `Name/Version (+contact-url)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory holding the shard files (and, by default, the URL lists)
    pub data_dir: String,

    /// Append-only list of visited URLs, one per line
    #[serde(default = "default_visited_file")]
    pub visited_file: String,

    /// Append-only list of discovered top-level domains, one per line
    #[serde(default = "default_domains_file")]
    pub domains_file: String,

    /// File name prefix for shards
    #[serde(default = "default_shard_prefix")]
    pub shard_prefix: String,
}

fn default_visited_file() -> String {
    "visited_urls.txt".to_string()
}

fn default_domains_file() -> String {
    "linked_domains.txt".to_string()
}

fn default_shard_prefix() -> String {
    "extracted_text".to_string()
}

impl OutputConfig {
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    /// Path of the visited-URL list; relative paths resolve against `data_dir`
    pub fn visited_path(&self) -> PathBuf {
        self.resolve(&self.visited_file)
    }

    /// Path of the discovered-domain list; relative paths resolve against `data_dir`
    pub fn domains_path(&self) -> PathBuf {
        self.resolve(&self.domains_file)
    }

    fn resolve(&self, file: &str) -> PathBuf {
        let path = Path::new(file);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir().join(path)
        }
    }
}

/// Link filtering configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FilterConfig {
    /// Substrings that disqualify a link wherever they appear in it
    pub deny: Vec<String>,

    /// Path suffixes of non-text assets that are never fetched
    pub skip_extensions: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            deny: DEFAULT_DENY_LIST.iter().map(|s| s.to_string()).collect(),
            skip_extensions: DEFAULT_SKIP_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Tracking, social, shortener and mailing-provider fragments
pub const DEFAULT_DENY_LIST: &[&str] = &[
    "facebook",
    "twitter",
    "instagram",
    "linkedin",
    "youtube",
    "pinterest",
    "snapchat",
    "reddit",
    "google",
    "amazon",
    "microsoft",
    "apple",
    "wikipedia",
    "tiktok",
    "adobe.com",
    "onetrust",
    "zoom",
    "youtu.be",
    "trello",
    "slack",
    "github",
    "bit.ly",
    "tinyurl",
    "ow.ly",
    "buff.ly",
    "dlvr.it",
    "ift.tt",
    "feedburner",
    "feedblitz",
    "feedproxy",
    "feedly",
    "mailchimp",
    "constantcontact",
    "aweber",
    "getresponse",
    "sendgrid",
    "sendinblue",
    "mailgun",
    "mailerlite",
    "moosend",
    "convertkit",
    "drip",
    "activecampaign",
    "hubspot",
    "salesforce",
    "zoho",
    "tel:",
];

pub const DEFAULT_SKIP_EXTENSIONS: &[&str] = &[".png", ".jpg", ".svg", ".pdf"];

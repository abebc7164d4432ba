//! Link filtering
//!
//! Decides which hyperlinks are followed and which are reported as
//! cross-domain links. Both decisions are pure string predicates over the
//! configured seed prefixes and deny-list.

use crate::config::{Config, FilterConfig};
use crate::url::domain::{top_level_domain, top_level_domain_of};
use std::collections::HashSet;
use url::Url;

/// Why a link was or was not accepted for traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkVerdict {
    /// Link will be enqueued
    Crawlable,
    /// A deny-list fragment appears somewhere in the URL
    Denied,
    /// Path ends with a non-text extension
    Asset,
    /// URL does not start with any seed prefix
    OffSeed,
}

impl LinkVerdict {
    pub fn is_crawlable(&self) -> bool {
        matches!(self, Self::Crawlable)
    }
}

/// Traversal and reporting predicate built from the configuration
#[derive(Debug, Clone)]
pub struct LinkFilter {
    seeds: Vec<String>,
    deny: Vec<String>,
    skip_extensions: Vec<String>,
    seed_domains: HashSet<String>,
}

impl LinkFilter {
    pub fn new(seeds: &[String], filter: &FilterConfig) -> Self {
        let seed_domains = seeds
            .iter()
            .filter_map(|seed| top_level_domain_of(seed))
            .collect();

        Self {
            seeds: seeds.to_vec(),
            deny: filter.deny.clone(),
            skip_extensions: filter
                .skip_extensions
                .iter()
                .map(|ext| ext.to_lowercase())
                .collect(),
            seed_domains,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.seeds, &config.filter)
    }

    /// Classifies a link for traversal
    ///
    /// Rules apply in order: deny-list substring, non-text extension, seed
    /// prefix. The seed check is a literal prefix match on the URL string.
    pub fn verdict(&self, url: &str) -> LinkVerdict {
        if self.is_denied(url) {
            LinkVerdict::Denied
        } else if self.is_asset(url) {
            LinkVerdict::Asset
        } else if !self.has_seed_prefix(url) {
            LinkVerdict::OffSeed
        } else {
            LinkVerdict::Crawlable
        }
    }

    pub fn is_crawlable(&self, url: &str) -> bool {
        self.verdict(url).is_crawlable()
    }

    /// True if any deny-list fragment occurs anywhere in the URL
    pub fn is_denied(&self, url: &str) -> bool {
        self.deny.iter().any(|fragment| url.contains(fragment.as_str()))
    }

    /// True if the URL path ends with one of the skipped extensions
    pub fn is_asset(&self, url: &str) -> bool {
        let path = match Url::parse(url) {
            Ok(parsed) => parsed.path().to_lowercase(),
            Err(_) => url.to_lowercase(),
        };
        self.skip_extensions.iter().any(|ext| path.ends_with(ext))
    }

    pub fn has_seed_prefix(&self, url: &str) -> bool {
        self.seeds.iter().any(|seed| url.starts_with(seed.as_str()))
    }

    /// Whether a link belongs in a record's cross-domain link list
    ///
    /// Denied links are never reported, and neither is anything sharing the
    /// referring page's top-level domain. Links without a host are dropped.
    pub fn is_reportable(&self, url: &str, referrer_domain: &str) -> bool {
        if self.is_denied(url) {
            return false;
        }
        match top_level_domain_of(url) {
            Some(domain) => domain != top_level_domain(referrer_domain),
            None => false,
        }
    }

    /// True if the top-level domain belongs to one of the seeds
    pub fn is_seed_domain(&self, domain: &str) -> bool {
        self.seed_domains.contains(domain)
    }

    pub fn seeds(&self) -> &[String] {
        &self.seeds
    }
}

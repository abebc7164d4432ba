//! URL handling for the harvester
//!
//! Domain extraction, the two-label "top-level domain" used for all domain
//! comparisons, link resolution, and the link filter.

mod domain;
mod filter;

pub use domain::{extract_domain, top_level_domain, top_level_domain_of};
pub use filter::{LinkFilter, LinkVerdict};

use url::Url;

/// Resolves an `href` against the page URL
///
/// Returns None for links that can never be fetched:
/// - `javascript:`, `mailto:` and `data:` schemes
/// - fragment-only links (same page anchors)
/// - hrefs that do not resolve to http(s)
///
/// `tel:` links are left to the deny-list.
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:") || lower.starts_with("mailto:") || lower.starts_with("data:")
    {
        return None;
    }

    if lower.starts_with("tel:") {
        return Some(href.to_string());
    }

    let absolute = base_url.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://www.cdc.gov/flu/index.html").unwrap()
    }

    #[test]
    fn test_resolve_relative_links() {
        assert_eq!(
            resolve_link("/vaccines/", &base_url()),
            Some("https://www.cdc.gov/vaccines/".to_string())
        );
        assert_eq!(
            resolve_link("symptoms.html", &base_url()),
            Some("https://www.cdc.gov/flu/symptoms.html".to_string())
        );
    }

    #[test]
    fn test_absolute_link_kept() {
        assert_eq!(
            resolve_link("https://www.nih.gov/", &base_url()),
            Some("https://www.nih.gov/".to_string())
        );
    }

    #[test]
    fn test_unfetchable_schemes_dropped() {
        assert_eq!(resolve_link("javascript:void(0)", &base_url()), None);
        assert_eq!(resolve_link("mailto:a@cdc.gov", &base_url()), None);
        assert_eq!(resolve_link("data:text/html,hi", &base_url()), None);
        assert_eq!(resolve_link("ftp://files.cdc.gov/", &base_url()), None);
    }

    #[test]
    fn test_fragment_only_and_empty_dropped() {
        assert_eq!(resolve_link("#main", &base_url()), None);
        assert_eq!(resolve_link("   ", &base_url()), None);
    }

    #[test]
    fn test_tel_links_left_for_deny_list() {
        assert_eq!(
            resolve_link("tel:+18002324636", &base_url()),
            Some("tel:+18002324636".to_string())
        );
    }
}

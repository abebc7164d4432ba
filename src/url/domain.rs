use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use harvester::url::extract_domain;
///
/// let url = Url::parse("https://WWW.CDC.gov/flu").unwrap();
/// assert_eq!(extract_domain(&url), Some("www.cdc.gov".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Reduces a host to its last two dot-separated labels
///
/// Hosts with fewer than two labels are returned unchanged. No public
/// suffix list is consulted, so `bbc.co.uk` collapses to `co.uk`.
///
/// # Examples
///
/// ```
/// use harvester::url::top_level_domain;
///
/// assert_eq!(top_level_domain("www.ncbi.nlm.nih.gov"), "nih.gov");
/// assert_eq!(top_level_domain("localhost"), "localhost");
/// ```
pub fn top_level_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_lowercase();
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() >= 2 {
        labels[labels.len() - 2..].join(".")
    } else {
        host
    }
}

/// Top-level domain of a URL string, if it parses and has a host
pub fn top_level_domain_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    extract_domain(&parsed).map(|host| top_level_domain(&host))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_domain() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("https://example.com:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_uppercase_converted_to_lowercase() {
        let url = Url::parse("https://Example.COM/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_top_level_domain_of_subdomains() {
        assert_eq!(top_level_domain("www.healthline.com"), "healthline.com");
        assert_eq!(top_level_domain("a.b.c.who.int"), "who.int");
        assert_eq!(top_level_domain("medlineplus.gov"), "medlineplus.gov");
    }

    #[test]
    fn test_top_level_domain_single_label() {
        assert_eq!(top_level_domain("localhost"), "localhost");
        assert_eq!(top_level_domain(""), "");
    }

    #[test]
    fn test_top_level_domain_trailing_dot_and_case() {
        assert_eq!(top_level_domain("WWW.NIH.GOV."), "nih.gov");
    }

    #[test]
    fn test_top_level_domain_ip_address() {
        // Last two octets; good enough for loopback test servers
        assert_eq!(top_level_domain("127.0.0.1"), "0.1");
    }

    #[test]
    fn test_top_level_domain_of_url() {
        assert_eq!(
            top_level_domain_of("https://www.mayoclinic.org/diseases"),
            Some("mayoclinic.org".to_string())
        );
        assert_eq!(top_level_domain_of("not a url"), None);
        assert_eq!(top_level_domain_of("mailto:someone@example.com"), None);
    }
}

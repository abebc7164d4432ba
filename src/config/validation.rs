use crate::config::types::{Config, CrawlerConfig, FilterConfig, OutputConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_seeds(&config.seeds)?;
    validate_filter_config(&config.filter)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 256 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_fetches must be between 1 and 256, got {}",
            config.max_concurrent_fetches
        )));
    }

    if config.idle_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "idle_timeout_secs must be > 0".to_string(),
        ));
    }

    if config.poll_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "poll_interval_ms must be > 0".to_string(),
        ));
    }

    // The watchdog has to observe the timeout within one poll.
    if config.poll_interval() >= config.idle_timeout() {
        return Err(ConfigError::Validation(format!(
            "poll_interval_ms ({}) must be shorter than idle_timeout_secs ({}s)",
            config.poll_interval_ms, config.idle_timeout_secs
        )));
    }

    if config.shard_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "shard_interval_secs must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.data_dir.is_empty() {
        return Err(ConfigError::Validation(
            "data_dir cannot be empty".to_string(),
        ));
    }

    if config.visited_file.is_empty() || config.domains_file.is_empty() {
        return Err(ConfigError::Validation(
            "visited_file and domains_file cannot be empty".to_string(),
        ));
    }

    if config.shard_prefix.is_empty() || config.shard_prefix.contains(['/', '\\']) {
        return Err(ConfigError::Validation(format!(
            "shard_prefix must be a non-empty file name prefix, got '{}'",
            config.shard_prefix
        )));
    }

    Ok(())
}

/// Validates the seed prefixes
fn validate_seeds(seeds: &[String]) -> Result<(), ConfigError> {
    if seeds.is_empty() {
        return Err(ConfigError::Validation(
            "at least one seed URL is required".to_string(),
        ));
    }

    for seed in seeds {
        let url = Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use http or https",
                seed
            )));
        }

        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "Seed URL '{}' has no host",
                seed
            )));
        }
    }

    Ok(())
}

/// Validates the deny-list and extension list
fn validate_filter_config(config: &FilterConfig) -> Result<(), ConfigError> {
    // An empty fragment would be a substring of every URL.
    if config.deny.iter().any(|d| d.is_empty()) {
        return Err(ConfigError::Validation(
            "deny-list entries cannot be empty".to_string(),
        ));
    }

    if config.skip_extensions.iter().any(|e| e.is_empty()) {
        return Err(ConfigError::Validation(
            "skip_extensions entries cannot be empty".to_string(),
        ));
    }

    Ok(())
}

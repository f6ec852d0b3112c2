use crate::config::lexicon::Lexicon;
use crate::config::types::{Config, CrawlerConfig, ProxyConfig, RenderConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_proxy_config(&config.proxy)?;
    validate_render_config(&config.render)?;
    validate_lexicon(&config.lexicon)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if !(config.requests_per_second > 0.0 && config.requests_per_second <= 50.0) {
        return Err(ConfigError::Validation(format!(
            "requests_per_second must be in (0, 50], got {}",
            config.requests_per_second
        )));
    }

    if config.request_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_ms must be >= 100ms, got {}ms",
            config.request_timeout_ms
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.backoff_max_ms < config.backoff_base_ms {
        return Err(ConfigError::Validation(format!(
            "backoff_max_ms ({}) must be >= backoff_base_ms ({})",
            config.backoff_max_ms, config.backoff_base_ms
        )));
    }

    if config.max_body_bytes < 1024 {
        return Err(ConfigError::Validation(format!(
            "max_body_bytes must be >= 1024, got {}",
            config.max_body_bytes
        )));
    }

    if config.max_files > 0 && config.max_file_bytes < 1024 {
        return Err(ConfigError::Validation(format!(
            "max_file_bytes must be >= 1024 when downloads are enabled, got {}",
            config.max_file_bytes
        )));
    }

    if config.text_sample_chars == 0 || config.signal_text_chars == 0 {
        return Err(ConfigError::Validation(
            "text_sample_chars and signal_text_chars must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.robots_token.is_empty() {
        return Err(ConfigError::Validation(
            "robots_token cannot be empty".to_string(),
        ));
    }

    if !config
        .robots_token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "robots_token must contain only alphanumeric characters, '-' or '_', got '{}'",
            config.robots_token
        )));
    }

    validate_user_agent_pool(&config.pool)
}

/// Validates a user-agent pool (also used for per-request pools)
pub(crate) fn validate_user_agent_pool(pool: &[String]) -> Result<(), ConfigError> {
    if pool.is_empty() {
        return Err(ConfigError::Validation(
            "user agent pool cannot be empty".to_string(),
        ));
    }

    if let Some(bad) = pool
        .iter()
        .find(|ua| ua.trim().is_empty() || ua.chars().any(|c| c.is_control()))
    {
        return Err(ConfigError::Validation(format!(
            "invalid user agent entry: {:?}",
            bad
        )));
    }

    Ok(())
}

/// Validates outbound proxy configuration
fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    validate_proxy_pool(&config.pool)
}

/// Validates a proxy pool (also used for per-request pools)
pub(crate) fn validate_proxy_pool(pool: &[String]) -> Result<(), ConfigError> {
    for proxy in pool {
        let url = Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "Proxy '{}' must use http or https",
                proxy
            )));
        }
    }
    Ok(())
}

/// Validates render fallback configuration
fn validate_render_config(config: &RenderConfig) -> Result<(), ConfigError> {
    if config.timeout_ms < 1000 {
        return Err(ConfigError::Validation(format!(
            "render timeout_ms must be >= 1000ms, got {}ms",
            config.timeout_ms
        )));
    }

    if config.viewport_width < 320 || config.viewport_height < 240 {
        return Err(ConfigError::Validation(format!(
            "render viewport too small: {}x{}",
            config.viewport_width, config.viewport_height
        )));
    }

    if matches!(&config.screenshot_dir, Some(dir) if dir.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "screenshot_dir cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates the keyword lexicon
fn validate_lexicon(lexicon: &Lexicon) -> Result<(), ConfigError> {
    if lexicon.version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "lexicon version cannot be empty".to_string(),
        ));
    }

    for (name, list) in [
        ("niche-terms", &lexicon.niche_terms),
        ("partner-indicators", &lexicon.partner_indicators),
        ("client-indicators", &lexicon.client_indicators),
        ("evidence-keywords", &lexicon.evidence_keywords),
        ("exclude-keywords", &lexicon.exclude_keywords),
        ("important-keywords", &lexicon.important_keywords),
    ] {
        if list.iter().any(|term| term.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "lexicon {} contains an empty term",
                name
            )));
        }
    }

    Ok(())
}

use crate::config::types::{
    AgentConfig, Config, CrawlerConfig, IndexConfig, OutputConfig, SiteConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_index_config(&config.index)?;
    validate_agent_config(&config.agent)?;
    Ok(())
}

/// Validates the site description
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let base = parse_http_url("base-url", &config.base_url)?;
    let start = parse_http_url("start-url", &config.start_url)?;

    if base.origin() != start.origin() {
        return Err(ConfigError::Validation(format!(
            "start-url '{}' must share the origin of base-url '{}'",
            config.start_url, config.base_url
        )));
    }

    if config.navigation_pattern.trim().is_empty() {
        return Err(ConfigError::Validation(
            "navigation-pattern cannot be empty".to_string(),
        ));
    }

    if config.document_pattern.trim().is_empty() {
        return Err(ConfigError::Validation(
            "document-pattern cannot be empty".to_string(),
        ));
    }

    if config.navigation_pattern == config.document_pattern {
        return Err(ConfigError::Validation(
            "navigation-pattern and document-pattern must differ".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 || config.batch_size > 32 {
        return Err(ConfigError::Validation(format!(
            "batch-size must be between 1 and 32, got {}",
            config.batch_size
        )));
    }

    if config.page_delay_ms > 60_000 || config.batch_delay_ms > 60_000 {
        return Err(ConfigError::Validation(
            "politeness delays must not exceed 60000ms".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
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

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "data-dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_index_config(config: &IndexConfig) -> Result<(), ConfigError> {
    if config.index_name.is_empty() {
        return Err(ConfigError::Validation(
            "index-name cannot be empty".to_string(),
        ));
    }

    if config.dimension == 0 {
        return Err(ConfigError::Validation(
            "index dimension must be positive".to_string(),
        ));
    }

    if config.batch_size < 1 || config.batch_size > 1000 {
        return Err(ConfigError::Validation(format!(
            "index batch-size must be between 1 and 1000, got {}",
            config.batch_size
        )));
    }

    parse_http_url("control-url", &config.control_url)?;
    Ok(())
}

fn validate_agent_config(config: &AgentConfig) -> Result<(), ConfigError> {
    if config.top_k == 0 {
        return Err(ConfigError::Validation("top-k must be positive".to_string()));
    }

    if !(0.0..=2.0).contains(&config.temperature) {
        return Err(ConfigError::Validation(format!(
            "temperature must be between 0.0 and 2.0, got {}",
            config.temperature
        )));
    }

    parse_http_url("api-url", &config.api_url)?;
    Ok(())
}

fn parse_http_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use HTTP or HTTPS",
            field, value
        )));
    }

    Ok(url)
}

/// Validates an email address (basic validation)
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid contact_email: '{}'",
            email
        )));
    }

    Ok(())
}

use crate::config::types::{
    ClientConfig, Config, CrawlerConfig, EngineConfig, StorageConfig, UserAgentConfig,
    MAX_DESIRED_PAGES, MAX_INTERRUPTED_RETRY_HOURS, MAX_PROBLEM_RETRY_MINUTES,
    MAX_REFRESH_PERIOD_DAYS,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_engine_config(&config.engine)?;
    validate_client_config(&config.client)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.desired_number_of_pages < 1 || config.desired_number_of_pages > MAX_DESIRED_PAGES {
        return Err(ConfigError::Validation(format!(
            "desired_number_of_pages must be between 1 and {}, got {}",
            MAX_DESIRED_PAGES, config.desired_number_of_pages
        )));
    }

    if config.max_crawl_delay < config.crawl_delay {
        return Err(ConfigError::Validation(format!(
            "max_crawl_delay must be >= crawl_delay, got {}ms and {}ms",
            config.max_crawl_delay, config.crawl_delay
        )));
    }

    if config.max_simultaneous_requests < 1 || config.max_simultaneous_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max_simultaneous_requests must be between 1 and 100, got {}",
            config.max_simultaneous_requests
        )));
    }

    if config.checkpoint_interval < 1 {
        return Err(ConfigError::Validation(
            "checkpoint_interval must be >= 1".to_string(),
        ));
    }

    if config.request_timeout < 1 || config.robots_timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "request and robots timeouts must be >= 1s, got {}s and {}s",
            config.request_timeout, config.robots_timeout
        )));
    }

    if config.retry_attempts < 1 {
        return Err(ConfigError::Validation(
            "retry_attempts must be >= 1".to_string(),
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
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler_version cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}

fn validate_engine_config(config: &EngineConfig) -> Result<(), ConfigError> {
    if config.max_capacity < 1 {
        return Err(ConfigError::Validation(
            "max_capacity must be >= 1".to_string(),
        ));
    }

    if config.poll_interval < 1 {
        return Err(ConfigError::Validation(
            "poll_interval must be >= 1ms".to_string(),
        ));
    }

    Ok(())
}

fn validate_client_config(config: &ClientConfig) -> Result<(), ConfigError> {
    if config.refresh_period_days < 0
        || config.problem_retry_minutes < 0
        || config.interrupted_retry_hours < 0
    {
        return Err(ConfigError::Validation(
            "client refresh periods cannot be negative".to_string(),
        ));
    }

    if config.refresh_period_days > MAX_REFRESH_PERIOD_DAYS
        || config.problem_retry_minutes > MAX_PROBLEM_RETRY_MINUTES
        || config.interrupted_retry_hours > MAX_INTERRUPTED_RETRY_HOURS
    {
        return Err(ConfigError::Validation(format!(
            "client refresh periods cannot exceed {} days",
            MAX_REFRESH_PERIOD_DAYS
        )));
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.queue_clean_interval < 1 {
        return Err(ConfigError::Validation(
            "queue_clean_interval must be >= 1".to_string(),
        ));
    }

    Ok(())
}

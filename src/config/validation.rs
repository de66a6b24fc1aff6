use crate::config::types::{
    Config, CrawlerConfig, ExtractorConfig, FetcherConfig, OutputConfig, SiteConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_extractor_config(&config.extractor)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the site section: base URL, seeds and listing templates
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let base = parse_http_url("base-url", &config.base_url)?;

    for seed in &config.seeds {
        let url = parse_http_url("seed", seed)?;
        if url.origin() != base.origin() {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' is not on the same origin as base-url '{}'",
                seed, config.base_url
            )));
        }
    }

    for template in &config.listing_templates {
        if !template.contains("{page}") && !template.contains("{offset}") {
            return Err(ConfigError::Validation(format!(
                "Listing template '{}' must contain a {{page}} or {{offset}} placeholder",
                template
            )));
        }

        // Placeholders are not valid URL syntax everywhere; check a rendered sample
        let sample = template
            .replace("{page}", "1")
            .replace("{offset}", "0")
            .replace("{size}", "20");
        parse_http_url("listing template", &sample)?;
    }

    if config.listing_page_size < 1 {
        return Err(ConfigError::Validation(
            "listing-page-size must be >= 1".to_string(),
        ));
    }

    if config.reseed_window < 1 {
        return Err(ConfigError::Validation(
            "reseed-window must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 64, got {}",
            config.workers
        )));
    }

    if config.batch_multiplier < 1 {
        return Err(ConfigError::Validation(
            "batch-multiplier must be >= 1".to_string(),
        ));
    }

    if config.target_posts < 1 {
        return Err(ConfigError::Validation(
            "target-posts must be >= 1".to_string(),
        ));
    }

    if config.max_empty_rounds < 1 {
        return Err(ConfigError::Validation(
            "max-empty-rounds must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates fetcher configuration after profile resolution
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    let settings = config.resolve();

    if settings.attempts < 1 {
        return Err(ConfigError::Validation(
            "retries must be >= 1 (it counts total attempts)".to_string(),
        ));
    }

    if !settings.delay.is_valid() {
        return Err(ConfigError::Validation(format!(
            "delay range is inverted: {}ms > {}ms",
            settings.delay.min_ms, settings.delay.max_ms
        )));
    }

    if !settings.backoff.is_valid() {
        return Err(ConfigError::Validation(format!(
            "backoff range is inverted: {}ms > {}ms",
            settings.backoff.min_ms, settings.backoff.max_ms
        )));
    }

    if settings.user_agents.is_empty() {
        return Err(ConfigError::Validation(
            "user-agents must contain at least one entry".to_string(),
        ));
    }

    if settings.user_agents.iter().any(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user-agents cannot contain empty strings".to_string(),
        ));
    }

    Ok(())
}

/// Validates extractor thresholds
fn validate_extractor_config(config: &ExtractorConfig) -> Result<(), ConfigError> {
    if config.summary_length < 10 {
        return Err(ConfigError::Validation(format!(
            "summary-length must be >= 10, got {}",
            config.summary_length
        )));
    }

    if config.max_title_length < 1 {
        return Err(ConfigError::Validation(
            "max-title-length must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.corpus_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "corpus-path cannot be empty".to_string(),
        ));
    }

    if let Some(cache_path) = &config.cache_path {
        if cache_path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "cache-path cannot be empty when set".to_string(),
            ));
        }
        if cache_path == &config.corpus_path {
            return Err(ConfigError::Validation(
                "cache-path and corpus-path must differ".to_string(),
            ));
        }
    }

    Ok(())
}

/// Parses a URL and requires an HTTP(S) scheme with a host
fn parse_http_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use HTTP or HTTPS",
            field, value
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' has no host",
            field, value
        )));
    }

    Ok(url)
}

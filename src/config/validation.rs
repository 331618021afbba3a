use crate::catalog::{CatalogUrl, COLLECTION_PLACEHOLDER};
use crate::config::types::{
    CatalogConfig, Config, CrawlConfig, HttpConfig, RetryConfig, StorageConfig, UpdaterConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_catalog_config(&config.catalog)?;
    validate_http_config(&config.http)?;
    validate_retry_config(&config.retry)?;
    validate_crawl_config(&config.crawl)?;
    validate_updater_config(&config.updater)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates the catalog section
fn validate_catalog_config(config: &CatalogConfig) -> Result<(), ConfigError> {
    validate_collection_name(&config.collection)?;

    if !config.url_template.contains(COLLECTION_PLACEHOLDER) {
        return Err(ConfigError::Validation(format!(
            "url-template must contain '{}', got '{}'",
            COLLECTION_PLACEHOLDER, config.url_template
        )));
    }

    let catalog = CatalogUrl::new(&config.url_template, &config.collection)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid url-template: {}", e)))?;

    // CatalogUrl::new already proved the URL parses
    let probe = Url::parse(&catalog.probe_url())
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid url-template: {}", e)))?;
    if probe.scheme() != "http" && probe.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "url-template must use http or https, got '{}'",
            probe.scheme()
        )));
    }

    Ok(())
}

/// Collection names double as table names, so only a safe identifier subset is allowed
pub(crate) fn validate_collection_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "collection cannot be empty".to_string(),
        ));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ConfigError::Validation(format!(
            "collection must contain only ASCII letters, digits and underscores, got '{}'",
            name
        )));
    }

    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(ConfigError::Validation(format!(
            "collection cannot start with a digit, got '{}'",
            name
        )));
    }

    Ok(())
}

/// Validates HTTP configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.rate_limit == 0 {
        return Err(ConfigError::Validation(
            "rate-limit must be >= 1".to_string(),
        ));
    }

    if config.period_secs == 0 {
        return Err(ConfigError::Validation(
            "period-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates the retry policy
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts == 0 {
        return Err(ConfigError::Validation(
            "max-attempts must be >= 1".to_string(),
        ));
    }

    if config.min_backoff_ms > config.max_backoff_ms {
        return Err(ConfigError::Validation(format!(
            "min-backoff-ms ({}) cannot exceed max-backoff-ms ({})",
            config.min_backoff_ms, config.max_backoff_ms
        )));
    }

    Ok(())
}

/// Validates batch crawl configuration
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.batch_size == 0 {
        return Err(ConfigError::Validation(
            "batch-size must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_updater_config(config: &UpdaterConfig) -> Result<(), ConfigError> {
    if config.interval_secs == 0 {
        return Err(ConfigError::Validation(
            "interval-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if config.root.as_os_str().is_empty() {
        return Err(ConfigError::Validation("root cannot be empty".to_string()));
    }

    if config.bucket_count == 0 || config.bucket_count > 256 {
        return Err(ConfigError::Validation(format!(
            "bucket-count must be between 1 and 256, got {}",
            config.bucket_count
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(collection: &str, template: &str) -> CatalogConfig {
        CatalogConfig {
            collection: collection.to_string(),
            url_template: template.to_string(),
        }
    }

    #[test]
    fn test_validate_collection_name() {
        assert!(validate_collection_name("PlushPepe").is_ok());
        assert!(validate_collection_name("lol_pop").is_ok());

        assert!(validate_collection_name("").is_err());
        assert!(validate_collection_name("plush pepe").is_err());
        assert!(validate_collection_name("pepe;drop").is_err());
        assert!(validate_collection_name("9lives").is_err());
    }

    #[test]
    fn test_validate_url_template() {
        assert!(validate_catalog_config(&catalog("PlushPepe", "https://t.me/nft/{collection}-")).is_ok());

        assert!(validate_catalog_config(&catalog("PlushPepe", "https://t.me/nft/plushpepe-")).is_err());
        assert!(validate_catalog_config(&catalog("PlushPepe", "ftp://t.me/{collection}-")).is_err());
        assert!(validate_catalog_config(&catalog("PlushPepe", "{collection}-")).is_err());
    }

    #[test]
    fn test_validate_retry_bounds() {
        let ok = RetryConfig::default();
        assert!(validate_retry_config(&ok).is_ok());

        let inverted = RetryConfig {
            min_backoff_ms: 20_000,
            ..RetryConfig::default()
        };
        assert!(validate_retry_config(&inverted).is_err());

        let no_attempts = RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        };
        assert!(validate_retry_config(&no_attempts).is_err());
    }

    #[test]
    fn test_validate_bucket_count() {
        let mut storage = StorageConfig {
            database_path: "./gifts.db".into(),
            root: "./storage".into(),
            bucket_count: 256,
        };
        assert!(validate_storage_config(&storage).is_ok());

        storage.bucket_count = 0;
        assert!(validate_storage_config(&storage).is_err());

        storage.bucket_count = 257;
        assert!(validate_storage_config(&storage).is_err());
    }
}

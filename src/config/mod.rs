mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./cinefeed.toml",
        "~/.config/cinefeed/config.toml",
        "/etc/cinefeed/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.catalog.base_url.is_empty() {
        anyhow::bail!("Catalog base URL cannot be empty");
    }

    if config.catalog.rate_limit_per_sec == 0 {
        anyhow::bail!("Catalog rate limit must be at least 1 request per second");
    }

    if config.aggregation.max_pages == 0 {
        anyhow::bail!("Aggregation page cap must be at least 1");
    }

    if config.aggregation.max_consecutive_failures == 0 {
        anyhow::bail!("Consecutive failure threshold must be at least 1");
    }

    if config.catalog.api_key.is_empty() {
        tracing::warn!("No catalog API key configured; upstream requests will be rejected");
    }

    if config.catalog.genres.is_empty() {
        tracing::warn!("Genre table is empty; all genre tags will be dropped");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.aggregation.max_consecutive_failures, 3);
        assert_eq!(config.aggregation.session_budget_secs, 45);
        assert_eq!(config.catalog.request_timeout_secs, 10);
    }

    #[test]
    fn default_genre_table_maps_known_ids() {
        let config = Config::default();
        let table = GenreTable::from_entries(&config.catalog.genres);
        assert_eq!(table.name(18), Some("Drama"));
        assert_eq!(table.name(878), Some("Science Fiction"));
        assert_eq!(table.id("Action"), Some(28));
        assert_eq!(table.name(4242), None);
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let toml = r#"
            [server]
            port = 9090

            [catalog]
            api_key = "abc123"

            [aggregation]
            max_consecutive_failures = 2
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.catalog.api_key, "abc123");
        assert_eq!(config.aggregation.max_consecutive_failures, 2);
        assert_eq!(config.aggregation.search_hard_cap, 200);
    }

    #[test]
    fn genre_table_overrides_replace_defaults() {
        let toml = r#"
            [catalog]
            genres = [
                { id = 1, name = "Noir" },
                { id = 2, name = "Heist" },
            ]
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        let table = GenreTable::from_entries(&config.catalog.genres);
        assert_eq!(table.len(), 2);
        assert_eq!(table.name(1), Some("Noir"));
        assert_eq!(table.name(18), None);
    }

    #[test]
    fn rejects_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_zero_failure_threshold() {
        let mut config = Config::default();
        config.aggregation.max_consecutive_failures = 0;
        assert!(validate_config(&config).is_err());
    }
}

use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub journal: JournalConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListenConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Hard cap on registered vehicles; inserts beyond it are rejected
    #[serde(default = "default_max_vehicles")]
    pub max_vehicles: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_vehicles: default_max_vehicles(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CatalogConfig {
    /// Path to a brand/model JSON catalog; the built-in set is used when absent
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JournalConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Max journal entries before rotation
    #[serde(default = "default_journal_max")]
    pub max_entries: usize,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: default_journal_max(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RankingConfig {
    /// How often the background loop refreshes the ranking snapshot
    #[serde(default = "default_ranking_interval")]
    pub refresh_interval_secs: u64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_ranking_interval(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SeedConfig {
    /// Path to a JSON seed file loaded into the store at startup
    pub path: Option<String>,
}

// Default value functions
fn default_address() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_max_vehicles() -> usize { 100_000 }
fn default_true() -> bool { true }
fn default_journal_max() -> usize { 100_000 }
fn default_ranking_interval() -> u64 { 30 }

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config '{}': {}", path, e))?;
        Ok(config)
    }

    /// Load a config, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &str) -> anyhow::Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.listen.port, 8080);
        assert_eq!(config.store.max_vehicles, 100_000);
        assert!(config.journal.enabled);
        assert_eq!(config.ranking.refresh_interval_secs, 30);
        assert!(config.catalog.path.is_none());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config: Config = toml::from_str(
            r#"
            [listen]
            port = 9090

            [journal]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.listen.port, 9090);
        assert_eq!(config.listen.address, "0.0.0.0");
        assert!(!config.journal.enabled);
    }
}

//! Resolver configuration

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Resolver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Cell whose serving graph is consulted
    pub cell: String,

    /// Label carried on the resolver's log events; no metrics are exported
    pub stats_name: String,

    /// Upper bound on re-resolutions per call (unbounded when unset)
    pub max_reresolves: Option<u32>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cell: "local".to_string(),
            stats_name: "resolver".to_string(),
            max_reresolves: None,
        }
    }
}

impl ResolverConfig {
    pub fn new(cell: impl Into<String>) -> Self {
        Self {
            cell: cell.into(),
            ..Default::default()
        }
    }

    pub fn with_max_reresolves(mut self, max_reresolves: u32) -> Self {
        self.max_reresolves = Some(max_reresolves);
        self
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let cell = std::env::var("SHARDGATE_CELL").unwrap_or(defaults.cell);
        let stats_name = std::env::var("SHARDGATE_STATS_NAME").unwrap_or(defaults.stats_name);
        let max_reresolves = match std::env::var("SHARDGATE_MAX_RERESOLVES") {
            Ok(raw) => Some(
                raw.parse()
                    .with_context(|| format!("Invalid SHARDGATE_MAX_RERESOLVES: {}", raw))?,
            ),
            Err(_) => None,
        };

        let config = Self {
            cell,
            stats_name,
            max_reresolves,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.cell.is_empty() {
            anyhow::bail!("cell must not be empty");
        }
        if self.max_reresolves == Some(0) {
            anyhow::bail!("max_reresolves must be at least 1 when set");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::default();
        assert_eq!(config.cell, "local");
        assert_eq!(config.stats_name, "resolver");
        assert_eq!(config.max_reresolves, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        assert!(ResolverConfig::new("").validate().is_err());
        assert!(ResolverConfig::new("cell1")
            .with_max_reresolves(0)
            .validate()
            .is_err());
        assert!(ResolverConfig::new("cell1")
            .with_max_reresolves(3)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf").join("resolver.toml");

        let config = ResolverConfig::new("cell1").with_max_reresolves(5);
        config.save(&path).unwrap();

        let loaded = ResolverConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("resolver.toml");
        std::fs::write(&path, "cell = \"east\"\n").unwrap();

        let loaded = ResolverConfig::load(&path).unwrap();
        assert_eq!(loaded.cell, "east");
        assert_eq!(loaded.stats_name, "resolver");
        assert_eq!(loaded.max_reresolves, None);
    }

    #[test]
    fn test_load_rejects_zero_bound() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("resolver.toml");
        std::fs::write(&path, "cell = \"east\"\nmax_reresolves = 0\n").unwrap();

        assert!(ResolverConfig::load(&path).is_err());
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("SHARDGATE_CELL", "west");
        std::env::set_var("SHARDGATE_MAX_RERESOLVES", "4");
        let config = ResolverConfig::from_env().unwrap();
        assert_eq!(config.cell, "west");
        assert_eq!(config.max_reresolves, Some(4));

        std::env::set_var("SHARDGATE_MAX_RERESOLVES", "0");
        assert!(ResolverConfig::from_env().is_err());

        std::env::set_var("SHARDGATE_MAX_RERESOLVES", "many");
        assert!(ResolverConfig::from_env().is_err());

        std::env::remove_var("SHARDGATE_CELL");
        std::env::remove_var("SHARDGATE_MAX_RERESOLVES");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(ResolverConfig::load(dir.path().join("nope.toml")).is_err());
    }
}

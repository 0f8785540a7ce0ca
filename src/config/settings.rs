//! Configuration settings for the incident theme engine.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub clustering: ClusteringConfig,
    pub cache: CacheConfig,
    pub labeling: LabelingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::ReadFile)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations or use defaults.
    pub fn load() -> Result<Self> {
        let config_paths = [
            PathBuf::from("themes.toml"),
            PathBuf::from("config.toml"),
            dirs::config_dir()
                .map(|p| p.join("incident-themes/config.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".incident-themes/config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.is_file() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let clustering = &self.clustering;
        if clustering.num_clusters == 0 {
            return Err(ConfigError::Invalid("clustering.num_clusters must be > 0".to_string()).into());
        }
        if clustering.max_iterations == 0 {
            return Err(ConfigError::Invalid("clustering.max_iterations must be > 0".to_string()).into());
        }
        if clustering.n_init == 0 {
            return Err(ConfigError::Invalid("clustering.n_init must be > 0".to_string()).into());
        }
        if !clustering.tolerance.is_finite() || clustering.tolerance <= 0.0 {
            return Err(ConfigError::Invalid("clustering.tolerance must be a positive number".to_string()).into());
        }

        if self.cache.enabled && self.cache.freshness_secs == 0 {
            return Err(ConfigError::Invalid("cache.freshness_secs must be > 0".to_string()).into());
        }

        if self.labeling.provider == LabelingProvider::OpenAi {
            if self.labeling.base_url.is_empty() {
                return Err(ConfigError::MissingField("labeling.base_url".to_string()).into());
            }
            if self.labeling.model.is_empty() {
                return Err(ConfigError::MissingField("labeling.model".to_string()).into());
            }
        }
        if self.labeling.timeout_secs == 0 {
            return Err(ConfigError::Invalid("labeling.timeout_secs must be > 0".to_string()).into());
        }

        Ok(())
    }
}

/// Vectorizer and partitioner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Number of clusters requested from the partitioner
    pub num_clusters: usize,
    /// Iteration cap for a single k-means run
    pub max_iterations: usize,
    /// Stop once no centroid moves further than this
    pub tolerance: f64,
    /// Number of seeded restarts; the lowest-inertia run wins. Fewer
    /// restarts make a seed-dependent wrong split more likely
    pub n_init: usize,
    /// Seed for centroid initialization (None draws from entropy)
    pub seed: Option<u64>,
    /// L2-normalize feature rows before partitioning
    pub normalize: bool,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            num_clusters: 3,
            max_iterations: 100,
            tolerance: 1e-4,
            n_init: 20,
            seed: Some(42),
            normalize: true,
        }
    }
}

/// Result cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the single-slot result cache
    pub enabled: bool,
    /// Maximum age of a cached result in seconds
    pub freshness_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            freshness_secs: 300,
        }
    }
}

/// Labeling provider enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelingProvider {
    /// OpenAI-compatible structured chat completion
    #[serde(rename = "openai")]
    OpenAi,
    /// Local keyword extraction
    Keywords,
}

/// Cluster labeling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelingConfig {
    /// Provider type: "openai" or "keywords"
    pub provider: LabelingProvider,
    /// Base URL for the chat completions API
    pub base_url: String,
    /// Model name
    pub model: String,
    /// API key (loaded from environment if not set)
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Keywords per label for the keyword provider
    pub max_keywords: usize,
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            provider: LabelingProvider::OpenAi,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-2024-08-06".to_string(),
            api_key: None,
            timeout_secs: 30,
            max_keywords: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.clustering.num_clusters, 3);
        assert_eq!(config.cache.freshness_secs, 300);
        assert_eq!(config.labeling.provider, LabelingProvider::OpenAi);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [clustering]
            num_clusters = 5
            seed = 7

            [cache]
            freshness_secs = 60

            [labeling]
            provider = "keywords"
            max_keywords = 4
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.clustering.num_clusters, 5);
        assert_eq!(config.clustering.seed, Some(7));
        assert_eq!(config.clustering.max_iterations, 100);
        assert_eq!(config.cache.freshness_secs, 60);
        assert_eq!(config.labeling.provider, LabelingProvider::Keywords);
        assert_eq!(config.labeling.max_keywords, 4);
    }

    #[test]
    fn test_validate_zero_clusters() {
        let toml = r#"
            [clustering]
            num_clusters = 0
        "#;

        assert!(Config::from_str(toml).is_err());
    }

    #[test]
    fn test_validate_missing_model() {
        let toml = r#"
            [labeling]
            provider = "openai"
            model = ""
        "#;

        assert!(Config::from_str(toml).is_err());
    }

    #[test]
    fn test_validate_bad_tolerance() {
        let toml = r#"
            [clustering]
            tolerance = -1.0
        "#;

        assert!(Config::from_str(toml).is_err());
    }

    #[test]
    fn test_disabled_cache_skips_freshness_check() {
        let toml = r#"
            [cache]
            enabled = false
            freshness_secs = 0
        "#;

        assert!(Config::from_str(toml).is_ok());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("themes.toml");
        std::fs::write(&path, "[clustering]\nnum_clusters = 2\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.clustering.num_clusters, 2);

        assert!(Config::from_file(dir.path().join("missing.toml")).is_err());
    }
}

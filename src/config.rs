use crate::error::SyncError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the YouTube Data API key
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Configuration for the sync pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Input, cache and output locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Remote API settings
    #[serde(default)]
    pub youtube: YoutubeConfig,

    /// Relevance filtering settings
    #[serde(default)]
    pub filter: FilterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding `channel_definitions.json` and `members.json`
    pub data_dir: PathBuf,

    /// Curated `*_tagsDict.json` and generated `*_untagsDict.json` files
    pub tags_dir: PathBuf,

    /// Per-channel `<channelId>_exclude.json` id lists
    pub exclude_dir: PathBuf,

    /// Local snapshots of fetched channels and videos
    pub cache_dir: PathBuf,

    /// Files consumed by the viewer
    pub public_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeConfig {
    /// Base URL of the Data API
    pub api_base_url: String,

    /// API key; `GOOGLE_API_KEY` overrides whatever is configured here
    pub api_key: Option<String>,

    /// Page size for playlist listings (1..=50)
    pub max_results: usize,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Group name matched against video text
    pub group_name: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("scripts/data"),
            tags_dir: PathBuf::from("scripts/data/tagsDict"),
            exclude_dir: PathBuf::from("scripts/data/exclude"),
            cache_dir: PathBuf::from("scripts/data/cache"),
            public_dir: PathBuf::from("public"),
        }
    }
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            api_key: None,
            max_results: 50,
            timeout_seconds: 30,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            group_name: "日向坂".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            youtube: YoutubeConfig::default(),
            filter: FilterConfig::default(),
        }
    }
}

impl PathsConfig {
    pub fn channel_definitions_file(&self) -> PathBuf {
        self.data_dir.join("channel_definitions.json")
    }

    pub fn members_file(&self) -> PathBuf {
        self.data_dir.join("members.json")
    }
}

impl Config {
    /// Load configuration from the first config file found, else from the environment
    pub fn load() -> Result<Self> {
        let config_paths = ["sakamichi-sync.toml", "config/sakamichi-sync.toml"];

        for path in &config_paths {
            let path = Path::new(path);
            if path.exists() {
                let config = Self::from_file(path)?;
                tracing::info!("📄 Loaded configuration from: {}", path.display());
                return Ok(config);
            }
        }

        Self::from_env()
    }

    /// Parse a TOML file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
        let mut config: Config = toml::from_str(&content)
            .map_err(|e| SyncError::Config(format!("{}: {}", path.display(), e)))?;
        config.apply_env();
        Ok(config)
    }

    /// Defaults with environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(api_key) = std::env::var(API_KEY_ENV) {
            if !api_key.is_empty() {
                self.youtube.api_key = Some(api_key);
            }
        }

        if let Ok(dir) = std::env::var("SAKAMICHI_DATA_DIR") {
            self.paths.data_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = std::env::var("SAKAMICHI_PUBLIC_DIR") {
            self.paths.public_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = std::env::var("SAKAMICHI_CACHE_DIR") {
            self.paths.cache_dir = PathBuf::from(dir);
        }

        if let Ok(name) = std::env::var("SAKAMICHI_GROUP_NAME") {
            self.filter.group_name = name;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.youtube.max_results == 0 || self.youtube.max_results > 50 {
            return Err(SyncError::Config(format!(
                "max_results must be between 1 and 50, got {}",
                self.youtube.max_results
            )));
        }

        if self.filter.group_name.trim().is_empty() {
            return Err(SyncError::Config("group_name must not be empty".to_string()));
        }

        Ok(())
    }

    /// The API key, or `MissingApiKey` when none was supplied
    pub fn require_api_key(&self) -> Result<&str> {
        self.youtube
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(SyncError::MissingApiKey)
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Sync Configuration:\n\
            - Data Directory: {}\n\
            - Tags Directory: {}\n\
            - Cache Directory: {}\n\
            - Public Directory: {}\n\
            - Group Name: {}\n\
            - API Key Present: {}",
            self.paths.data_dir.display(),
            self.paths.tags_dir.display(),
            self.paths.cache_dir.display(),
            self.paths.public_dir.display(),
            self.filter.group_name,
            self.youtube.api_key.is_some()
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Lay every directory out under one root, as the tests and the repo do
    pub fn with_root_dir(mut self, root: &Path) -> Self {
        self.config.paths = PathsConfig {
            data_dir: root.join("data"),
            tags_dir: root.join("data").join("tagsDict"),
            exclude_dir: root.join("data").join("exclude"),
            cache_dir: root.join("data").join("cache"),
            public_dir: root.join("public"),
        };
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.youtube.api_key = Some(api_key.into());
        self
    }

    pub fn with_group_name(mut self, name: impl Into<String>) -> Self {
        self.config.filter.group_name = name.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

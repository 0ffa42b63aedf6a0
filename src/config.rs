//! Configuration management for deskfind
//!
//! Supports loading configuration from TOML files with CLI overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub index: IndexConfig,

    /// Watched directories, in the order they should be indexed.
    #[serde(default)]
    pub directories: Vec<WatchedDirectory>,
}

/// Index-storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory holding the on-disk index. One directory per logical index,
    /// stable across restarts.
    #[serde(default = "default_index_path")]
    pub path: PathBuf,

    /// Maximum file size to index in bytes (default 10MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

/// A user-selected root directory to index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatchedDirectory {
    /// Root path to walk.
    pub path: String,

    /// Walk the whole tree, or only the root's direct children.
    #[serde(default = "default_true")]
    pub recursive: bool,

    /// Whether this entry participates in batch indexing.
    #[serde(default = "default_true")]
    pub used: bool,
}

impl WatchedDirectory {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            recursive: true,
            used: true,
        }
    }

    pub fn shallow(path: impl Into<String>) -> Self {
        Self {
            recursive: false,
            ..Self::new(path)
        }
    }
}

fn default_index_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("deskfind")
        .join("index")
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

fn default_true() -> bool {
    true
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
            max_file_size: default_max_file_size(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from default locations
    ///
    /// Search order:
    /// 1. DESKFIND_CONFIG environment variable
    /// 2. ./deskfind.toml (current directory)
    /// 3. ~/.config/deskfind/config.toml (user config)
    pub fn from_default_locations() -> Result<Option<(Self, PathBuf)>> {
        if let Ok(env_path) = std::env::var("DESKFIND_CONFIG") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                let config = Self::from_file(&path)?;
                return Ok(Some((config, path)));
            }
        }

        let local_path = PathBuf::from("deskfind.toml");
        if local_path.exists() {
            let config = Self::from_file(&local_path)?;
            return Ok(Some((config, local_path)));
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_path = config_dir.join("deskfind").join("config.toml");
            if user_path.exists() {
                let config = Self::from_file(&user_path)?;
                return Ok(Some((config, user_path)));
            }
        }

        Ok(None)
    }

    /// Generate a template configuration file
    pub fn generate_template() -> String {
        r#"# deskfind configuration
# Generated template - customize as needed

[index]
# Directory holding the on-disk search index.
# Defaults to the platform data directory, e.g. ~/.local/share/deskfind/index
# path = "/home/user/.local/share/deskfind/index"

# Maximum file size to index in bytes (default: 10MB)
max_file_size = 10485760

# Directories to index. Repeat the block for each root.
# [[directories]]
# path = "/home/user/Documents"
# recursive = true   # walk the whole tree (false = direct children only)
# used = true        # include this root in batch indexing
"#
        .to_string()
    }

    /// Write template config to the specified path
    pub fn write_template(path: &Path) -> Result<()> {
        let template = Self::generate_template();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        std::fs::write(path, template)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Merge CLI overrides into the configuration
    pub fn with_overrides(mut self, index_path: Option<PathBuf>, extra_dirs: Vec<String>) -> Self {
        if let Some(p) = index_path {
            self.index.path = p;
        }

        self.directories
            .extend(extra_dirs.into_iter().map(WatchedDirectory::new));

        self
    }
}

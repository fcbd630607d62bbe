//! Configuration management for jcontext
//!
//! Supports loading configuration from TOML files found on an explicit path,
//! the `JCONTEXT_CONFIG` variable, or the default locations.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::content::DEFAULT_PREVIEW_LENGTH;
use crate::index::filter::{
    DEFAULT_ALLOWED_DOTFILES, DEFAULT_IGNORED_DIRS, DEFAULT_INDEXED_EXTENSIONS,
};
use crate::index::indexer::DEFAULT_PROGRESS_INTERVAL;
use crate::index::{IndexerOptions, ScanFilter};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "JCONTEXT_CONFIG";

/// Config file looked up in the current directory.
pub const LOCAL_CONFIG_FILE: &str = "jcontext.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub indexer: IndexerConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub render: RenderConfig,
}

/// Indexer-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Directory names pruned anywhere in the tree
    #[serde(default = "default_ignored_dirs")]
    pub ignored_dirs: Vec<String>,

    /// File extensions to index, with or without the leading dot
    #[serde(default = "default_indexed_extensions")]
    pub indexed_extensions: Vec<String>,

    /// Dot-prefixed file names that are indexed anyway
    #[serde(default = "default_allowed_dotfiles")]
    pub allowed_dotfiles: Vec<String>,

    /// Count files before indexing so progress can show a percentage
    #[serde(default = "default_true")]
    pub count_files: bool,

    /// Emit a progress event at least every N files
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
}

/// Search-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Results returned by `search` when no limit is given
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Candidates offered for an `@` query
    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: usize,
}

/// Render-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Byte length of a rendered preview before truncation
    #[serde(default = "default_preview_length")]
    pub preview_length: usize,
}

fn default_ignored_dirs() -> Vec<String> {
    DEFAULT_IGNORED_DIRS.iter().map(|s| s.to_string()).collect()
}

fn default_indexed_extensions() -> Vec<String> {
    DEFAULT_INDEXED_EXTENSIONS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_allowed_dotfiles() -> Vec<String> {
    DEFAULT_ALLOWED_DOTFILES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_progress_interval() -> usize {
    DEFAULT_PROGRESS_INTERVAL
}

fn default_limit() -> usize {
    3
}

fn default_suggestion_limit() -> usize {
    5
}

fn default_preview_length() -> usize {
    DEFAULT_PREVIEW_LENGTH
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            ignored_dirs: default_ignored_dirs(),
            indexed_extensions: default_indexed_extensions(),
            allowed_dotfiles: default_allowed_dotfiles(),
            count_files: true,
            progress_interval: default_progress_interval(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            suggestion_limit: default_suggestion_limit(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            preview_length: default_preview_length(),
        }
    }
}

impl IndexerConfig {
    /// Build the rebuild options described by this section.
    pub fn to_options(&self) -> IndexerOptions {
        IndexerOptions {
            filter: ScanFilter::new(
                self.ignored_dirs.iter().cloned(),
                self.indexed_extensions.iter().cloned(),
                self.allowed_dotfiles.iter().cloned(),
            ),
            count_files: self.count_files,
            progress_interval: self.progress_interval.clamp(1, DEFAULT_PROGRESS_INTERVAL),
            ..IndexerOptions::default()
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
    /// 1. JCONTEXT_CONFIG environment variable
    /// 2. ./jcontext.toml (current directory)
    /// 3. ~/.config/jcontext/config.toml (user config)
    pub fn from_default_locations() -> Result<Option<(Self, PathBuf)>> {
        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                let config = Self::from_file(&path)?;
                return Ok(Some((config, path)));
            }
        }

        let local_path = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_path.exists() {
            let config = Self::from_file(&local_path)?;
            return Ok(Some((config, local_path)));
        }

        if let Some(user_path) = Self::user_config_path() {
            if user_path.exists() {
                let config = Self::from_file(&user_path)?;
                return Ok(Some((config, user_path)));
            }
        }

        Ok(None)
    }

    /// `<user config dir>/jcontext/config.toml`, when the platform has one.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("jcontext").join("config.toml"))
    }

    /// Generate a template configuration file
    pub fn generate_template() -> String {
        r#"# jcontext configuration
# Generated template - customize as needed

[indexer]
# Directory names skipped anywhere in the project tree
ignored_dirs = [
    "__pycache__", ".git", ".svn", ".hg", ".vscode", ".idea",
    "node_modules", ".env", "venv", ".venv", "env", "ENV",
    "dist", "build", "target", "bin", "obj", ".pytest_cache",
]

# Extensions that are indexed (case-insensitive, leading dot optional)
# Files without an extension are always indexed
indexed_extensions = [
    ".py", ".js", ".ts", ".jsx", ".tsx", ".java", ".cpp", ".c", ".h", ".cs",
    ".php", ".rb", ".go", ".rs", ".swift", ".kt", ".scala",
    ".html", ".css", ".scss", ".less", ".xml", ".json", ".yaml", ".yml",
    ".md", ".txt", ".rst", ".sql", ".sh", ".bat", ".ps1", ".r", ".m",
]

# Hidden files that are indexed anyway
allowed_dotfiles = [".gitignore", ".env.example"]

# Count files first so progress shows a percentage (default: true)
# count_files = true

# Report progress every N files, between 1 and 50 (default: 50)
# progress_interval = 50

[search]
# Results returned by `jcontext search` without -n (default: 3)
default_limit = 3

# Candidates offered for an @ query (default: 5)
suggestion_limit = 5

[render]
# Length of a rendered preview before it is truncated (default: 500)
preview_length = 500
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.search.default_limit, 3);
        assert_eq!(config.search.suggestion_limit, 5);
        assert_eq!(config.render.preview_length, 500);
        assert!(config
            .indexer
            .ignored_dirs
            .contains(&"node_modules".to_string()));
        assert!(config.indexer.count_files);
    }

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
[indexer]
indexed_extensions = ["rs", "TOML"]
count_files = false

[search]
default_limit = 10
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.indexer.indexed_extensions, vec!["rs", "TOML"]);
        assert!(!config.indexer.count_files);
        // Unspecified keys keep their defaults
        assert_eq!(config.search.default_limit, 10);
        assert_eq!(config.search.suggestion_limit, 5);
        assert_eq!(config.indexer.ignored_dirs, default_ignored_dirs());

        let options = config.indexer.to_options();
        assert!(options.filter.should_index("Cargo.toml"));
        assert!(options.filter.should_index("main.rs"));
        assert!(!options.filter.should_index("main.py"));
        assert!(!options.count_files);
    }

    #[test]
    fn test_generate_template() {
        let template = Config::generate_template();
        assert!(template.contains("[indexer]"));
        assert!(template.contains("[search]"));
        assert!(template.contains("[render]"));

        // The template parses and matches the built-in defaults
        let parsed: Config = toml::from_str(&template).unwrap();
        let defaults = Config::default();
        assert_eq!(parsed.indexer.ignored_dirs, defaults.indexer.ignored_dirs);
        assert_eq!(
            parsed.indexer.indexed_extensions,
            defaults.indexer.indexed_extensions
        );
        assert_eq!(parsed.render.preview_length, defaults.render.preview_length);
    }

    #[test]
    fn test_write_template_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("jcontext.toml");
        Config::write_template(&path).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.search.default_limit, 3);
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[search\n").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(format!("{err}").contains("bad.toml"));
    }

    #[test]
    fn test_progress_interval_is_clamped() {
        let config: Config = toml::from_str("[indexer]\nprogress_interval = 500\n").unwrap();
        assert_eq!(
            config.indexer.to_options().progress_interval,
            DEFAULT_PROGRESS_INTERVAL
        );

        let config: Config = toml::from_str("[indexer]\nprogress_interval = 0\n").unwrap();
        assert_eq!(config.indexer.to_options().progress_interval, 1);

        let config: Config = toml::from_str("[indexer]\nprogress_interval = 10\n").unwrap();
        assert_eq!(config.indexer.to_options().progress_interval, 10);
    }
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub replace: ReplaceConfig,

    #[serde(default)]
    pub backup: BackupConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub shell: ShellConfig,

    #[serde(default)]
    pub files: FilesConfig,

    /// Language tag (`rust`, `python`, ...) to formatter command line.
    #[serde(default)]
    pub formatters: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub max_results: usize,
    pub context_lines: usize,
    pub max_files_shown: usize,
    pub max_matches_per_file: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 1000,
            context_lines: 2,
            max_files_shown: 50,
            max_matches_per_file: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplaceConfig {
    pub max_files_shown: usize,
}

impl Default for ReplaceConfig {
    fn default() -> Self {
        Self {
            max_files_shown: 100,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Defaults to `~/.localtools/backups` when unset.
    pub directory: Option<PathBuf>,
}

impl BackupConfig {
    pub fn resolved_directory(&self) -> PathBuf {
        if let Some(dir) = &self.directory {
            return dir.clone();
        }
        dirs::home_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(".localtools")
            .join("backups")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_history_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_blocked_commands")]
    pub blocked: Vec<String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            blocked: default_blocked_commands(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    pub max_read_bytes: u64,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            max_read_bytes: 1024 * 1024,
        }
    }
}

fn default_history_capacity() -> usize {
    100
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_blocked_commands() -> Vec<String> {
    ["rm", "del", "format", "sudo", "su", "passwd"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Config {
    pub fn load() -> Result<Self> {
        match Self::find_config_path()? {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content).with_context(|| "Failed to parse config file")
    }

    fn find_config_path() -> Result<Option<PathBuf>> {
        if let Some(xdg_config) = dirs::config_dir() {
            let xdg_path = xdg_config.join("localtools/config.toml");
            if xdg_path.exists() {
                return Ok(Some(xdg_path));
            }
        }

        if let Some(home) = dirs::home_dir() {
            let home_path = home.join(".localtools.toml");
            if home_path.exists() {
                return Ok(Some(home_path));
            }
        }

        let current_path = Path::new(".localtools.toml");
        if current_path.exists() {
            return Ok(Some(current_path.to_path_buf()));
        }

        Ok(None)
    }

    /// Where `config --init` writes when no explicit path is given.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("localtools/config.toml"))
            .unwrap_or_else(|| PathBuf::from(".localtools.toml"))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

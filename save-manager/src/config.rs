//! Configuration management for the save manager.
//!
//! Loads configuration from a TOML file. Every key is optional and falls back
//! to the documented default, so an empty file is a valid configuration.

use crate::utils::{Result, SaveManagerError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds between automatic saves
    pub save_interval: u64,

    /// Seconds between backup sweeps
    pub backup_interval: u64,

    /// Register the backup timer at all
    pub enable_backups: bool,

    /// Send chat notices around saves and backups
    pub enable_broadcast: bool,

    pub broadcast_messages: BroadcastMessages,

    /// Output directory per directory key (`overworld`, `nether`, ...)
    pub backup_directories: BTreeMap<String, PathBuf>,

    /// Worlds archived by the backup timer, in order
    pub worlds: Vec<WorldConfig>,

    pub archive: ArchiveConfig,
    pub server: ServerConfig,
    pub api: ApiConfig,
    pub log: LogConfig,
}

/// Chat templates, using `&` as the color-code character.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastMessages {
    pub preparing: String,
    pub saving: String,
    pub backing_up: String,
    pub backup_complete: String,
}

/// A world included in the periodic sweep.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorldConfig {
    /// World name as known to the host
    pub name: String,

    /// Key into `backup_directories`
    pub directory: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    Deflate,
    Stored,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Copy buffer size in bytes
    pub chunk_size: usize,

    pub compression: Compression,

    /// Deflate level (0-9), library default when unset
    pub compression_level: Option<i64>,

    /// Seconds between progress reports
    pub progress_interval: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Directory holding one subdirectory per world
    pub world_container: PathBuf,

    /// Program and arguments run as the save action
    pub save_command: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub enabled: bool,
    pub port: u16,

    /// Bearer token granting command permissions over HTTP
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            save_interval: 3600,
            backup_interval: 86400,
            enable_backups: true,
            enable_broadcast: true,
            broadcast_messages: BroadcastMessages::default(),
            backup_directories: [
                ("overworld", "backups/overworld"),
                ("nether", "backups/nether"),
                ("end", "backups/end"),
            ]
            .into_iter()
            .map(|(key, dir)| (key.to_string(), PathBuf::from(dir)))
            .collect(),
            worlds: vec![
                WorldConfig::new("world", "overworld"),
                WorldConfig::new("world_nether", "nether"),
                WorldConfig::new("world_the_end", "end"),
            ],
            archive: ArchiveConfig::default(),
            server: ServerConfig::default(),
            api: ApiConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for BroadcastMessages {
    fn default() -> Self {
        Self {
            preparing: "&7[&aSaveManager&7] &fPreparing to save world progress...".to_string(),
            saving: "&7[&aSaveManager&7] &fSaving all worlds...".to_string(),
            backing_up: "&7[&aSaveManager&7] &fBacking up world files...".to_string(),
            backup_complete: "&7[&aSaveManager&7] &fBackup complete!".to_string(),
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            chunk_size: 64 * 1024,
            compression: Compression::Deflate,
            compression_level: None,
            progress_interval: 10,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            world_container: PathBuf::from("."),
            save_command: None,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 9991,
            token: None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl WorldConfig {
    pub fn new(name: &str, directory: &str) -> Self {
        Self {
            name: name.to_string(),
            directory: directory.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| SaveManagerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.save_interval == 0 {
            return Err(SaveManagerError::Config("save_interval must be at least 1 second".into()));
        }
        if self.enable_backups && self.backup_interval == 0 {
            return Err(SaveManagerError::Config(
                "backup_interval must be at least 1 second".into(),
            ));
        }
        if self.archive.chunk_size == 0 {
            return Err(SaveManagerError::Config("archive.chunk_size must be positive".into()));
        }
        if self.archive.progress_interval == 0 {
            return Err(SaveManagerError::Config(
                "archive.progress_interval must be at least 1 second".into(),
            ));
        }
        Ok(())
    }

    /// Output directory for a directory key, `backups/<key>` when unconfigured.
    ///
    /// Keys are matched lowercased.
    pub fn backup_directory(&self, key: &str) -> PathBuf {
        let key = key.to_lowercase();
        self.backup_directories
            .get(&key)
            .cloned()
            .unwrap_or_else(|| PathBuf::from("backups").join(key))
    }

    pub fn save_period(&self) -> Duration {
        Duration::from_secs(self.save_interval)
    }

    pub fn backup_period(&self) -> Duration {
        Duration::from_secs(self.backup_interval)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs(self.archive.progress_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.save_interval, 3600);
        assert_eq!(config.backup_interval, 86400);
        assert!(config.enable_backups);
        assert!(config.enable_broadcast);
        assert_eq!(config.archive.chunk_size, 65536);
        assert_eq!(config.archive.compression, Compression::Deflate);
        assert_eq!(config.archive.progress_interval, 10);
        assert_eq!(config.worlds.len(), 3);
        assert_eq!(config.worlds[0], WorldConfig::new("world", "overworld"));
        assert_eq!(
            config.broadcast_messages.backup_complete,
            "&7[&aSaveManager&7] &fBackup complete!"
        );
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = Config::from_toml(
            r#"
            save_interval = 600
            enable_broadcast = false

            [broadcast_messages]
            saving = "&cSaving now"

            [archive]
            compression = "stored"
            "#,
        )
        .unwrap();

        assert_eq!(config.save_interval, 600);
        assert_eq!(config.backup_interval, 86400);
        assert!(!config.enable_broadcast);
        assert_eq!(config.broadcast_messages.saving, "&cSaving now");
        assert_eq!(
            config.broadcast_messages.preparing,
            "&7[&aSaveManager&7] &fPreparing to save world progress..."
        );
        assert_eq!(config.archive.compression, Compression::Stored);
        assert_eq!(config.archive.chunk_size, 65536);
    }

    #[test]
    fn test_backup_directory_lookup() {
        let config = Config::from_toml(
            r#"
            [backup_directories]
            overworld = "/srv/backups/main"
            "#,
        )
        .unwrap();

        assert_eq!(config.backup_directory("overworld"), PathBuf::from("/srv/backups/main"));
        assert_eq!(config.backup_directory("OverWorld"), PathBuf::from("/srv/backups/main"));
        assert_eq!(config.backup_directory("Creative"), PathBuf::from("backups/creative"));
    }

    #[test]
    fn test_custom_world_list() {
        let config = Config::from_toml(
            r#"
            [[worlds]]
            name = "lobby"
            directory = "lobby"
            "#,
        )
        .unwrap();

        assert_eq!(config.worlds, vec![WorldConfig::new("lobby", "lobby")]);
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(matches!(
            Config::from_toml("save_interval = 0"),
            Err(SaveManagerError::Config(_))
        ));
        assert!(matches!(
            Config::from_toml("backup_interval = 0"),
            Err(SaveManagerError::Config(_))
        ));
        // A disabled backup timer does not need a period
        assert!(Config::from_toml("backup_interval = 0\nenable_backups = false").is_ok());
    }

    #[test]
    fn test_example_config_parses() {
        let config = Config::from_toml(include_str!("../config.example.toml")).unwrap();
        assert_eq!(config.worlds.len(), 3);
        assert_eq!(config.server.world_container, PathBuf::from("/srv/minecraft"));
        assert!(config.api.token.is_none());
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        assert!(matches!(
            Config::from_toml("save_interval = \"soon\""),
            Err(SaveManagerError::Config(_))
        ));
    }
}

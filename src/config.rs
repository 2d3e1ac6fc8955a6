use std::path::PathBuf;
use std::time::Duration;

use color_eyre::eyre::{OptionExt, Result, WrapErr};
use serde::{Deserialize, Serialize};

use crate::services::predicate::Rule;

/// Name and description of one managed playlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedPlaylistConfig {
    pub name: String,
    pub description: String,
}

/// Tool configuration, loaded from TOML. Every field has a default so the
/// tool runs without a config file at all; the file only overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Maximum ids per add-mutation call (the Tidal API limit).
    #[serde(default = "default_batch_size")]
    batch_size: usize,
    /// Favorites page size.
    #[serde(default = "default_page_size")]
    page_size: u32,
    /// Pause between favorites page requests, in milliseconds. 0 disables.
    #[serde(default = "default_page_pause_ms")]
    page_pause_ms: u64,
    /// Extra attempts per page after the first failure.
    #[serde(default = "default_page_retries")]
    page_retries: u32,
    /// Overrides the session file location. Defaults next to the config file.
    #[serde(default)]
    session_file: Option<String>,
    #[serde(default = "default_orphans_playlist")]
    orphans_playlist: ManagedPlaylistConfig,
    #[serde(default = "default_unfavorited_playlist")]
    unfavorited_playlist: ManagedPlaylistConfig,
}

fn default_batch_size() -> usize {
    100
}

fn default_page_size() -> u32 {
    1000
}

fn default_page_pause_ms() -> u64 {
    100
}

fn default_page_retries() -> u32 {
    3
}

fn default_orphans_playlist() -> ManagedPlaylistConfig {
    ManagedPlaylistConfig {
        name: "Orphaned Tracks".to_string(),
        description: "Tracks from library not in any other playlists.".to_string(),
    }
}

fn default_unfavorited_playlist() -> ManagedPlaylistConfig {
    ManagedPlaylistConfig {
        name: "Playlists Tracks Not In Library".to_string(),
        description: "Tracks from all playlists not in Tidal library.".to_string(),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            page_size: default_page_size(),
            page_pause_ms: default_page_pause_ms(),
            page_retries: default_page_retries(),
            session_file: None,
            orphans_playlist: default_orphans_playlist(),
            unfavorited_playlist: default_unfavorited_playlist(),
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .wrap_err_with(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("tidal-curator").join("config.toml"))
    }

    /// Load config from the default path, falling back to defaults when no
    /// file exists there.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Write a default config file, if it doesn't exist
    pub fn create_default() -> Result<PathBuf> {
        let path = Self::config_path().ok_or_eyre("No config directory available")?;
        if path.exists() {
            return Ok(path);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create {}", parent.display()))?;
        }
        let contents =
            toml::to_string_pretty(&Self::default()).wrap_err("Failed to serialize config")?;
        std::fs::write(&path, contents)
            .wrap_err_with(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(path)
    }

    /// Expand ~ to home directory
    fn expand_path(path: &str) -> PathBuf {
        if path.starts_with("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(&path[2..]);
            }
        }
        PathBuf::from(path)
    }

    /// Where the session file lives: configured override, or next to the
    /// config file, or the working directory as a last resort.
    pub fn session_file_path(&self) -> PathBuf {
        if let Some(ref path) = self.session_file {
            return Self::expand_path(path);
        }
        dirs::config_dir()
            .map(|path| path.join("tidal-curator").join("tidal_session.json"))
            .unwrap_or_else(|| PathBuf::from("tidal_session.json"))
    }

    pub fn playlist_for(&self, rule: Rule) -> &ManagedPlaylistConfig {
        match rule {
            Rule::FavoritesNotInPlaylists => &self.orphans_playlist,
            Rule::PlaylistsNotInFavorites => &self.unfavorited_playlist,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn page_pause(&self) -> Duration {
        Duration::from_millis(self.page_pause_ms)
    }

    pub fn page_retries(&self) -> u32 {
        self.page_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config.batch_size(), 100);
        assert_eq!(config.page_size(), 1000);
        assert_eq!(config.page_pause(), Duration::from_millis(100));
        assert_eq!(config.page_retries(), 3);
        assert_eq!(
            config.playlist_for(Rule::FavoritesNotInPlaylists).name,
            "Orphaned Tracks"
        );
        assert_eq!(
            config.playlist_for(Rule::PlaylistsNotInFavorites).name,
            "Playlists Tracks Not In Library"
        );
    }

    #[test]
    fn test_overrides_are_honored() {
        let config: Config = toml::from_str(
            r#"
            batch_size = 50
            page_pause_ms = 0
            session_file = "/tmp/session.json"

            [orphans_playlist]
            name = "My Orphans"
            description = "mine"
            "#,
        )
        .unwrap();

        assert_eq!(config.batch_size(), 50);
        assert!(config.page_pause().is_zero());
        assert_eq!(
            config.session_file_path(),
            PathBuf::from("/tmp/session.json")
        );
        assert_eq!(
            config.playlist_for(Rule::FavoritesNotInPlaylists).name,
            "My Orphans"
        );
        // The other playlist keeps its default.
        assert_eq!(
            config.playlist_for(Rule::PlaylistsNotInFavorites).name,
            "Playlists Tracks Not In Library"
        );
    }

    #[test]
    fn test_default_config_roundtrips_through_toml() {
        let serialized = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.batch_size(), Config::default().batch_size());
    }
}

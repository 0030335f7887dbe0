//! App configuration, persisted as JSON in the app data directory.

use std::{io::Write, path::{Path, PathBuf}, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    app_data_dir,
    image_item::ImageItemConfig,
    media_client::{Homeserver, HttpMediaClientSettings},
};

const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The host name of the homeserver that `mxc://` URIs are resolved against.
    pub homeserver: String,
    pub port: u16,
    pub access_token: Option<String>,
    /// The bounds that inline images are scaled down to fit within.
    pub max_image_width: u32,
    pub max_image_height: u32,
    pub corner_radius: f64,
    pub request_timeout_secs: u64,
    pub tooltip_delay_ms: u64,
    /// One of "light", "dark", or "system".
    pub theme: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            homeserver: String::from("matrix.org"),
            port: 443,
            access_token: None,
            max_image_width: 500,
            max_image_height: 300,
            corner_radius: 5.0,
            request_timeout_secs: 10,
            tooltip_delay_ms: 700,
            theme: String::from("light"),
        }
    }
}

impl Config {
    pub fn homeserver(&self) -> Homeserver {
        Homeserver {
            host: self.homeserver.clone(),
            port: self.port,
        }
    }

    pub fn media_client_settings(&self) -> HttpMediaClientSettings {
        HttpMediaClientSettings {
            homeserver: self.homeserver(),
            access_token: self.access_token.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn image_item_config(&self) -> ImageItemConfig {
        ImageItemConfig {
            max_width: self.max_image_width,
            max_height: self.max_image_height,
            corner_radius: self.corner_radius,
            homeserver: self.homeserver(),
        }
    }

    pub fn tooltip_delay(&self) -> Duration {
        Duration::from_millis(self.tooltip_delay_ms)
    }
}

/// The path of the config file in the app data directory, if there is one.
pub fn default_config_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Loads the config from the given path.
///
/// If the file doesn't exist, this returns the default config.
/// If the file can't be deserialized, it is backed up and the default config is returned.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let file_bytes = match std::fs::read(path) {
        Ok(fb) => fb,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file found at {path:?}, using default.");
            return Ok(Config::default());
        }
        Err(e) => return Err(e.into()),
    };
    match serde_json::from_slice(&file_bytes) {
        Ok(config) => {
            tracing::debug!("Successfully loaded config from {path:?}.");
            Ok(config)
        }
        Err(e) => {
            tracing::error!("Failed to deserialize config at {path:?}: {e}. Using default config.");
            let backup_path = path.with_extension("json.bak");
            if let Err(backup_err) = std::fs::rename(path, &backup_path) {
                tracing::error!("Failed to backup old config file: {backup_err}");
            } else {
                tracing::info!("Old config backed up to: {backup_path:?}");
            }
            Ok(Config::default())
        }
    }
}

/// Saves the config to the given path, creating its parent directory if needed.
pub fn save_config(config: &Config, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, config)?;
    writer.flush()?;
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("inline_image_config_{}_{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(CONFIG_FILE_NAME)
    }

    #[test]
    fn test_missing_config_is_default() {
        let path = temp_path("missing");
        let _ = std::fs::remove_file(&path);
        assert_eq!(load_config(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let path = temp_path("partial");
        std::fs::write(&path, r#"{ "homeserver": "example.org", "max_image_width": 128 }"#).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.homeserver, "example.org");
        assert_eq!(config.max_image_width, 128);
        assert_eq!(config.max_image_height, Config::default().max_image_height);
        assert_eq!(config.port, 443);
    }

    #[test]
    fn test_corrupt_config_is_backed_up() {
        let path = temp_path("corrupt");
        std::fs::write(&path, "{ this is not json").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(!path.exists());
        assert!(path.with_extension("json.bak").exists());
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path("save");
        let config = Config {
            theme: String::from("dark"),
            access_token: Some(String::from("secret")),
            ..Config::default()
        };
        save_config(&config, &path).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);
    }
}

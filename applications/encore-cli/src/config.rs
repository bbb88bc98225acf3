/// Application configuration
use anyhow::{Context, Result};
use encore_catalog::{CatalogProfile, ResourceResolver};
use encore_playback::PlaybackConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "encore.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub catalogs: CatalogSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CatalogSettings {
    /// Archive catalog (metadata index over HTTP)
    #[serde(default)]
    pub dead: CatalogProfile,

    /// Static-listing catalog
    #[serde(default)]
    pub jerry: CatalogProfile,

    /// Listing file for the static catalog; the bundled listing when unset
    #[serde(default)]
    pub jerry_listing: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    /// `tracing` filter used when `RUST_LOG` is not set
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "encore=info,encore_playback=info,encore_catalog=info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist. Without one, `encore.toml` in the
    /// working directory is used if present. `ENCORE_`-prefixed variables
    /// override both, with `__` between sections
    /// (`ENCORE_PLAYBACK__FADE_STEPS=20`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path).required(true));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("ENCORE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.playback
            .validate()
            .context("Invalid [playback] settings")?;
        ResourceResolver::new(self.catalogs.dead.clone())
            .context("Invalid [catalogs.dead] settings")?;
        ResourceResolver::new(self.catalogs.jerry.clone())
            .context("Invalid [catalogs.jerry] settings")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let file = write_config(
            r#"
            [playback]
            fade_steps = 20

            [catalogs.jerry]
            download_base = "https://media.example.test/jerry"
            "#,
        );

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.playback.fade_steps, 20);
        assert_eq!(config.playback.max_attempts, 3);
        assert_eq!(
            config.catalogs.jerry.download_base,
            "https://media.example.test/jerry"
        );
        assert_eq!(config.catalogs.dead, CatalogProfile::default());
        assert!(config.logging.filter.contains("encore_playback"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let file = write_config(
            r#"
            [playback]
            fade_steps = 0
            "#,
        );
        assert!(AppConfig::load(Some(file.path())).is_err());

        let file = write_config(
            r#"
            [catalogs.dead]
            download_base = "ftp://archive.example.test"
            "#,
        );
        assert!(AppConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(AppConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn defaults_validate() {
        AppConfig::default().validate().unwrap();
    }
}

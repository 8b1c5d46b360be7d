//! Bootstrap configuration loading and data folder resolution
//!
//! Resolution priority for every bootstrap value:
//! 1. Command-line argument / environment variable (merged by the binary's clap parser)
//! 2. TOML config file
//! 3. OS-dependent compiled default
//!
//! A missing or malformed TOML file never prevents startup: a warning is
//! logged and defaults are used. Runtime settings (session timeout, lookup
//! toggle, registration toggle) live in the database `settings` table, see
//! [`crate::db::settings`].

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_BIND: &str = "127.0.0.1:5730";
pub const DEFAULT_DATABASE_FILE: &str = "bookz.db";
pub const DEFAULT_OPENLIBRARY_URL: &str = "https://openlibrary.org";
pub const DEFAULT_COVERS_URL: &str = "https://covers.openlibrary.org";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Contents of `config.toml`; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub data_folder: Option<PathBuf>,
    pub database_file: Option<String>,
    pub bind: Option<String>,
    pub openlibrary_url: Option<String>,
    pub covers_url: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error
    pub level: Option<String>,
}

/// Values supplied on the command line or through `BOOKZ_*` variables
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub data_folder: Option<PathBuf>,
    pub bind: Option<String>,
    pub log_level: Option<String>,
    pub openlibrary_url: Option<String>,
}

/// Fully resolved bootstrap configuration
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapConfig {
    pub data_folder: PathBuf,
    pub database_file: String,
    pub bind: String,
    pub log_level: String,
    pub openlibrary_url: String,
    pub covers_url: String,
}

impl BootstrapConfig {
    /// Merge overrides, TOML file and compiled defaults
    pub fn resolve(overrides: ConfigOverrides) -> Self {
        let toml_config = load_toml_config(overrides.config_file.as_deref());
        Self::merge(overrides, toml_config)
    }

    /// Merge already-loaded sources (no file system access)
    pub fn merge(overrides: ConfigOverrides, toml_config: TomlConfig) -> Self {
        Self {
            data_folder: overrides
                .data_folder
                .or(toml_config.data_folder)
                .unwrap_or_else(default_data_folder),
            database_file: toml_config
                .database_file
                .unwrap_or_else(|| DEFAULT_DATABASE_FILE.to_string()),
            bind: overrides
                .bind
                .or(toml_config.bind)
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            log_level: overrides
                .log_level
                .or(toml_config.logging.level)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            openlibrary_url: overrides
                .openlibrary_url
                .or(toml_config.openlibrary_url)
                .unwrap_or_else(|| DEFAULT_OPENLIBRARY_URL.to_string()),
            covers_url: toml_config
                .covers_url
                .unwrap_or_else(|| DEFAULT_COVERS_URL.to_string()),
        }
    }

    /// Full path of the SQLite database file
    pub fn database_path(&self) -> PathBuf {
        self.data_folder.join(&self.database_file)
    }
}

/// Read the TOML config file
///
/// With an explicit path the file is read from there; otherwise the
/// platform config location is tried. Absent or invalid files fall back to
/// an empty configuration.
pub fn load_toml_config(explicit: Option<&Path>) -> TomlConfig {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => {
                info!("No config file found, using defaults");
                return TomlConfig::default();
            }
        },
    };

    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Could not read config file {}: {} (using defaults)", path.display(), e);
            return TomlConfig::default();
        }
    };

    match parse_toml_config(&content) {
        Ok(config) => {
            info!("Loaded config file: {}", path.display());
            config
        }
        Err(e) => {
            warn!("{} (using defaults)", e);
            TomlConfig::default()
        }
    }
}

/// Parse TOML text into a [`TomlConfig`]
pub fn parse_toml_config(content: &str) -> crate::Result<TomlConfig> {
    toml::from_str(content).map_err(|e| crate::Error::Config(format!("Invalid config file: {}", e)))
}

/// `~/.config/bookz/config.toml` on Linux, the platform equivalent elsewhere
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bookz").join("config.toml"))
}

/// OS-dependent default data folder
fn default_data_folder() -> PathBuf {
    if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("bookz"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\bookz"))
    } else {
        // ~/.local/share/bookz on Linux, ~/Library/Application Support/bookz on macOS
        dirs::data_dir()
            .map(|d| d.join("bookz"))
            .unwrap_or_else(|| PathBuf::from("./bookz_data"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_nothing_configured() {
        let config = BootstrapConfig::merge(ConfigOverrides::default(), TomlConfig::default());

        assert_eq!(config.bind, DEFAULT_BIND);
        assert_eq!(config.database_file, DEFAULT_DATABASE_FILE);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.openlibrary_url, DEFAULT_OPENLIBRARY_URL);
        assert!(config.data_folder.ends_with("bookz") || config.data_folder.ends_with("bookz_data"));
    }

    #[test]
    fn test_overrides_beat_toml() {
        let toml_config = parse_toml_config(
            r#"
            bind = "0.0.0.0:9000"
            data_folder = "/srv/bookz"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        let overrides = ConfigOverrides {
            bind: Some("127.0.0.1:7000".to_string()),
            ..Default::default()
        };

        let config = BootstrapConfig::merge(overrides, toml_config);
        assert_eq!(config.bind, "127.0.0.1:7000");
        assert_eq!(config.data_folder, PathBuf::from("/srv/bookz"));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.database_path(), PathBuf::from("/srv/bookz/bookz.db"));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = parse_toml_config("bind = [unterminated");
        assert!(matches!(result, Err(crate::Error::Config(_))));
    }
}

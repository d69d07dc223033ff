//! TOML settings for the `dscr` binary.
//!
//! ```toml
//! [defaults]
//! backend = "file"
//! location = "data/"
//!
//! [share]
//! base_url = "https://example.com/dscr-calculator/"
//!
//! [logging]
//! level = "debug"
//! file = "dscr.log"
//! ```
//!
//! Every section and key is optional.

use std::path::{Path, PathBuf};

use dscr_core::defaults::{BuiltinProviderFactory, DefaultsSource};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://example.com/dscr-calculator/";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read settings file {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("invalid settings: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub defaults: DefaultsSettings,
    pub share: ShareSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefaultsSettings {
    pub backend: String,
    pub location: String,
}

impl Default for DefaultsSettings {
    fn default() -> Self {
        Self {
            backend: BuiltinProviderFactory::BACKEND.to_string(),
            location: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShareSettings {
    pub base_url: String,
}

impl Default for ShareSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

/// Command-line values that take precedence over the settings file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub backend: Option<String>,
    pub location: Option<String>,
    pub base_url: Option<String>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl Settings {
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        toml::from_str(text).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|e| SettingsError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Settings from `path`, or the built-in defaults when no file is given.
    pub fn load_optional(path: Option<&Path>) -> Result<Self, SettingsError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn with_overrides(
        mut self,
        overrides: Overrides,
    ) -> Self {
        if let Some(backend) = overrides.backend {
            self.defaults.backend = backend;
        }
        if let Some(location) = overrides.location {
            self.defaults.location = location;
        }
        if let Some(base_url) = overrides.base_url {
            self.share.base_url = base_url;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if overrides.log_file.is_some() {
            self.logging.file = overrides.log_file;
        }
        self
    }

    pub fn defaults_source(&self) -> DefaultsSource {
        DefaultsSource {
            backend: self.defaults.backend.clone(),
            location: self.defaults.location.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let settings = Settings::from_toml_str("").unwrap();

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.defaults.backend, "builtin");
        assert_eq!(settings.share.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.logging.file, None);
    }

    #[test]
    fn test_partial_sections() {
        let text = r#"
[defaults]
backend = "file"
location = "data"

[logging]
file = "dscr.log"
"#;
        let settings = Settings::from_toml_str(text).unwrap();

        assert_eq!(settings.defaults.backend, "file");
        assert_eq!(settings.defaults.location, "data");
        assert_eq!(settings.share.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.logging.file, Some(PathBuf::from("dscr.log")));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = Settings::from_toml_str("[share]\nbase = \"x\"\n");

        assert!(matches!(result, Err(SettingsError::Parse(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = Settings::load(Path::new("/nonexistent/dscr/settings.toml"));

        assert!(matches!(result, Err(SettingsError::Io { .. })));
    }

    #[test]
    fn test_no_path_gives_defaults() {
        assert_eq!(Settings::load_optional(None).unwrap(), Settings::default());
    }

    #[test]
    fn test_overrides_win() {
        let settings = Settings::from_toml_str("[defaults]\nbackend = \"file\"\nlocation = \"a\"\n")
            .unwrap()
            .with_overrides(Overrides {
                location: Some("b".to_string()),
                log_level: Some("debug".to_string()),
                ..Overrides::default()
            });

        assert_eq!(
            settings.defaults_source(),
            DefaultsSource {
                backend: "file".to_string(),
                location: "b".to_string(),
            }
        );
        assert_eq!(settings.logging.level, "debug");
    }
}

//! User configuration for the payload CLI.
//!
//! Settings live in a small JSON file, by default
//! `~/.config/payload/config.json` on most platforms. Every field is optional;
//! missing fields take their defaults. A file that cannot be parsed is
//! reported and ignored rather than failing the command.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use dirs_next::{config_dir, home_dir};
use payload_engine::{CodecContext, Format, QueryOptions};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Environment variable overriding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "PAYLOAD_CONFIG_PATH";

pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayloadConfig {
    /// Format assumed for input that has no recognizable file extension.
    pub default_format: Format,
    pub codec: CodecContext,
    pub query: QueryOptions,
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            default_format: Format::Json,
            codec: CodecContext::default(),
            query: QueryOptions::default(),
        }
    }
}

impl PayloadConfig {
    /// Loads the configuration from [`default_config_path`].
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&default_config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(config) => {
                    debug!(path = %path.display(), "loaded configuration");
                    Ok(config)
                }
                Err(error) => {
                    warn!(
                        path = %path.display(),
                        error = %error,
                        "Failed to parse configuration file; using defaults"
                    );
                    Ok(Self::default())
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// `$PAYLOAD_CONFIG_PATH` when set (with `~` expanded), otherwise
/// `<config dir>/payload/config.json`.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return expand_tilde(trimmed);
        }
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("payload")
        .join(CONFIG_FILE_NAME)
}

fn expand_tilde(path: &str) -> PathBuf {
    let home = || home_dir().unwrap_or_else(|| PathBuf::from("~"));
    if path == "~" {
        return home();
    }
    match path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        Some(rest) => home().join(rest),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payload_engine::QueryEncoding;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = PayloadConfig::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, PayloadConfig::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r#"{"default_format": "yaml", "codec": {"pretty": true}, "query": {"encoding": "rfc3986"}}"#,
        )
        .unwrap();

        let config = PayloadConfig::load_from(&path).unwrap();
        assert_eq!(config.default_format, Format::Yaml);
        assert!(config.codec.pretty);
        assert_eq!(config.codec.xml_root_name, "response");
        assert_eq!(config.query.encoding, QueryEncoding::Rfc3986);
        assert_eq!(config.query.separator, None);
    }

    #[test]
    fn unparsable_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "not json").unwrap();
        assert_eq!(PayloadConfig::load_from(&path).unwrap(), PayloadConfig::default());
    }

    #[test]
    fn directories_are_io_errors() {
        let dir = tempdir().unwrap();
        assert!(matches!(PayloadConfig::load_from(dir.path()), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn default_path_honors_env_override() {
        temp_env::with_var(CONFIG_PATH_ENV, Some("~/custom/payload.json"), || {
            assert_eq!(default_config_path(), expand_tilde("~/custom/payload.json"));
            assert!(default_config_path().ends_with("custom/payload.json"));
        });
        temp_env::with_var(CONFIG_PATH_ENV, Some("   "), || {
            assert!(default_config_path().ends_with(Path::new("payload").join(CONFIG_FILE_NAME)));
        });
    }
}

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::codec::io::DEFAULT_BUFFER_CAPACITY;

const MIN_WRITE_BUFFER: usize = 512;
const MAX_WRITE_BUFFER: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("Unknown log format: {}", other)),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store_root: PathBuf,
    pub compress_data: bool,
    pub durable_writes: bool,
    pub write_buffer_bytes: usize,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_root: PathBuf::from("./segstore"),
            compress_data: false,
            durable_writes: false,
            write_buffer_bytes: DEFAULT_BUFFER_CAPACITY,
            log_format: LogFormat::Text,
        }
    }
}

/// Fields a config file may set; anything left out keeps its env value.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    store_root: Option<PathBuf>,
    compress_data: Option<bool>,
    durable_writes: Option<bool>,
    write_buffer_bytes: Option<usize>,
    log_format: Option<LogFormat>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source, falling back to defaults
    /// for missing or unparsable values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            store_root: lookup("STORE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_root),
            compress_data: lookup("COMPRESS_DATA")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.compress_data),
            durable_writes: lookup("DURABLE_WRITES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.durable_writes),
            write_buffer_bytes: lookup("WRITE_BUFFER_BYTES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.write_buffer_bytes),
            log_format: lookup("LOG_FORMAT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.log_format),
        }
    }

    /// Environment config overlaid with the fields set in a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_env().merge_toml(&text)
    }

    fn merge_toml(mut self, text: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(text)?;
        if let Some(root) = file.store_root {
            self.store_root = root;
        }
        if let Some(compress) = file.compress_data {
            self.compress_data = compress;
        }
        if let Some(durable) = file.durable_writes {
            self.durable_writes = durable;
        }
        if let Some(bytes) = file.write_buffer_bytes {
            self.write_buffer_bytes = bytes;
        }
        if let Some(format) = file.log_format {
            self.log_format = format;
        }
        Ok(self)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.store_root.as_os_str().is_empty() {
            return Err("STORE_ROOT cannot be empty".to_string());
        }

        if self.write_buffer_bytes < MIN_WRITE_BUFFER || self.write_buffer_bytes > MAX_WRITE_BUFFER
        {
            return Err(format!(
                "WRITE_BUFFER_BYTES must be between {} and {}",
                MIN_WRITE_BUFFER, MAX_WRITE_BUFFER
            ));
        }

        if self.compress_data && !cfg!(feature = "compression") {
            return Err("COMPRESS_DATA requires the compression feature".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_validate() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config.write_buffer_bytes, DEFAULT_BUFFER_CAPACITY);
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_values() {
        let config = Config::from_lookup(lookup(&[
            ("STORE_ROOT", "/srv/units"),
            ("DURABLE_WRITES", "true"),
            ("WRITE_BUFFER_BYTES", "65536"),
            ("LOG_FORMAT", "JSON"),
            ("COMPRESS_DATA", "not-a-bool"),
        ]));
        assert_eq!(config.store_root, PathBuf::from("/srv/units"));
        assert!(config.durable_writes);
        assert!(!config.compress_data);
        assert_eq!(config.write_buffer_bytes, 65536);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_toml_overrides_only_given_fields() {
        let base = Config::from_lookup(lookup(&[("DURABLE_WRITES", "true")]));
        let merged = base
            .merge_toml("store_root = \"/data/seg\"\nlog_format = \"json\"\n")
            .unwrap();
        assert_eq!(merged.store_root, PathBuf::from("/data/seg"));
        assert_eq!(merged.log_format, LogFormat::Json);
        assert!(merged.durable_writes);
    }

    #[test]
    fn test_from_file_rejects_unknown_fields() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "listen_addr = \"0.0.0.0:8080\"").unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validate_buffer_bounds() {
        let config = Config {
            write_buffer_bytes: 16,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}

//! TOML-based settings for the client.
//!
//! Each client of an installation gets its own settings file naming the
//! coordinator to connect to. The connection parameters are immutable after
//! construction; changing them means restarting the client.
//!
//! ```toml
//! [coordinator]
//! host = "192.168.0.10"
//! port = 9002
//!
//! [wire]
//! delimiter = "\n"
//!
//! [client]
//! log_level = "info"
//! ```
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent from the TOML file, so a minimal
//! or missing settings file still yields a working configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for settings file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse settings TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configured delimiter is not exactly one byte.
    #[error("wire delimiter must be a single byte, got {value:?}")]
    InvalidDelimiter { value: String },
}

// ── Settings schema types ─────────────────────────────────────────────────────

/// Top-level client settings loaded at construction time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ClientSettings {
    #[serde(default)]
    pub coordinator: CoordinatorSettings,
    #[serde(default)]
    pub wire: WireSettings,
    #[serde(default)]
    pub client: ClientSection,
}

/// Where the coordinator listens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoordinatorSettings {
    /// Hostname or IP address of the coordinator.
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port of the coordinator.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Wire format parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireSettings {
    /// Message delimiter; must be a single byte that never occurs inside a
    /// textual payload.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

/// General client behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientSection {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    9002
}
fn default_delimiter() -> String {
    "\n".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for WireSettings {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
        }
    }
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl WireSettings {
    /// Returns the delimiter as the single byte the transport splits on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDelimiter`] when the configured string
    /// is not exactly one byte long.
    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        match self.delimiter.as_bytes() {
            [byte] => Ok(*byte),
            _ => Err(ConfigError::InvalidDelimiter {
                value: self.delimiter.clone(),
            }),
        }
    }
}

impl ClientSettings {
    /// Loads settings from `path`, returning `ClientSettings::default()` if
    /// the file does not yet exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] for file-system errors other than "not
    /// found", [`ConfigError::Parse`] if the TOML is malformed, and
    /// [`ConfigError::InvalidDelimiter`] if the delimiter is not one byte.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let settings = match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        // Validate up front so the transport never sees a bad delimiter.
        settings.wire.delimiter_byte()?;
        Ok(settings)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

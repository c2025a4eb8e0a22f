use std::env;

use crate::parser::FileFormat;

/// Application configuration
/// Provides defaults with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub max_upload_bytes: usize,
    pub default_format: FileFormat,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; missing or unparseable values fall back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            port: lookup("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            max_upload_bytes: lookup("MAX_UPLOAD_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(1024 * 1024),
            default_format: lookup("DEFAULT_TESTCASE_FORMAT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(FileFormat::Text),
        }
    }

    pub fn new() -> Self {
        Self::from_env()
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

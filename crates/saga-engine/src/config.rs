use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::options::{RetryPolicy, RunOptions};

#[derive(Debug, Deserialize, Default)]
pub(crate) struct SagaConfigFile {
    #[serde(default)]
    pub(crate) retry: Option<RetrySection>,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct RetrySection {
    #[serde(default)]
    pub(crate) attempts: u32,
    #[serde(default, rename = "delay-ms")]
    pub(crate) delay_ms: u64,
}

impl From<SagaConfigFile> for RunOptions {
    fn from(file: SagaConfigFile) -> Self {
        let retry = file.retry.map_or(RetryPolicy::NONE, |section| {
            RetryPolicy::new(section.attempts, Duration::from_millis(section.delay_ms))
        });
        RunOptions::new().with_retry_policy(retry)
    }
}

impl RunOptions {
    /// Parse run options from TOML.
    ///
    /// ```toml
    /// [retry]
    /// attempts = 3
    /// delay-ms = 250
    /// ```
    ///
    /// Missing sections and keys fall back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` if the input is not valid TOML or a value
    /// has the wrong type.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let file: SagaConfigFile = toml::from_str(source)?;
        Ok(file.into())
    }

    /// Read and parse run options from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` if the file cannot be read and
    /// `ConfigError::Parse` if its contents are invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}

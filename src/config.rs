#[cfg(test)]
mod tests;

use {
    serde::Deserialize,
    std::{fs, io, path::Path},
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read the config file")]
    Read(#[source] io::Error),
    #[error("Could not parse the config")]
    Parse(#[source] serde_json::Error),
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlipConfig {
    /// Whether requests for async (tearing) flips are honored.
    pub async_flips: bool,
    pub max_pending_sequences: usize,
    /// How often a full event channel is retried after a drain that found
    /// nothing to dispatch.
    pub max_idle_retries: u32,
    pub log_level: LogLevel,
}

impl Default for FlipConfig {
    fn default() -> Self {
        Self {
            async_flips: true,
            max_pending_sequences: 1024,
            max_idle_retries: 4,
            log_level: LogLevel::Info,
        }
    }
}

impl FlipConfig {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Parse)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let s = fs::read_to_string(path).map_err(ConfigError::Read)?;
        Self::parse(&s)
    }
}

use serde::Deserialize;
use serde_enum_str::Deserialize_enum_str;
use std::path::Path;
use strum_macros::Display;

/// Startup configuration: bind address, port, database count, and the
/// logging setup. Carried as a typed struct rather than loose globals
/// so the server and its tests can construct one without touching the
/// environment.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_databases")]
    pub databases: u8,

    #[serde(flatten)]
    pub log: Log,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Log {
    #[serde(rename = "loglevel", default)]
    pub level: LogLevel,

    #[serde(rename = "logfile", default)]
    pub file: Option<String>,
}

#[derive(Debug, Deserialize_enum_str, Display, Clone, PartialEq, Eq)]
pub enum LogLevel {
    #[serde(rename = "trace")]
    Trace,
    #[serde(rename = "debug")]
    Debug,
    #[serde(rename = "info")]
    Info,
    #[serde(rename = "warning")]
    Warning,
    #[serde(other, rename = "error")]
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl LogLevel {
    pub fn as_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warning => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

impl Default for Log {
    fn default() -> Self {
        Log {
            level: LogLevel::default(),
            file: None,
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1".to_owned()
}

fn default_port() -> u16 {
    9000
}

fn default_databases() -> u8 {
    16
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind: default_bind(),
            port: default_port(),
            databases: default_databases(),
            log: Log::default(),
        }
    }
}

impl Config {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    /// Loads configuration from a redis.conf-style `key arg...` file.
    /// Any field absent from the file keeps its built-in default.
    /// A missing file is not an error at this level -- callers decide
    /// whether an explicitly requested path must exist.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_str(&text)
    }

    pub fn from_str(text: &str) -> Result<Config, ConfigError> {
        let mut config = Config::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.splitn(2, char::is_whitespace);
            let key = parts.next().unwrap_or("");
            let value = parts.next().unwrap_or("").trim();
            match key {
                "bind" => config.bind = value.to_owned(),
                "port" => {
                    config.port = value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue(key.to_owned()))?
                }
                "databases" => {
                    config.databases = value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue(key.to_owned()))?
                }
                "loglevel" => {
                    config.log.level = match value {
                        "trace" => LogLevel::Trace,
                        "debug" => LogLevel::Debug,
                        "info" => LogLevel::Info,
                        "warning" => LogLevel::Warning,
                        _ => LogLevel::Error,
                    }
                }
                "logfile" if !value.is_empty() => config.log.file = Some(value.to_owned()),
                _ => {}
            }
        }
        Ok(config)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid value for '{0}'")]
    InvalidValue(String),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.addr(), "127.0.0.1:9000");
        assert_eq!(config.databases, 16);
        assert_eq!(config.log.level, LogLevel::Info);
    }

    #[test]
    fn parses_overrides() {
        let config = Config::from_str(
            "# a comment\nbind 0.0.0.0\nport 7000\nloglevel debug\ndatabases 16\n",
        )
        .unwrap();
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.port, 7000);
        assert_eq!(config.log.level, LogLevel::Debug);
    }

    #[test]
    fn rejects_bad_port() {
        assert!(Config::from_str("port notanumber\n").is_err());
    }

    #[test]
    fn log_level_maps_to_filter() {
        assert_eq!(LogLevel::Warning.as_level_filter(), log::LevelFilter::Warn);
        assert_eq!(LogLevel::Error.as_level_filter(), log::LevelFilter::Error);
    }
}

//! Configuration for the JSON exporter.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// HTTP endpoint settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Outbound probe settings.
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Address to listen on (default: "0.0.0.0:9116").
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    "0.0.0.0:9116".to_string()
}

impl HttpConfig {
    /// Resolve the listen address.
    ///
    /// A bare `:port` binds every interface, like `0.0.0.0:port`.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let listen = if self.listen.starts_with(':') {
            format!("0.0.0.0{}", self.listen)
        } else {
            self.listen.clone()
        };

        listen.parse().map_err(|_| {
            ConfigError::Validation(format!("Invalid listen address: {}", self.listen))
        })
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// Settings of the HTTP client used to fetch targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Per-request timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Accept invalid TLS certificates from targets.
    #[serde(default = "default_insecure_skip_verify")]
    pub insecure_skip_verify: bool,

    /// Idle connections kept per target host.
    #[serde(default = "default_max_idle_connections")]
    pub max_idle_connections: usize,
}

fn default_timeout() -> u64 {
    10
}

fn default_insecure_skip_verify() -> bool {
    true
}

fn default_max_idle_connections() -> usize {
    100
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            insecure_skip_verify: default_insecure_skip_verify(),
            max_idle_connections: default_max_idle_connections(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.http.listen_addr()?;

        if self.probe.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_config() {
        let config = ExporterConfig::parse("{}").unwrap();

        assert_eq!(config.http.listen, "0.0.0.0:9116");
        assert_eq!(config.probe.timeout_secs, 10);
        assert!(config.probe.insecure_skip_verify);
        assert_eq!(config.probe.max_idle_connections, 100);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            http: {
                listen: "127.0.0.1:9200",
            },
            probe: {
                timeout_secs: 3,
                insecure_skip_verify: false,
                max_idle_connections: 8,
            },
            logging: {
                level: "debug",
                format: "json"
            }
        }"#;

        let config = ExporterConfig::parse(json).unwrap();

        assert_eq!(config.http.listen, "127.0.0.1:9200");
        assert_eq!(config.probe.timeout_secs, 3);
        assert!(!config.probe.insecure_skip_verify);
        assert_eq!(config.probe.max_idle_connections, 8);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_listen_port_shorthand() {
        let json = r#"{
            http: { listen: ":9116" }
        }"#;

        let config = ExporterConfig::parse(json).unwrap();
        assert_eq!(
            config.http.listen_addr().unwrap(),
            "0.0.0.0:9116".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_validate_invalid_listen() {
        for listen in ["not-an-address", ":", ":port", "127.0.0.1"] {
            let json = format!("{{ http: {{ listen: \"{}\" }} }}", listen);

            let result = ExporterConfig::parse(&json);
            assert!(
                result
                    .unwrap_err()
                    .to_string()
                    .contains("Invalid listen address"),
                "{} should be rejected",
                listen
            );
        }
    }

    #[test]
    fn test_validate_zero_timeout() {
        let json = r#"{
            probe: { timeout_secs: 0 }
        }"#;

        let result = ExporterConfig::parse(json);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_parse_error() {
        let result = ExporterConfig::parse("{ http: ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{ http: {{ listen: \"127.0.0.1:9300\" }} }}").unwrap();

        let config = ExporterConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.http.listen, "127.0.0.1:9300");
    }

    #[test]
    fn test_load_missing_file() {
        let result = ExporterConfig::load_from_file("/nonexistent/json-exporter.json5");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}

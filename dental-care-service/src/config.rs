use std::net::SocketAddr;

use thiserror::Error;

use crate::household::MaritalStatusCodes;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Process configuration, read once at startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_address: SocketAddr,
    pub database_url: Option<String>,
    pub log_format: LogFormat,
    pub marital_status_codes: MaritalStatusCodes,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_url: None,
            log_format: LogFormat::Json,
            marital_status_codes: MaritalStatusCodes::default(),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(address) = lookup("BIND_ADDRESS") {
            config.bind_address = address.parse().map_err(|e| ConfigError::Invalid {
                name: "BIND_ADDRESS",
                reason: format!("{e}"),
            })?;
        }

        config.database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        if let Some(format) = lookup("LOG_FORMAT") {
            config.log_format = match format.as_str() {
                "pretty" => LogFormat::Pretty,
                "json" => LogFormat::Json,
                other => {
                    return Err(ConfigError::Invalid {
                        name: "LOG_FORMAT",
                        reason: format!("expected json or pretty, got {other}"),
                    });
                }
            };
        }

        if let Some(code) = lookup("MARITAL_STATUS_CODE_MARRIED") {
            config.marital_status_codes.married = non_empty("MARITAL_STATUS_CODE_MARRIED", code)?;
        }
        if let Some(code) = lookup("MARITAL_STATUS_CODE_COMMONLAW") {
            config.marital_status_codes.common_law =
                non_empty("MARITAL_STATUS_CODE_COMMONLAW", code)?;
        }

        Ok(config)
    }
}

fn non_empty(name: &'static str, value: String) -> Result<String> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(ConfigError::Invalid {
            name,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<ServiceConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_address.port(), 3000);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.database_url.is_none());
        assert_eq!(config.marital_status_codes, MaritalStatusCodes::default());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("BIND_ADDRESS", "127.0.0.1:8080"),
            ("LOG_FORMAT", "pretty"),
            ("DATABASE_URL", "postgres://localhost/cdcp"),
            ("MARITAL_STATUS_CODE_MARRIED", "775170001"),
            ("MARITAL_STATUS_CODE_COMMONLAW", "775170002"),
        ])
        .unwrap();

        assert_eq!(config.bind_address.port(), 8080);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/cdcp"));
        assert_eq!(config.marital_status_codes.married, "775170001");
        assert_eq!(config.marital_status_codes.common_law, "775170002");
    }

    #[test]
    fn test_invalid_values() {
        assert!(config_from(&[("LOG_FORMAT", "xml")]).is_err());
        assert!(config_from(&[("BIND_ADDRESS", "nowhere")]).is_err());
        assert!(config_from(&[("MARITAL_STATUS_CODE_MARRIED", " ")]).is_err());
    }
}

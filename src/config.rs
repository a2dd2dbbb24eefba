use std::time::Duration;

use thiserror::Error;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_base_url: String,
    pub http_timeout: Duration,
    pub log_level: String,
    pub log_json: bool,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key} must be a positive integer, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },
    #[error("{key} must be true or false, got '{value}'")]
    InvalidBool { key: &'static str, value: String },
    #[error("{key} must be an http(s) URL, got '{value}'")]
    InvalidUrl { key: &'static str, value: String },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_json: false,
        }
    }
}

impl Config {
    /// Reads `.env` if present, then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Config::default();

        if let Some(url) = lookup("MARKGRID_API_BASE_URL").filter(|v| !v.trim().is_empty()) {
            let url = url.trim().trim_end_matches('/').to_string();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl {
                    key: "MARKGRID_API_BASE_URL",
                    value: url,
                });
            }
            cfg.api_base_url = url;
        }

        if let Some(raw) = lookup("MARKGRID_HTTP_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => cfg.http_timeout = Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        key: "MARKGRID_HTTP_TIMEOUT_SECS",
                        value: raw,
                    })
                }
            }
        }

        if let Some(level) = lookup("MARKGRID_LOG").filter(|v| !v.trim().is_empty()) {
            cfg.log_level = level.trim().to_string();
        }

        if let Some(raw) = lookup("MARKGRID_LOG_JSON") {
            cfg.log_json = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                _ => {
                    return Err(ConfigError::InvalidBool {
                        key: "MARKGRID_LOG_JSON",
                        value: raw,
                    })
                }
            };
        }

        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn cfg(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(cfg(&[]).expect("cfg"), Config::default());
    }

    #[test]
    fn overrides_are_applied() {
        let c = cfg(&[
            ("MARKGRID_API_BASE_URL", "https://school.example/api/"),
            ("MARKGRID_HTTP_TIMEOUT_SECS", "5"),
            ("MARKGRID_LOG", "debug"),
            ("MARKGRID_LOG_JSON", "true"),
        ])
        .expect("cfg");
        assert_eq!(c.api_base_url, "https://school.example/api");
        assert_eq!(c.http_timeout, Duration::from_secs(5));
        assert_eq!(c.log_level, "debug");
        assert!(c.log_json);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            cfg(&[("MARKGRID_HTTP_TIMEOUT_SECS", "0")]),
            Err(ConfigError::InvalidNumber { .. })
        ));
        assert!(matches!(
            cfg(&[("MARKGRID_LOG_JSON", "maybe")]),
            Err(ConfigError::InvalidBool { .. })
        ));
        assert!(matches!(
            cfg(&[("MARKGRID_API_BASE_URL", "ftp://x")]),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }
}

use serde::Deserialize;
use std::env;

use crate::rate_limit::RateLimitSet;

/// Five MiB, the largest request body the service accepts.
pub const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub uploads: UploadConfig,
    pub ocr: OcrConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Directory holding in-flight uploads. Empty between requests.
    pub dir: String,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// Tesseract language codes, `+`-separated (e.g. `eng+deu`).
    pub languages: String,
    /// Recognition runs longer than this are answered with 408. The run
    /// itself is never interrupted.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Applied to every non-exempt route, shared per client.
    pub default_limits: RateLimitSet,
    /// Extra limits for `POST /ocr`.
    pub ocr_limits: RateLimitSet,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_limits: RateLimitSet::default_global(),
            ocr_limits: RateLimitSet::default_ocr(),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: "eng".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("PORT", 5000),
            },
            uploads: UploadConfig {
                dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
                max_body_bytes: parse_env_or("MAX_CONTENT_LENGTH", DEFAULT_MAX_BODY_BYTES),
            },
            ocr: OcrConfig {
                languages: env::var("OCR_LANGUAGES").unwrap_or_else(|_| "eng".to_string()),
                timeout_secs: parse_env_or("OCR_TIMEOUT", 10),
            },
            rate_limit: RateLimitConfig {
                enabled: parse_env_or("RATELIMIT_ENABLED", true),
                default_limits: parse_env_or(
                    "RATELIMIT_DEFAULT",
                    RateLimitSet::default_global(),
                ),
                ocr_limits: parse_env_or("RATELIMIT_OCR", RateLimitSet::default_ocr()),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::time::Duration;

    const VARS: &[&str] = &[
        "HOST",
        "PORT",
        "UPLOAD_DIR",
        "MAX_CONTENT_LENGTH",
        "OCR_LANGUAGES",
        "OCR_TIMEOUT",
        "RATELIMIT_ENABLED",
        "RATELIMIT_DEFAULT",
        "RATELIMIT_OCR",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        clear_env();

        let config = Config::from_env();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.uploads.dir, "uploads");
        assert_eq!(config.uploads.max_body_bytes, 5 * 1024 * 1024);
        assert_eq!(config.ocr.languages, "eng");
        assert_eq!(config.ocr.timeout_secs, 10);
        assert!(config.rate_limit.enabled);
        assert_eq!(config.rate_limit.default_limits.to_string(), "200 per 1 day;50 per 1 hour");
        assert_eq!(config.rate_limit.ocr_limits.to_string(), "30 per 1 minute");
    }

    #[test]
    #[serial]
    fn test_port_from_env() {
        clear_env();
        std::env::set_var("PORT", "8080");

        let config = Config::from_env();
        assert_eq!(config.server.port, 8080);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_port_falls_back_to_default() {
        clear_env();
        std::env::set_var("PORT", "not-a-port");

        let config = Config::from_env();
        assert_eq!(config.server.port, 5000);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_rate_limits_from_env() {
        clear_env();
        std::env::set_var("RATELIMIT_OCR", "5 per 10 seconds");
        std::env::set_var("RATELIMIT_ENABLED", "false");

        let config = Config::from_env();
        assert!(!config.rate_limit.enabled);
        let limits = config.rate_limit.ocr_limits.limits();
        assert_eq!(limits.len(), 1);
        assert_eq!(limits[0].amount(), 5);
        assert_eq!(limits[0].window(), Duration::from_secs(10));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_malformed_rate_limit_keeps_default() {
        clear_env();
        std::env::set_var("RATELIMIT_DEFAULT", "lots per fortnight");

        let config = Config::from_env();
        assert_eq!(config.rate_limit.default_limits.limits().len(), 2);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_parse_env_or_valid_value() {
        std::env::set_var("__TEST_PARSE_TIMEOUT", "42");
        let result: u64 = parse_env_or("__TEST_PARSE_TIMEOUT", 10);
        assert_eq!(result, 42);
        std::env::remove_var("__TEST_PARSE_TIMEOUT");
    }
}

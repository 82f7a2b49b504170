use dotenvy::dotenv;
use std::env;
use std::time::Duration;

use crate::error::{AppError, Result};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_STORAGE_KEY: &str = "p4-feature-flags";
const DEFAULT_HTTP_TIMEOUT_MS: u64 = 3_000;

/// Runtime configuration, read from the environment (and `.env` if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Unset → flag snapshots live in memory only.
    pub redis_url: Option<String>,
    /// Remote flags endpoint. Unset → the remote layer is skipped.
    pub flags_url: Option<String>,
    /// Base URL of the analytics / performance sink.
    pub telemetry_url: Option<String>,
    pub flag_storage_key: String,
    /// Startup `ff` override, same format as the query parameter.
    pub flag_override: Option<String>,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let _ = dotenv().is_ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match non_empty("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                AppError::Config(format!("PORT must be a valid u16 number, got {raw:?}"))
            })?,
            None => DEFAULT_PORT,
        };

        let timeout_ms = match non_empty("HTTP_TIMEOUT_MS") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                AppError::Config(format!(
                    "HTTP_TIMEOUT_MS must be a number of milliseconds, got {raw:?}"
                ))
            })?,
            None => DEFAULT_HTTP_TIMEOUT_MS,
        };

        Ok(Self {
            port,
            redis_url: non_empty("REDIS_URL"),
            flags_url: non_empty("FLAGS_URL"),
            telemetry_url: non_empty("TELEMETRY_URL"),
            flag_storage_key: non_empty("FLAG_STORAGE_KEY")
                .unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_string()),
            flag_override: non_empty("FLAG_OVERRIDE"),
            http_timeout: Duration::from_millis(timeout_ms),
        })
    }

    pub fn addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.flag_storage_key, "p4-feature-flags");
        assert!(cfg.redis_url.is_none());
        assert!(cfg.flags_url.is_none());
        assert_eq!(cfg.http_timeout, Duration::from_secs(3));
        assert_eq!(cfg.addr(), "0.0.0.0:3000");
    }

    #[test]
    fn reads_every_variable() {
        let cfg = Config::from_lookup(lookup(&[
            ("PORT", "8081"),
            ("REDIS_URL", "redis://127.0.0.1:6379/"),
            ("FLAGS_URL", "http://flags.local/flags"),
            ("TELEMETRY_URL", "http://sink.local/api"),
            ("FLAG_STORAGE_KEY", "ff-snapshot"),
            ("FLAG_OVERRIDE", "rfq.enabled:off"),
            ("HTTP_TIMEOUT_MS", "250"),
        ]))
        .unwrap();

        assert_eq!(cfg.port, 8081);
        assert_eq!(cfg.redis_url.as_deref(), Some("redis://127.0.0.1:6379/"));
        assert_eq!(cfg.flags_url.as_deref(), Some("http://flags.local/flags"));
        assert_eq!(cfg.telemetry_url.as_deref(), Some("http://sink.local/api"));
        assert_eq!(cfg.flag_storage_key, "ff-snapshot");
        assert_eq!(cfg.flag_override.as_deref(), Some("rfq.enabled:off"));
        assert_eq!(cfg.http_timeout, Duration::from_millis(250));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let cfg = Config::from_lookup(lookup(&[("REDIS_URL", "  "), ("PORT", "")])).unwrap();
        assert!(cfg.redis_url.is_none());
        assert_eq!(cfg.port, 3000);
    }

    #[test]
    fn rejects_invalid_port() {
        let err = Config::from_lookup(lookup(&[("PORT", "seventy")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}

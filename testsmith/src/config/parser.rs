//! INI parsing logic for converting `Ini` → `Config`.
//!
//! The single place where INI key names are mapped to struct fields. Starts
//! from `Config::default()` and overlays any values found in the file.

use super::file::ConfigError;
use super::settings::Config;
use ini::Ini;
use std::time::Duration;

pub(super) fn parse_ini(ini: &Ini) -> Result<Config, ConfigError> {
    let mut config = Config::default();

    // [intake] section
    if let Some(section) = ini.section(Some("intake")) {
        if let Some(v) = section.get("min_body_len") {
            config.intake.min_body_len = parse_usize("intake", "min_body_len", v)?;
        }
    }

    // [retry] section
    if let Some(section) = ini.section(Some("retry")) {
        if let Some(v) = section.get("max_retries") {
            config.retry.max_retries =
                parse_usize("retry", "max_retries", v)? as u32;
        }
        if let Some(v) = section.get("delays") {
            config.retry.delays = parse_delays(v)?;
        }
    }

    // [idempotency] section
    if let Some(section) = ini.section(Some("idempotency")) {
        if let Some(v) = section.get("ttl") {
            config.idempotency.ttl = parse_secs("idempotency", "ttl", v)?;
        }
    }

    // [pipeline] section
    if let Some(section) = ini.section(Some("pipeline")) {
        if let Some(v) = section.get("retrieve_timeout") {
            config.pipeline.retrieve_timeout = parse_secs("pipeline", "retrieve_timeout", v)?;
        }
        if let Some(v) = section.get("generate_timeout") {
            config.pipeline.generate_timeout = parse_secs("pipeline", "generate_timeout", v)?;
        }
        if let Some(v) = section.get("repository_timeout") {
            config.pipeline.repository_timeout = parse_secs("pipeline", "repository_timeout", v)?;
        }
        if let Some(v) = section.get("context_limit") {
            config.pipeline.context_limit = parse_usize("pipeline", "context_limit", v)?;
        }
        if let Some(v) = section.get("min_artifact_len") {
            config.pipeline.min_artifact_len = parse_usize("pipeline", "min_artifact_len", v)?;
        }
    }

    // [service] section
    if let Some(section) = ini.section(Some("service")) {
        if let Some(v) = section.get("workers") {
            let workers = parse_usize("service", "workers", v)?;
            if workers == 0 {
                return Err(invalid("service", "workers", v, "must be at least 1"));
            }
            config.service.workers = workers;
        }
        if let Some(v) = section.get("watchdog_interval") {
            config.service.watchdog_interval = parse_secs("service", "watchdog_interval", v)?;
        }
        if let Some(v) = section.get("max_processing") {
            config.service.max_processing = parse_secs("service", "max_processing", v)?;
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_usize(section: &str, key: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, "must be a non-negative integer"))
}

fn parse_secs(section: &str, key: &str, value: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, "must be a non-negative integer (seconds)"))?;
    Ok(Duration::from_secs(secs))
}

/// Parses a comma-separated backoff schedule, e.g. `5, 15, 45`.
fn parse_delays(value: &str) -> Result<Vec<Duration>, ConfigError> {
    value
        .split(',')
        .map(|part| {
            let secs: u64 = part.trim().parse().map_err(|_| {
                invalid(
                    "retry",
                    "delays",
                    value,
                    "expected comma-separated seconds like '5, 15, 45'",
                )
            })?;
            Ok(Duration::from_secs(secs))
        })
        .collect()
}

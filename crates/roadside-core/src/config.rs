use std::net::SocketAddr;
use std::str::FromStr;

use roadside_location::{MapProvider, PositionOptions};

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from variables already in the process,
/// without reading `.env`.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration from an env-var lookup function, so tests
/// can drive it from a plain map.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>().map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("ROADSIDE_ENV", "development"))?;

    let bind_addr = parse("ROADSIDE_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("ROADSIDE_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("ROADSIDE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("ROADSIDE_DB_MIN_CONNECTIONS", "1")?;
    if db_min_connections > db_max_connections {
        return Err(invalid(
            "ROADSIDE_DB_MIN_CONNECTIONS",
            format!("{db_min_connections} exceeds ROADSIDE_DB_MAX_CONNECTIONS ({db_max_connections})"),
        ));
    }
    let db_acquire_timeout_secs = parse_u64("ROADSIDE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let min_timeout_ms =
        u64::try_from(PositionOptions::MIN_TIMEOUT.as_millis()).unwrap_or(u64::MAX);
    let geolocation_timeout_ms =
        parse_u64("ROADSIDE_GEOLOCATION_TIMEOUT_MS", "30000")?.max(min_timeout_ms);

    let default_map_provider = MapProvider::from_str(&or_default(
        "ROADSIDE_DEFAULT_MAP_PROVIDER",
        "primary",
    ))
    .map_err(|reason| invalid("ROADSIDE_DEFAULT_MAP_PROVIDER", reason))?;

    let submission_limit = parse_usize("ROADSIDE_SUBMISSION_LIMIT", "5")?;
    if submission_limit == 0 {
        return Err(invalid("ROADSIDE_SUBMISSION_LIMIT", "must be at least 1".into()));
    }
    let submission_window_secs = parse_u64("ROADSIDE_SUBMISSION_WINDOW_SECS", "900")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        geolocation_timeout_ms,
        default_map_provider,
        submission_limit,
        submission_window_secs,
    })
}

fn invalid(var: &str, reason: String) -> ConfigError {
    ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    }
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(invalid(
            "ROADSIDE_ENV",
            format!("expected development, test or production, got '{other}'"),
        )),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

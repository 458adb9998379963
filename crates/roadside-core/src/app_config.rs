use std::net::SocketAddr;
use std::time::Duration;

use roadside_location::{MapProvider, PositionOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Sensor timeout handed to clients; never below 15 seconds.
    pub geolocation_timeout_ms: u64,
    pub default_map_provider: MapProvider,
    pub submission_limit: usize,
    pub submission_window_secs: u64,
}

impl AppConfig {
    /// Sensor options clients should use for a location request.
    #[must_use]
    pub fn position_options(&self) -> PositionOptions {
        PositionOptions::with_timeout(Duration::from_millis(self.geolocation_timeout_ms))
    }

    #[must_use]
    pub fn submission_window(&self) -> Duration {
        Duration::from_secs(self.submission_window_secs)
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("geolocation_timeout_ms", &self.geolocation_timeout_ms)
            .field("default_map_provider", &self.default_map_provider)
            .field("submission_limit", &self.submission_limit)
            .field("submission_window_secs", &self.submission_window_secs)
            .finish()
    }
}

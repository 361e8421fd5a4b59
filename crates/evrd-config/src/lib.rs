mod error;

use std::time::Duration;

pub use error::ConfigError;

/// Every process-wide setting, resolved once at startup from the
/// environment. A `ConfigError` here is fatal: the daemon logs it and
/// exits 1 before opening any connection.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub poll_interval: Duration,
    pub max_concurrent_events: u32,
    pub log_level: String,
    pub port: u16,
    pub project_id: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_max_lifetime: Duration,
    pub drain_timeout: Duration,
    pub control_plane_base_url: Option<String>,
    pub dry_run: bool,
    pub stale_recovery_window: Duration,
}

fn env_var(name: &'static str) -> Result<Option<String>, ConfigError> {
    match std::env::var(name) {
        Ok(v) => Ok(Some(v)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidVar {
            var: name,
            value: "<non-unicode>".to_string(),
            reason: "not valid unicode".to_string(),
        }),
    }
}

fn parse_with_default<T: std::str::FromStr>(
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match env_var(name)? {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|_| ConfigError::InvalidVar {
            var: name,
            value: raw,
            reason: "could not be parsed".to_string(),
        }),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env_var("DATABASE_URL")?.ok_or(ConfigError::MissingVar("DATABASE_URL"))?;

        let poll_interval_seconds: u64 = parse_with_default("POLL_INTERVAL_SECONDS", 5)?;
        let max_concurrent_events: u32 = parse_with_default("MAX_CONCURRENT_EVENTS", 10)?;
        let log_level = env_var("LOG_LEVEL")?.unwrap_or_else(|| "INFO".to_string());
        let port: u16 = parse_with_default("PORT", 8081)?;
        let project_id = env_var("PROJECT_ID")?;

        let db_max_connections: u32 = parse_with_default("DB_MAX_CONNECTIONS", 25)?;
        let db_min_connections: u32 = parse_with_default("DB_MIN_CONNECTIONS", 5)?;
        let db_max_lifetime_seconds: u64 = parse_with_default("DB_MAX_LIFETIME_SECONDS", 300)?;
        let drain_timeout_seconds: u64 = parse_with_default("DRAIN_TIMEOUT_SECONDS", 10)?;
        let control_plane_base_url = env_var("CONTROL_PLANE_BASE_URL")?;
        let dry_run: bool = parse_with_default("DRY_RUN", false)?;
        let stale_recovery_seconds: u64 = parse_with_default("STALE_RECOVERY_SECONDS", 300)?;

        Ok(Config {
            database_url,
            poll_interval: Duration::from_secs(poll_interval_seconds),
            max_concurrent_events,
            log_level,
            port,
            project_id,
            db_max_connections,
            db_min_connections,
            db_max_lifetime: Duration::from_secs(db_max_lifetime_seconds),
            drain_timeout: Duration::from_secs(drain_timeout_seconds),
            control_plane_base_url,
            dry_run,
            stale_recovery_window: Duration::from_secs(stale_recovery_seconds),
        })
    }
}

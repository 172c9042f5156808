use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::error::AppError;
use crate::services::ImportSettings;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://gradebook.db?mode=rwc";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub import: ImportSettings,
    pub import_interval_secs: Option<u64>,
}

impl AppConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        let bind_addr = parse_var("BIND_ADDR")?
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 3000)));
        let defaults = ImportSettings::default();
        let import = ImportSettings {
            concurrency: parse_var::<usize>("IMPORT_CONCURRENCY")?
                .unwrap_or(defaults.concurrency)
                .max(1),
            lookback_days: parse_var::<i64>("MAIL_LOOKBACK_DAYS")?
                .unwrap_or(defaults.lookback_days)
                .max(0),
            max_results: parse_var::<u32>("MAIL_MAX_RESULTS")?
                .unwrap_or(defaults.max_results)
                .max(1),
        };
        let import_interval_secs = parse_var::<u64>("IMPORT_INTERVAL_SECS")?.filter(|s| *s > 0);

        Ok(Self {
            database_url,
            bind_addr,
            import,
            import_interval_secs,
        })
    }
}

/// Reads an optional variable; blank counts as unset, garbage is an error.
pub(crate) fn parse_var<T: FromStr>(key: &str) -> Result<Option<T>, AppError> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::Config(format!("{} has an invalid value: {}", key, raw))),
        _ => Ok(None),
    }
}

pub(crate) fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

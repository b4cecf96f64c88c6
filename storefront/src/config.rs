// storefront/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub run_migrations: bool,
  pub seed_db: bool,

  /// Spawn notification delivery instead of awaiting it inline.
  pub notify_in_background: bool,

  pub mock_payment_account_id: String,
  pub mock_payment_latency: Duration,

  pub log_format: LogFormat,
}

fn parse_var<T: std::str::FromStr>(name: &str, default: &str) -> Result<T>
where
  T::Err: std::fmt::Display,
{
  let raw = env::var(name).unwrap_or_else(|_| default.to_string());
  raw
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", name, raw, e)))
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let database_url =
      env::var("DATABASE_URL").map_err(|e| AppError::Config(format!("Missing environment variable 'DATABASE_URL': {}", e)))?;

    let log_format = match env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()).as_str() {
      "pretty" => LogFormat::Pretty,
      "json" => LogFormat::Json,
      other => return Err(AppError::Config(format!("Invalid LOG_FORMAT value '{}'", other))),
    };

    let config = Self {
      server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
      server_port: parse_var("SERVER_PORT", "8080")?,
      database_url,
      run_migrations: parse_var("RUN_MIGRATIONS", "true")?,
      seed_db: parse_var("SEED_DB", "false")?,
      notify_in_background: parse_var("NOTIFY_IN_BACKGROUND", "true")?,
      mock_payment_account_id: env::var("MOCK_PAYMENT_ACCOUNT_ID").unwrap_or_else(|_| "mock_main_acct".to_string()),
      mock_payment_latency: Duration::from_millis(parse_var("MOCK_PAYMENT_LATENCY_MS", "50")?),
      log_format,
    };

    tracing::debug!(
      server_host = %config.server_host,
      server_port = config.server_port,
      run_migrations = config.run_migrations,
      notify_in_background = config.notify_in_background,
      "Application configuration loaded."
    );
    Ok(config)
  }

  /// Configuration for in-process use without a database (tests, demos).
  pub fn for_tests() -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 0,
      database_url: String::new(),
      run_migrations: false,
      seed_db: false,
      notify_in_background: false,
      mock_payment_account_id: "mock_test_acct".to_string(),
      mock_payment_latency: Duration::ZERO,
      log_format: LogFormat::Pretty,
    }
  }
}

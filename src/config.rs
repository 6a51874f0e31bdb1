use std::env;
use std::path::PathBuf;
use std::time::Duration;

use derive_more::Display;
use dotenv::dotenv;

pub const DEFAULT_PUSH_GATEWAY_URL: &str = "https://exp.host/--/api/v2/push/send";

#[derive(Debug, Display)]
pub enum ConfigError {
    #[display(fmt = "environment variable '{}' must be set", _0)]
    Missing(&'static str),

    #[display(fmt = "environment variable '{}' has an invalid value", _0)]
    Invalid(&'static str),
}

impl std::error::Error for ConfigError {}

/// Runtime settings, read once at startup from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub upload_dir: PathBuf,
    pub push: PushConfig,
    /// When set, the reminder sweep also runs in-process on this interval.
    pub reminder_sweep_interval: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct PushConfig {
    pub enabled: bool,
    pub gateway_url: String,
    pub timeout: Duration,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            gateway_url: DEFAULT_PUSH_GATEWAY_URL.to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parsed("PORT", 5000)?;
        let db_max_connections = parsed("DB_MAX_CONNECTIONS", 5)?;
        let upload_dir = env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("static/uploads"));

        let push = PushConfig {
            enabled: parsed("PUSH_ENABLED", true)?,
            gateway_url: env::var("PUSH_GATEWAY_URL")
                .unwrap_or_else(|_| DEFAULT_PUSH_GATEWAY_URL.to_string()),
            timeout: Duration::from_secs(parsed("PUSH_TIMEOUT_SECS", 5)?),
        };

        let reminder_sweep_interval = match env::var("REMINDER_SWEEP_INTERVAL_SECS") {
            Ok(raw) => {
                let secs: u64 = raw
                    .parse()
                    .map_err(|_| ConfigError::Invalid("REMINDER_SWEEP_INTERVAL_SECS"))?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            Err(_) => None,
        };

        Ok(Self {
            host,
            port,
            database_url,
            db_max_connections,
            jwt_secret,
            upload_dir,
            push,
            reminder_sweep_interval,
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn parsed<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        Err(_) => Ok(default),
    }
}

use std::{env, fmt::Display, fs::read_to_string, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::error::ConfigError;

pub struct Config {
    pub port: u16,
    pub supabase_url: String,
    pub supabase_key: String,
    pub leaderboard_limit: usize,
    pub upstream_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let supabase_url: String = require("SUPABASE_URL")?;

        Ok(Self {
            port: try_load("RUST_PORT", "5000")?,
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_key: read_secret("SUPABASE_ANON_KEY")?,
            leaderboard_limit: try_load("LEADERBOARD_LIMIT", "10")?,
            upstream_timeout: Duration::from_millis(try_load("UPSTREAM_TIMEOUT_MS", "5000")?),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            supabase_url: String::new(),
            supabase_key: String::new(),
            leaderboard_limit: 10,
            upstream_timeout: Duration::from_secs(5),
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    parse(key, &raw)
}

fn require<T: FromStr>(key: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let raw = var(key).ok_or_else(|| ConfigError::Missing(key.to_string()))?;

    parse(key, &raw)
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    raw.trim().parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");

        ConfigError::Invalid {
            key: key.to_string(),
            reason: e.to_string(),
        }
    })
}

fn read_secret(secret_name: &str) -> Result<String, ConfigError> {
    let path = format!("/run/secrets/{secret_name}");

    match read_to_string(&path) {
        Ok(secret) => Ok(secret.trim().to_string()),
        Err(e) => {
            warn!("Failed to read {secret_name} from file: {e}, trying environment");

            var(secret_name).ok_or_else(|| ConfigError::Missing(secret_name.to_string()))
        }
    }
}

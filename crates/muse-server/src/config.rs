use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "your_jwt_secret",
    "secret",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("MUSE_JWT_SECRET is unset or still a placeholder; set it in your .env file")]
    MissingSecret,
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub cors_origin: String,
    pub token_ttl: chrono::Duration,
    pub sweep_interval: Duration,
    pub pending_ttl: chrono::Duration,
    pub body_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let jwt_secret = lookup("MUSE_JWT_SECRET").unwrap_or_default();
        if jwt_secret.trim().is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            return Err(ConfigError::MissingSecret);
        }

        let host = var("MUSE_HOST", "0.0.0.0");
        let port = var("MUSE_PORT", "5000");
        let addr_text = format!("{}:{}", host, port);
        let addr: SocketAddr = addr_text.parse().map_err(|_| ConfigError::Invalid {
            name: "MUSE_HOST/MUSE_PORT",
            value: addr_text.clone(),
        })?;

        let token_ttl_secs: i64 = positive(&lookup, "MUSE_TOKEN_TTL_SECS", 3600)?;
        let token_ttl = within_calendar(
            "MUSE_TOKEN_TTL_SECS",
            token_ttl_secs,
            chrono::Duration::try_seconds(token_ttl_secs),
        )?;
        let sweep_secs: u64 = positive(&lookup, "MUSE_SWEEP_INTERVAL_SECS", 3600)?;
        let pending_hours: i64 = positive(&lookup, "MUSE_PENDING_TTL_HOURS", 24)?;
        let pending_ttl = within_calendar(
            "MUSE_PENDING_TTL_HOURS",
            pending_hours,
            chrono::Duration::try_hours(pending_hours),
        )?;
        let body_limit: usize = positive(&lookup, "MUSE_BODY_LIMIT_BYTES", 10 * 1024 * 1024)?;

        Ok(Self {
            jwt_secret,
            db_path: var("MUSE_DB_PATH", "muse-mart.db").into(),
            addr,
            cors_origin: var("MUSE_CORS_ORIGIN", "http://localhost:3000"),
            token_ttl,
            sweep_interval: Duration::from_secs(sweep_secs),
            pending_ttl,
            body_limit,
        })
    }
}

fn positive<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(raw) = lookup(name) else {
        return Ok(default);
    };
    match raw.trim().parse::<T>() {
        Ok(v) if v > T::default() => Ok(v),
        _ => Err(ConfigError::Invalid { name, value: raw }),
    }
}

/// A span must be representable and must keep `now ± span` inside the
/// calendar, since token expiry adds it and the sweeper subtracts it.
fn within_calendar(
    name: &'static str,
    raw: i64,
    span: Option<chrono::Duration>,
) -> Result<chrono::Duration, ConfigError> {
    let now = chrono::Utc::now();
    span.filter(|span| {
        now.checked_add_signed(*span).is_some() && now.checked_sub_signed(*span).is_some()
    })
    .ok_or_else(|| ConfigError::Invalid {
        name,
        value: raw.to_string(),
    })
}

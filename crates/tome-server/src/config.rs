use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    /// `None` disables the background retention sweep.
    pub auto_purge_interval: Option<Duration>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = get("TOME_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("TOME_JWT_SECRET is unset or still a placeholder");
        }

        let port = match get("TOME_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("TOME_PORT is not a port number: {raw}"))?,
            None => 3000,
        };

        let auto_purge_interval = match get("TOME_AUTO_PURGE_INTERVAL_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .parse()
                    .with_context(|| format!("TOME_AUTO_PURGE_INTERVAL_SECS is not a number: {raw}"))?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            db_path: get("TOME_DB_PATH").unwrap_or_else(|| "tome.db".into()).into(),
            host: get("TOME_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            jwt_secret,
            auto_purge_interval,
        })
    }
}

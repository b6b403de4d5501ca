use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use anyhow::{anyhow, Context};
use tracing::{info, warn};

const SECRETS_DIR: &str = "/run/secrets";

pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub rate_limit_per_sec: u64,
    pub smtp: Option<SmtpSettings>,
    pub notify: NotifySettings,
}

/// Outbound mail server. Absent when `EMAIL_HOST` is unset.
#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from: String,
}

/// What the notification fan-out needs at request time.
#[derive(Debug, Clone)]
pub struct NotifySettings {
    /// Public base URL used to build article and unsubscribe links.
    pub app_url: String,
    /// Upper bound on in-flight sends during a fan-out.
    pub concurrency: usize,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            app_url: "http://localhost:3000".to_string(),
            concurrency: 8,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::from_source(|key| env::var(key).ok().or_else(|| read_secret(key)))
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_source<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| anyhow!("JWT_SECRET must be set"))?;

        let smtp = match lookup("EMAIL_HOST") {
            Some(host) => Some(SmtpSettings {
                host,
                port: try_load(&lookup, "EMAIL_PORT", "465")?,
                user: lookup("EMAIL_USER").unwrap_or_default(),
                password: lookup("EMAIL_PASS").unwrap_or_default(),
                from: lookup("EMAIL_FROM").context("EMAIL_FROM must be set with EMAIL_HOST")?,
            }),
            None => {
                warn!("EMAIL_HOST not set, outgoing mail will only be logged");
                None
            }
        };

        let concurrency: usize = try_load(&lookup, "NOTIFY_CONCURRENCY", "8")?;

        Ok(Self {
            port: try_load(&lookup, "PORT", "3000")?,
            database_url: try_load(&lookup, "DATABASE_URL", "sqlite://blog.db?mode=rwc")?,
            jwt_secret,
            rate_limit_per_sec: try_load(&lookup, "RATE_LIMIT_PER_SEC", "50")?,
            smtp,
            notify: NotifySettings {
                app_url: try_load::<String, _>(&lookup, "APP_URL", "http://localhost:3000")?
                    .trim_end_matches('/')
                    .to_string(),
                concurrency: concurrency.max(1),
            },
        })
    }
}

fn try_load<T, F>(lookup: &F, key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| anyhow!("Invalid {key} value: {e}"))
}

fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("{SECRETS_DIR}/{secret_name}");

    read_to_string(&path).map(|s| s.trim().to_string()).ok()
}

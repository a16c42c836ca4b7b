use anyhow::{bail, Context};
use serde::Deserialize;

/// Upper bound for either token lifetime (five years).
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 366 * 5;
/// Upper bound for verification clock skew.
pub const MAX_LEEWAY_SECONDS: i64 = 60 * 60;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
    pub leeway_seconds: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub media_root: String,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source. Signing secrets have no
    /// default: a missing or blank secret aborts startup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = |key: &str| -> anyhow::Result<String> {
            match lookup(key) {
                Some(v) if !v.trim().is_empty() => Ok(v),
                _ => bail!("{key} must be set to a non-empty value"),
            }
        };
        let number = |key: &str, default: i64| -> anyhow::Result<i64> {
            match lookup(key) {
                Some(v) => v
                    .trim()
                    .parse::<i64>()
                    .with_context(|| format!("{key} must be an integer, got {v:?}")),
                None => Ok(default),
            }
        };

        let jwt = JwtConfig {
            access_secret: secret("JWT_SECRET_KEY")?,
            refresh_secret: secret("JWT_REFRESH_SECRET_KEY")?,
            access_ttl_minutes: number("JWT_ACCESS_TTL_MINUTES", 30)?,
            refresh_ttl_minutes: number("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 7)?,
            leeway_seconds: number("JWT_LEEWAY_SECONDS", 0)?,
        };
        if jwt.access_secret == jwt.refresh_secret {
            bail!("JWT_SECRET_KEY and JWT_REFRESH_SECRET_KEY must differ");
        }
        for (key, minutes) in [
            ("JWT_ACCESS_TTL_MINUTES", jwt.access_ttl_minutes),
            ("JWT_REFRESH_TTL_MINUTES", jwt.refresh_ttl_minutes),
        ] {
            if !(1..=MAX_TTL_MINUTES).contains(&minutes) {
                bail!("{key} must be between 1 and {MAX_TTL_MINUTES}, got {minutes}");
            }
        }
        if !(0..=MAX_LEEWAY_SECONDS).contains(&jwt.leeway_seconds) {
            bail!(
                "JWT_LEEWAY_SECONDS must be between 0 and {MAX_LEEWAY_SECONDS}, got {}",
                jwt.leeway_seconds
            );
        }

        let port = match lookup("APP_PORT") {
            Some(v) => v
                .trim()
                .parse::<u16>()
                .with_context(|| format!("APP_PORT must be a port number, got {v:?}"))?,
            None => 8080,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://itish.db?mode=rwc".into()),
            jwt,
            media_root: lookup("MEDIA_ROOT").unwrap_or_else(|| "media".into()),
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
        })
    }
}

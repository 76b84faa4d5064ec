use std::path::PathBuf;

use anyhow::Context;
use chrono::FixedOffset;

use crate::notification::directory::{self, DepartmentDirectory};
use crate::store::StoreBackend;

const PLACEHOLDER_SECRET: &str = "CHANGE_ME_SESSION_SECRET";
const REDACTED: &str = "[redacted]";

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    /// Public base URL used in emailed approve/disapprove links.
    pub app_url: String,
    pub store: StoreBackend,
    pub session_secret: String,
    pub admin_username: Option<String>,
    /// Argon2 PHC string. Admin login is disabled when unset.
    pub admin_password_hash: Option<String>,
    /// Mark the session cookie `Secure` (set in production).
    pub secure_cookies: bool,
    pub mail_from: String,
    pub mail_relay_url: Option<String>,
    pub mail_relay_api_key: Option<String>,
    pub it_email: String,
    pub directory: DepartmentDirectory,
    /// Offset used to stamp `submitted_at`. Default: UTC+7.
    pub utc_offset: FixedOffset,
}

/// Secrets and the database URL never appear in `{:?}` output.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hidden = |v: &Option<String>| v.as_ref().map(|_| REDACTED);
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("app_url", &self.app_url)
            .field("store", &self.store.describe())
            .field("session_secret", &REDACTED)
            .field("admin_username", &self.admin_username)
            .field("admin_password_hash", &hidden(&self.admin_password_hash))
            .field("secure_cookies", &self.secure_cookies)
            .field("mail_from", &self.mail_from)
            .field("mail_relay_url", &self.mail_relay_url)
            .field("mail_relay_api_key", &hidden(&self.mail_relay_api_key))
            .field("it_email", &self.it_email)
            .field("directory", &self.directory)
            .field("utc_offset", &self.utc_offset)
            .finish()
    }
}

impl Config {
    pub fn admin_enabled(&self) -> bool {
        self.admin_username.is_some() && self.admin_password_hash.is_some()
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    from_lookup(|key| std::env::var(key).ok())
}

/// Build the configuration from any variable source. Invalid values are
/// startup errors, not silent defaults.
pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let production = var("APP_ENV")
        .or_else(|| var("NODE_ENV"))
        .map(|v| v == "production")
        .unwrap_or(false);

    let port: u16 = match var("PORT") {
        Some(raw) => raw.parse().context("PORT must be a valid port number")?,
        None => 3000,
    };

    // the hosting platform's URL wins over a hand-set one
    let app_url = var("RENDER_EXTERNAL_URL")
        .or_else(|| var("APP_URL"))
        .unwrap_or_else(|| format!("http://localhost:{}", port));
    let parsed = url::Url::parse(&app_url).with_context(|| format!("invalid APP_URL: {}", app_url))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("APP_URL must be http or https: {}", app_url);
    }
    let app_url = app_url.trim_end_matches('/').to_string();

    let database_url = var("DATABASE_URL");
    let store = match var("REQUEST_STORE").as_deref() {
        Some("postgres") => StoreBackend::Postgres {
            database_url: database_url
                .context("REQUEST_STORE=postgres requires DATABASE_URL")?,
        },
        Some("file") => StoreBackend::File {
            path: PathBuf::from(var("DB_PATH").unwrap_or_else(|| "db.json".into())),
        },
        Some("memory") => StoreBackend::Memory,
        Some(other) => anyhow::bail!(
            "REQUEST_STORE must be one of postgres, file, memory (got {})",
            other
        ),
        None => match database_url {
            Some(database_url) => StoreBackend::Postgres { database_url },
            None => StoreBackend::File {
                path: PathBuf::from(var("DB_PATH").unwrap_or_else(|| "db.json".into())),
            },
        },
    };

    let session_secret = var("SESSION_SECRET").unwrap_or_else(|| PLACEHOLDER_SECRET.into());
    if session_secret == PLACEHOLDER_SECRET {
        if production {
            anyhow::bail!(
                "SESSION_SECRET is not set. \
                 Set a long random value before running in production."
            );
        }
        tracing::warn!("SESSION_SECRET is not set, using insecure placeholder");
    }

    let mail_from = var("MAIL_FROM")
        .unwrap_or_else(|| "\"IT Request System\" <no-reply@example.com>".into());

    let it_email = var("IT_EMAIL").unwrap_or_else(|| "it.department@example.com".into());
    if !directory::is_valid_address(&it_email) {
        anyhow::bail!("IT_EMAIL is not a valid email address: {}", it_email);
    }

    let default_manager =
        var("MANAGER_EMAIL_DEFAULT").unwrap_or_else(|| directory::FALLBACK_MANAGER.into());
    let directory = DepartmentDirectory::from_lookup(&default_manager, |k| var(k))
        .context("invalid department manager configuration")?;

    let offset_hours: i32 = match var("SUBMISSION_UTC_OFFSET_HOURS") {
        Some(raw) => raw
            .parse()
            .context("SUBMISSION_UTC_OFFSET_HOURS must be a whole number of hours")?,
        None => 7,
    };
    let utc_offset = FixedOffset::east_opt(offset_hours * 3600)
        .context("SUBMISSION_UTC_OFFSET_HOURS out of range")?;

    Ok(Config {
        port,
        app_url,
        store,
        session_secret,
        admin_username: var("ADMIN_USERNAME"),
        admin_password_hash: var("ADMIN_PASSWORD_HASH"),
        secure_cookies: production,
        mail_from,
        mail_relay_url: var("MAIL_RELAY_URL"),
        mail_relay_api_key: var("MAIL_RELAY_API_KEY"),
        it_email,
        directory,
        utc_offset,
    })
}

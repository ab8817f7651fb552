//! Configuration loaded from environment variables.

use std::env;

use anyhow::{Context, Result, bail};
use chrono::format::{Item, StrftimeItems};

use crate::form::MIN_SECRET_LEN;
use crate::multifilter::{DEFAULT_DATE_FORMAT, DEFAULT_EXCERPT_MORE, ImageSizes};

/// Application configuration.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Public site URL; the search form submits here.
    pub site_url: String,

    /// Key for listing nonces.
    pub nonce_secret: String,

    /// Nonce lifetime in seconds (default: one day).
    pub nonce_lifetime_secs: i64,

    /// strftime-style format for date metas.
    pub date_format: String,

    /// Named image sizes for placeholders.
    pub image_sizes: ImageSizes,

    /// Marker appended to truncated excerpts when a view sets none.
    pub excerpt_more: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("database_url", &"[redacted]")
            .field("database_max_connections", &self.database_max_connections)
            .field("site_url", &self.site_url)
            .field("nonce_secret", &"[redacted]")
            .field("nonce_lifetime_secs", &self.nonce_lifetime_secs)
            .field("date_format", &self.date_format)
            .field("image_sizes", &self.image_sizes)
            .field("excerpt_more", &self.excerpt_more)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let site_url = env::var("SITE_URL").unwrap_or_else(|_| format!("http://localhost:{port}"));

        let nonce_secret =
            env::var("NONCE_SECRET").context("NONCE_SECRET environment variable is required")?;
        if nonce_secret.len() < MIN_SECRET_LEN {
            bail!("NONCE_SECRET must be at least {MIN_SECRET_LEN} bytes");
        }

        let nonce_lifetime_secs = env::var("NONCE_LIFETIME_SECS")
            .unwrap_or_else(|_| "86400".to_string())
            .parse()
            .context("NONCE_LIFETIME_SECS must be a valid i64")?;

        let date_format =
            env::var("DATE_FORMAT").unwrap_or_else(|_| DEFAULT_DATE_FORMAT.to_string());
        validate_date_format(&date_format)?;

        let image_sizes = match env::var("IMAGE_SIZES") {
            Ok(value) => ImageSizes::parse(&value).context("IMAGE_SIZES is invalid")?,
            Err(_) => ImageSizes::default(),
        };

        let excerpt_more =
            env::var("EXCERPT_MORE").unwrap_or_else(|_| DEFAULT_EXCERPT_MORE.to_string());

        Ok(Self {
            port,
            database_url,
            database_max_connections,
            site_url,
            nonce_secret,
            nonce_lifetime_secs,
            date_format,
            image_sizes,
            excerpt_more,
        })
    }

    /// Search form target: the site root.
    pub fn search_action(&self) -> String {
        format!("{}/", self.site_url.trim_end_matches('/'))
    }
}

/// Reject formats chrono cannot render.
fn validate_date_format(format: &str) -> Result<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        bail!("DATE_FORMAT {format:?} is not a valid strftime format");
    }
    Ok(())
}

//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::content::{ContentRepository, PgContentRepository};
use crate::db;
use crate::form::NonceService;
use crate::multifilter::{MultifilterService, Renderer};

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Listing pipeline.
    multifilter: Arc<MultifilterService>,
}

impl AppState {
    /// Connect to PostgreSQL, apply migrations, and build the services.
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = db::create_pool(config)
            .await
            .context("failed to create database pool")?;

        db::run_migrations(&pool)
            .await
            .context("failed to run migrations")?;
        info!("Database migrations applied");

        let repository: Arc<dyn ContentRepository> = Arc::new(PgContentRepository::new(pool));
        Self::with_repository(repository, config)
    }

    /// Build the services over an existing repository.
    pub fn with_repository(repository: Arc<dyn ContentRepository>, config: &Config) -> Result<Self> {
        let nonces = NonceService::new(config.nonce_secret.as_bytes(), config.nonce_lifetime_secs)
            .context("failed to create nonce service")?;

        let renderer = Renderer::new(config.image_sizes.clone(), config.date_format.clone())
            .with_excerpt_more(config.excerpt_more.clone());

        let multifilter =
            MultifilterService::new(repository, renderer, nonces, config.search_action());

        Ok(Self::from_service(multifilter))
    }

    /// Wrap a fully built service.
    pub fn from_service(multifilter: Arc<MultifilterService>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { multifilter }),
        }
    }

    /// Get the listing service.
    pub fn multifilter(&self) -> &Arc<MultifilterService> {
        &self.inner.multifilter
    }

    /// Check if the content store is reachable.
    pub async fn content_store_healthy(&self) -> bool {
        self.inner.multifilter.healthy().await
    }
}

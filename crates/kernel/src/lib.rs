//! Multifilter Kernel Library
//!
//! Filterable, paginated content listings with AJAX paging. The library
//! exposes the pipeline and HTTP surface for embedding and integration
//! testing; the `multifilter` binary serves it over PostgreSQL.

pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod form;
pub mod multifilter;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::multifilter::router())
        .merge(routes::health::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! Content repository module.
//!
//! This module provides:
//! - ContentItem, Term, Thumbnail: the records listings are built from
//! - ContentRepository: the async store interface the pipeline queries
//! - PgContentRepository: PostgreSQL store with SeaQuery-generated SQL
//! - InMemoryRepository: process-local store for tests and demos
//! - TermCache: TTL-bounded term lists for the PostgreSQL store

mod memory;
mod model;
mod postgres;
mod query_builder;
mod repository;
mod term_cache;

pub use memory::InMemoryRepository;
pub use model::{ContentItem, ContentPage, ItemId, ItemStatus, Term, Thumbnail};
pub use postgres::PgContentRepository;
pub use query_builder::{ContentQueryBuilder, TermHierarchyQuery};
pub use repository::ContentRepository;

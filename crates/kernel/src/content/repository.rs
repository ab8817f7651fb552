//! Content repository trait.

use anyhow::Result;
use async_trait::async_trait;

use super::model::{ContentPage, ItemId, Term, Thumbnail};
use crate::multifilter::Query;

/// Queryable store of typed, taxonomized, timestamped content.
///
/// Implementations must apply every predicate of the [`Query`] (type,
/// status, taxonomy clause, search, include/exclude) and honor its sort
/// order and paging window.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Run a query and return the requested window plus the total match count.
    async fn query_content(&self, query: &Query) -> Result<ContentPage>;

    /// Run a query and return only matching identifiers, in query order.
    async fn query_identifiers_only(&self, query: &Query) -> Result<Vec<ItemId>>;

    /// Pinned item identifiers in their stored order.
    async fn pinned_identifiers(&self) -> Result<Vec<ItemId>>;

    /// Terms of a taxonomy ordered by display name.
    async fn taxonomy_terms(&self, taxonomy: &str) -> Result<Vec<Term>>;

    /// Stored image for an item at the given size, if any.
    async fn item_thumbnail(&self, item_id: ItemId, size_key: &str) -> Result<Option<Thumbnail>>;

    /// Whether the backing store is reachable.
    async fn healthy(&self) -> bool;
}

//! Query executor.
//!
//! Runs a compiled [`Query`] against a [`ContentRepository`]. When sticky
//! promotion is on, pinned items are merged ahead of the normal order and
//! the page window is applied to the merged sequence.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;

use super::compiler::{Query, SortOrder};
use super::types::ResultPage;
use crate::content::{ContentRepository, ItemId};

/// Executes compiled queries.
#[derive(Clone)]
pub struct QueryExecutor {
    repository: Arc<dyn ContentRepository>,
}

impl QueryExecutor {
    pub fn new(repository: Arc<dyn ContentRepository>) -> Self {
        Self { repository }
    }

    /// Run a query and return one page in display order.
    pub async fn execute(&self, query: &Query) -> Result<ResultPage> {
        let page = query.window.map_or(1, |w| w.page.max(1));

        let final_query = if query.promote_sticky {
            match self.sticky_query(query).await? {
                Some(q) => q,
                None => return Ok(ResultPage::empty(page)),
            }
        } else {
            query.clone()
        };

        let content = self.repository.query_content(&final_query).await?;
        tracing::debug!(
            total = content.total,
            total_pages = content.total_pages,
            page = page,
            returned = content.items.len(),
            "multifilter query executed"
        );

        Ok(ResultPage {
            items: content.items,
            total: content.total,
            total_pages: content.total_pages,
            page,
        })
    }

    /// Restrict `query` to pinned items followed by every other match.
    ///
    /// Returns `None` when the merged sequence is empty.
    async fn sticky_query(&self, query: &Query) -> Result<Option<Query>> {
        let pinned = self.repository.pinned_identifiers().await?;

        let mut normal_query = query.unpaged();
        normal_query.exclude.extend(pinned.iter().copied());
        let normal = self
            .repository
            .query_identifiers_only(&normal_query)
            .await?;

        let merged = merge_unique(&pinned, &normal);
        tracing::debug!(
            pinned = pinned.len(),
            normal = normal.len(),
            merged = merged.len(),
            "merged pinned items"
        );

        if merged.is_empty() {
            return Ok(None);
        }

        Ok(Some(Query {
            include: Some(merged),
            sort: SortOrder::AsListed,
            promote_sticky: false,
            ..query.clone()
        }))
    }
}

/// `first ++ second` without duplicates; the first occurrence wins.
fn merge_unique(first: &[ItemId], second: &[ItemId]) -> Vec<ItemId> {
    let mut seen = HashSet::with_capacity(first.len() + second.len());
    first
        .iter()
        .chain(second)
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}

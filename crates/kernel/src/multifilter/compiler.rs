//! Filter compiler.
//!
//! Translates a [`QuerySpec`] into a repository-agnostic [`Query`]. The
//! compiler is pure: identical specs always compile to identical queries.

use serde::{Deserialize, Serialize};

use super::types::{QuerySpec, TermSet};
use crate::content::{ItemId, ItemStatus};

/// Content type whose listings promote pinned items.
pub const STICKY_CONTENT_TYPE: &str = "post";

/// Compiled content query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Query {
    /// Content type filter.
    pub content_type: String,

    /// Status filter (always published for listings).
    pub status: ItemStatus,

    /// Taxonomy predicates.
    pub taxonomy: TaxonomyClause,

    /// Search predicate.
    pub search: Option<String>,

    /// Result ordering.
    pub sort: SortOrder,

    /// Paging window; `None` returns every match.
    pub window: Option<PageWindow>,

    /// Promote pinned items ahead of the normal order.
    pub promote_sticky: bool,

    /// Restrict results to these items. With [`SortOrder::AsListed`] the
    /// sequence also defines the order.
    pub include: Option<Vec<ItemId>>,

    /// Items to leave out.
    pub exclude: Vec<ItemId>,
}

impl Query {
    /// Same predicates without a paging window or sticky promotion.
    pub fn unpaged(&self) -> Self {
        Self {
            window: None,
            promote_sticky: false,
            ..self.clone()
        }
    }

    /// Window size, or `None` when unpaged.
    pub fn per_page(&self) -> Option<u32> {
        self.window.map(|w| w.per_page)
    }
}

/// Taxonomy predicates and the relation combining them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TaxonomyClause {
    pub relation: Relation,
    pub predicates: Vec<TermPredicate>,
}

impl TaxonomyClause {
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

/// Logical relation between taxonomy predicates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Relation {
    #[default]
    And,
    Or,
}

/// Matches items carrying any of `slugs` in `taxonomy`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TermPredicate {
    pub taxonomy: String,
    pub slugs: Vec<String>,
    /// Also match descendants of the listed terms.
    pub include_descendants: bool,
}

/// Result ordering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Newest first (created descending, id descending as tiebreaker).
    #[default]
    Newest,
    /// Random order.
    Random,
    /// Order of [`Query::include`].
    AsListed,
}

/// Paging window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageWindow {
    /// Page number (1-indexed).
    pub page: u32,
    pub per_page: u32,
}

impl PageWindow {
    /// Number of items skipped before this window.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }
}

/// Compile a spec into a query.
pub fn compile(spec: &QuerySpec) -> Query {
    let relation = if spec.in_all_taxonomies {
        Relation::And
    } else {
        Relation::Or
    };

    let predicates = spec
        .selectors
        .iter()
        .filter_map(|selector| match &selector.terms {
            TermSet::All => None,
            TermSet::Only(slugs) if slugs.is_empty() => None,
            TermSet::Only(slugs) => Some(TermPredicate {
                taxonomy: selector.taxonomy.clone(),
                slugs: slugs.clone(),
                include_descendants: true,
            }),
        })
        .collect();

    let search = if spec.randomize || spec.search.trim().is_empty() {
        None
    } else {
        Some(spec.search.trim().to_string())
    };

    let (sort, page) = if spec.randomize {
        (SortOrder::Random, 1)
    } else {
        (SortOrder::Newest, spec.page.max(1))
    };

    Query {
        content_type: spec.post_type.clone(),
        status: ItemStatus::Publish,
        taxonomy: TaxonomyClause {
            relation,
            predicates,
        },
        search,
        sort,
        window: Some(PageWindow {
            page,
            per_page: spec.page_size,
        }),
        promote_sticky: !spec.randomize && spec.post_type == STICKY_CONTENT_TYPE,
        include: None,
        exclude: Vec::new(),
    }
}

//! Content records consumed by the multifilter pipeline.
//!
//! Items are typed, taxonomized, timestamped documents. The pipeline only
//! reads them; creating and editing content belongs to the repository.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Content item identifier.
pub type ItemId = Uuid;

/// Publication status of an item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Publish,
    Draft,
    Pending,
    Private,
}

impl ItemStatus {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Publish => "publish",
            ItemStatus::Draft => "draft",
            ItemStatus::Pending => "pending",
            ItemStatus::Private => "private",
        }
    }

    /// Parse the storage representation. Unknown values map to `Draft`
    /// so they never leak into public listings.
    pub fn parse(value: &str) -> Self {
        match value {
            "publish" => ItemStatus::Publish,
            "pending" => ItemStatus::Pending,
            "private" => ItemStatus::Private,
            _ => ItemStatus::Draft,
        }
    }
}

/// A content item (article, page, or any custom type).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentItem {
    /// Unique identifier.
    pub id: ItemId,

    /// Content type machine name ("post", "page", ...).
    #[serde(rename = "type")]
    pub item_type: String,

    /// Item title (plain text).
    pub title: String,

    /// Absolute or site-relative URL of the item.
    pub permalink: String,

    /// Publication status.
    pub status: ItemStatus,

    /// Author display name.
    pub author: String,

    /// Unix timestamp when created.
    pub created: i64,

    /// Unix timestamp when last changed.
    pub changed: i64,

    /// Number of approved comments.
    pub comment_count: u32,

    /// Body HTML.
    pub body: String,

    /// Hand-written excerpt, used verbatim when present.
    pub excerpt: Option<String>,

    /// Access password. Protected items hide their image and body.
    pub password: Option<String>,

    /// Assigned term slugs keyed by taxonomy name.
    #[serde(default)]
    pub terms: BTreeMap<String, Vec<String>>,
}

impl ContentItem {
    /// Whether the item is gated behind a password.
    pub fn password_required(&self) -> bool {
        self.password.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// Term slugs assigned in one taxonomy.
    pub fn terms_in(&self, taxonomy: &str) -> &[String] {
        self.terms.get(taxonomy).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A term within a taxonomy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Term {
    /// Owning taxonomy.
    pub taxonomy: String,

    /// URL-safe slug, unique within the taxonomy.
    pub slug: String,

    /// Display name.
    pub name: String,

    /// Parent term slug for hierarchical taxonomies.
    pub parent: Option<String>,

    /// Number of published items carrying this term.
    #[serde(default)]
    pub count: u64,
}

/// Stored image rendition for an item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Thumbnail {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// One window of query results as returned by a repository.
#[derive(Debug, Clone, Default)]
pub struct ContentPage {
    /// Items in the requested window, in query order.
    pub items: Vec<ContentItem>,

    /// Total matches before windowing.
    pub total: u64,

    /// Total number of pages for the window size.
    pub total_pages: u32,
}

impl ContentPage {
    /// Build a page, deriving the page count from the window size.
    pub fn new(items: Vec<ContentItem>, total: u64, per_page: u32) -> Self {
        let total_pages = if per_page > 0 {
            total.div_ceil(u64::from(per_page)) as u32
        } else {
            1
        };
        Self {
            items,
            total,
            total_pages,
        }
    }
}

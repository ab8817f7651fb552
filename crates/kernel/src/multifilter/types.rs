//! Multifilter types.
//!
//! Provides type definitions for one filtered listing:
//! - QuerySpec: the normalized, immutable configuration of a view
//! - TermSelector: one taxonomy restricted to all or some of its terms
//! - PaginationMode, ImageLayout, ExcerptPolicy: closed display choices
//! - ResultPage: executor output consumed by the renderer

use serde::{Deserialize, Serialize};

use crate::content::{ContentItem, ItemId};

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: u32 = 4;

/// Upper bound on items per page, applied to configuration and client state alike.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default number of items per row.
pub const DEFAULT_PER_ROW: u32 = 2;

/// Widest supported grid (twelve columns).
pub const MAX_PER_ROW: u32 = 12;

/// Normalized configuration for one filtered view.
///
/// Built once per request by the normalizer (or deserialized from echoed
/// client state) and never mutated afterwards; [`QuerySpec::with_page`]
/// derives a copy for another page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuerySpec {
    /// Content type to list.
    pub post_type: String,

    /// Items per page.
    pub page_size: u32,

    /// Items per grid row.
    pub per_row: u32,

    /// Render the title above the content.
    pub display_title: bool,

    /// Render the taxonomy filter UI.
    pub display_filter: bool,

    /// Thumbnail placement.
    pub layout: ImageLayout,

    /// Remove gutters between grid cells.
    pub no_gap: bool,

    /// Body rendering policy.
    pub excerpt: ExcerptPolicy,

    /// Marker appended to truncated excerpts ("" = default, "none" = omit).
    pub excerpt_more: String,

    /// Pagination control.
    pub pagination: PaginationMode,

    /// Allow selecting more than one term chip at once.
    pub multi_selectable: bool,

    /// Image size key for single-column layouts.
    pub thumbnail_size_single: String,

    /// Image size key for multi-column layouts.
    pub thumbnail_size_multi: String,

    /// Taxonomy selectors, in configuration order.
    pub selectors: Vec<TermSelector>,

    /// Combine taxonomy predicates with AND (true) or OR (false).
    pub in_all_taxonomies: bool,

    /// Client hint: push the page number into the browser URL.
    pub update_paged: bool,

    /// Client hint: show the page number between loads.
    pub display_page_number: bool,

    /// Current page (1-indexed).
    pub page: u32,

    /// Hover effect name ("none" disables it).
    pub effect: String,

    /// Search string; empty means no search.
    pub search: String,

    /// Client hint: remember filter state in the browser session.
    pub store_session: bool,

    /// Client hint: restore filter state from the URL.
    pub load_from_url: bool,

    /// Random order, no paging, no search, no sticky promotion.
    pub randomize: bool,

    /// Meta fields to render, in configuration order.
    pub metas: Vec<MetaField>,

    /// Taxonomies listed by the `taxonomy` meta.
    pub meta_taxonomies: Vec<String>,

    /// Container element id.
    pub container_id: Option<String>,

    /// Extra container classes.
    pub container_classes: Vec<String>,

    /// Item box style.
    pub style: ItemStyle,

    /// Base URL that pagination links extend.
    pub permalink: String,

    /// Query arguments carried on every pagination link.
    #[serde(default)]
    pub link_args: Vec<(String, String)>,

    /// Anti-forgery token required on follow-up requests.
    pub token: String,
}

impl QuerySpec {
    /// Copy of this spec pointing at another page.
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: page.max(1),
            ..self.clone()
        }
    }

    /// Whether any selector restricts its taxonomy to explicit terms.
    pub fn has_explicit_terms(&self) -> bool {
        self.selectors.iter().any(TermSelector::is_explicit)
    }

    /// Whether the filter UI should be rendered.
    pub fn shows_filter_ui(&self) -> bool {
        self.display_filter && !self.randomize
    }

    /// Image size key for the configured column count.
    pub fn thumbnail_size(&self) -> &str {
        if self.per_row > 1 {
            &self.thumbnail_size_multi
        } else {
            &self.thumbnail_size_single
        }
    }

    /// Re-establish every invariant.
    ///
    /// Applied at the end of normalization and to every spec received back
    /// from a client, so both paths compile identically. Idempotent.
    pub fn enforce_invariants(mut self) -> Self {
        if self.page_size == 0 {
            self.page_size = DEFAULT_PAGE_SIZE;
        }
        if self.page_size > MAX_PAGE_SIZE {
            tracing::warn!(
                requested = self.page_size,
                capped = MAX_PAGE_SIZE,
                "page size exceeds maximum, capping"
            );
            self.page_size = MAX_PAGE_SIZE;
        }
        if self.per_row == 0 {
            self.per_row = DEFAULT_PER_ROW;
        }
        self.per_row = self.per_row.min(MAX_PER_ROW);
        self.page = self.page.max(1);

        if self.randomize {
            self.pagination = PaginationMode::None;
        }
        if !self.search.is_empty() || self.has_explicit_terms() {
            self.display_filter = false;
        }
        if self.meta_taxonomies.is_empty() {
            self.metas.retain(|m| *m != MetaField::Taxonomy);
        }

        self.container_id = self
            .container_id
            .filter(|id| super::normalizer::is_css_identifier(id));
        self.container_classes
            .retain(|class| super::normalizer::is_css_identifier(class));

        self
    }
}

/// One taxonomy and the terms it is restricted to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TermSelector {
    /// Taxonomy name.
    pub taxonomy: String,

    /// Terms to match.
    pub terms: TermSet,
}

impl TermSelector {
    /// Selector matching any term of the taxonomy.
    pub fn all(taxonomy: impl Into<String>) -> Self {
        Self {
            taxonomy: taxonomy.into(),
            terms: TermSet::All,
        }
    }

    /// Selector restricted to the given term slugs.
    pub fn only<I, S>(taxonomy: impl Into<String>, slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            taxonomy: taxonomy.into(),
            terms: TermSet::Only(slugs.into_iter().map(Into::into).collect()),
        }
    }

    /// Whether this selector names explicit terms.
    pub fn is_explicit(&self) -> bool {
        matches!(self.terms, TermSet::Only(_))
    }
}

/// Terms selected within one taxonomy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TermSet {
    /// Any term; contributes no predicate.
    All,
    /// Only these slugs (and their descendants), in configuration order.
    Only(Vec<String>),
}

/// Pagination control rendered below the items.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PaginationMode {
    /// Numbered, windowed page links.
    #[default]
    Classic,
    /// A single "read more" link to the next page.
    ReadMore,
    /// A hidden marker carrying the next page URL.
    Infinite,
    /// No pagination control.
    None,
}

impl PaginationMode {
    /// Parse a configuration value. Accepts both legacy and kebab-case names.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pagination" | "classic" => Some(PaginationMode::Classic),
            "readmore" | "read-more" => Some(PaginationMode::ReadMore),
            "infinite" => Some(PaginationMode::Infinite),
            "none" => Some(PaginationMode::None),
            _ => None,
        }
    }
}

/// Configured thumbnail placement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageLayout {
    #[default]
    Top,
    Left,
    Right,
    /// Alternate left and right, starting on the left.
    Zigzag,
    /// No thumbnail.
    None,
}

impl ImageLayout {
    /// Parse a configuration value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "top" => Some(ImageLayout::Top),
            "left" => Some(ImageLayout::Left),
            "right" => Some(ImageLayout::Right),
            "zigzag" => Some(ImageLayout::Zigzag),
            "none" => Some(ImageLayout::None),
            _ => None,
        }
    }

    /// Resolve the thumbnail position for the item at `index` on the page.
    pub fn position(&self, index: usize) -> Option<ImagePosition> {
        match self {
            ImageLayout::Top => Some(ImagePosition::Top),
            ImageLayout::Left => Some(ImagePosition::Left),
            ImageLayout::Right => Some(ImagePosition::Right),
            ImageLayout::Zigzag if index % 2 == 0 => Some(ImagePosition::Left),
            ImageLayout::Zigzag => Some(ImagePosition::Right),
            ImageLayout::None => None,
        }
    }
}

/// Resolved thumbnail position for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImagePosition {
    Top,
    Left,
    Right,
}

impl ImagePosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImagePosition::Top => "top",
            ImagePosition::Left => "left",
            ImagePosition::Right => "right",
        }
    }

    /// Beside the content rather than above it.
    pub fn is_aside(&self) -> bool {
        matches!(self, ImagePosition::Left | ImagePosition::Right)
    }
}

/// How much of an item's body is shown.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExcerptPolicy {
    /// No body.
    #[default]
    None,
    /// Excerpt truncated to this many words.
    FixedLength(u32),
    /// Full body.
    Full,
}

impl ExcerptPolicy {
    /// Parse a configuration value: "full", a positive word count, or anything
    /// else for no body.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("full") {
            return ExcerptPolicy::Full;
        }
        match value.parse::<u32>() {
            Ok(n) if n > 0 => ExcerptPolicy::FixedLength(n),
            _ => ExcerptPolicy::None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ExcerptPolicy::None)
    }
}

/// Meta fragments rendered for each item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum MetaField {
    Date,
    Author,
    CommentCount,
    Taxonomy,
    LastModified,
}

impl MetaField {
    /// Parse a configuration value; unknown names yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "date" => Some(MetaField::Date),
            "author" => Some(MetaField::Author),
            "commentcount" | "comment-count" => Some(MetaField::CommentCount),
            "taxonomy" => Some(MetaField::Taxonomy),
            "last-modified" | "lastmodified" => Some(MetaField::LastModified),
            _ => None,
        }
    }

    /// Class suffix of the rendered fragment.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetaField::Date => "date",
            MetaField::Author => "author",
            MetaField::CommentCount => "commentcount",
            MetaField::Taxonomy => "taxonomies",
            MetaField::LastModified => "last-modified",
        }
    }
}

/// Item box style.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ItemStyle {
    #[default]
    Default,
    EqualHeight,
    Masonry,
}

impl ItemStyle {
    /// Parse a configuration value; unknown or empty values mean `Default`.
    pub fn parse(value: &str) -> Self {
        match value {
            "equal-height" => ItemStyle::EqualHeight,
            "masonry" => ItemStyle::Masonry,
            _ => ItemStyle::Default,
        }
    }
}

/// Executor output: one page of items in final display order.
#[derive(Debug, Clone, Default)]
pub struct ResultPage {
    /// Items on this page (pinned first, no duplicates).
    pub items: Vec<ContentItem>,

    /// Total matches across all pages.
    pub total: u64,

    /// Total number of pages.
    pub total_pages: u32,

    /// Current page (1-indexed).
    pub page: u32,
}

impl ResultPage {
    /// Create an empty page.
    pub fn empty(page: u32) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            total_pages: 0,
            page,
        }
    }

    /// Identifiers of the items on this page, in display order.
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn zigzag_alternates_starting_left() {
        let layout = ImageLayout::Zigzag;
        assert_eq!(layout.position(0), Some(ImagePosition::Left));
        assert_eq!(layout.position(1), Some(ImagePosition::Right));
        assert_eq!(layout.position(2), Some(ImagePosition::Left));
        assert_eq!(ImageLayout::None.position(0), None);
        assert_eq!(ImageLayout::Right.position(0), Some(ImagePosition::Right));
    }

    #[test]
    fn pagination_mode_accepts_legacy_names() {
        assert_eq!(
            PaginationMode::parse("pagination"),
            Some(PaginationMode::Classic)
        );
        assert_eq!(
            PaginationMode::parse("readmore"),
            Some(PaginationMode::ReadMore)
        );
        assert_eq!(PaginationMode::parse("bogus"), None);
    }

    #[test]
    fn pagination_mode_serializes_kebab_case() {
        let json = serde_json::to_string(&PaginationMode::ReadMore).unwrap();
        assert_eq!(json, "\"read-more\"");
    }

    #[test]
    fn excerpt_policy_parsing() {
        assert_eq!(ExcerptPolicy::parse("full"), ExcerptPolicy::Full);
        assert_eq!(ExcerptPolicy::parse("20"), ExcerptPolicy::FixedLength(20));
        assert_eq!(ExcerptPolicy::parse("0"), ExcerptPolicy::None);
        assert_eq!(ExcerptPolicy::parse("lots"), ExcerptPolicy::None);
    }

    #[test]
    fn meta_field_parsing() {
        assert_eq!(MetaField::parse("commentcount"), Some(MetaField::CommentCount));
        assert_eq!(MetaField::parse("comment-count"), Some(MetaField::CommentCount));
        assert_eq!(MetaField::parse("weather"), None);
    }

    #[test]
    fn result_page_ids_follow_display_order() {
        let item = |id: u128| ContentItem {
            id: ItemId::from_u128(id),
            item_type: "post".to_string(),
            title: String::new(),
            permalink: String::new(),
            status: Default::default(),
            author: String::new(),
            created: 0,
            changed: 0,
            comment_count: 0,
            body: String::new(),
            excerpt: None,
            password: None,
            terms: Default::default(),
        };
        let page = ResultPage {
            items: vec![item(2), item(1)],
            ..ResultPage::empty(1)
        };
        assert_eq!(
            page.item_ids(),
            vec![ItemId::from_u128(2), ItemId::from_u128(1)]
        );
        assert!(ResultPage::empty(3).item_ids().is_empty());
    }

    #[test]
    fn term_set_serialization() {
        let selector = TermSelector::only("category", ["news", "events"]);
        let json = serde_json::to_string(&selector).unwrap();
        assert_eq!(
            json,
            r#"{"taxonomy":"category","terms":{"only":["news","events"]}}"#
        );
        let parsed: TermSelector = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, selector);
    }
}

//! Configuration normalizer.
//!
//! Turns a flat string map (as written at the call site, lists encoded as
//! comma-separated strings) into a strongly typed [`QuerySpec`]. Every key is
//! optional and every malformed value degrades to its default; normalization
//! never fails.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::types::{
    DEFAULT_PAGE_SIZE, DEFAULT_PER_ROW, ExcerptPolicy, ImageLayout, ItemStyle, MetaField,
    PaginationMode, QuerySpec, TermSelector, TermSet,
};

/// Valid CSS identifier (element id or class name).
///
/// # Panics
///
/// Panics if the hard-coded regex literal is invalid (impossible in practice).
#[allow(clippy::expect_used)]
static CSS_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[_A-Za-z][A-Za-z0-9_-]*$").expect("valid regex literal"));

/// Check whether a string is usable as a CSS id or class name.
pub fn is_css_identifier(value: &str) -> bool {
    CSS_IDENTIFIER.is_match(value)
}

/// Raw key/value configuration.
#[derive(Debug, Clone, Default)]
pub struct RawConfig(HashMap<String, String>);

impl RawConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a key, replacing any previous value.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Value of the first key present, trimmed.
    fn get(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .find_map(|key| self.0.get(*key))
            .map(|value| value.trim())
    }

    fn string(&self, keys: &[&str], default: &str) -> String {
        match self.get(keys) {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => default.to_string(),
        }
    }

    fn boolean(&self, keys: &[&str], default: bool) -> bool {
        self.get(keys)
            .and_then(parse_bool)
            .unwrap_or(default)
    }

    fn positive(&self, keys: &[&str], default: u32) -> u32 {
        self.get(keys)
            .and_then(|value| value.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(default)
    }

    fn list(&self, keys: &[&str]) -> Vec<String> {
        self.get(keys).map(split_list).unwrap_or_default()
    }
}

impl From<HashMap<String, String>> for RawConfig {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, String)> for RawConfig {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Ambient request context.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Page number taken from the request URL, if any.
    pub paged: Option<u32>,

    /// Search query taken from the request, if any.
    pub search: Option<String>,

    /// Base URL of the page hosting the listing.
    pub permalink: String,

    /// Query arguments to carry on pagination links.
    pub link_args: Vec<(String, String)>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            paged: None,
            search: None,
            permalink: "/".to_string(),
            link_args: Vec::new(),
        }
    }
}

/// Normalize raw configuration into a spec carrying `token`.
pub fn normalize(raw: &RawConfig, ctx: &RequestContext, token: String) -> QuerySpec {
    let selectors = parse_selectors(raw.get(&["taxonomies_terms"]).unwrap_or("category"));

    let mut metas = Vec::new();
    for name in raw.list(&["display_metas"]) {
        match MetaField::parse(&name) {
            Some(meta) if !metas.contains(&meta) => metas.push(meta),
            Some(_) => {}
            None => tracing::debug!(meta = %name, "ignoring unknown meta field"),
        }
    }
    let meta_taxonomies = if metas.contains(&MetaField::Taxonomy) {
        raw.list(&["display_metas_taxonomies"])
    } else {
        Vec::new()
    };

    let search = match raw.get(&["search"]) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => ctx
            .search
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
    };

    let page = ctx
        .paged
        .filter(|p| *p > 0)
        .unwrap_or_else(|| raw.positive(&["paged"], 1));

    let container_id = raw
        .get(&["container_id"])
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    QuerySpec {
        post_type: raw.string(&["post_type"], "post"),
        page_size: raw.positive(&["posts_per_page"], DEFAULT_PAGE_SIZE),
        per_row: raw.positive(&["posts_per_row"], DEFAULT_PER_ROW),
        display_title: raw.boolean(&["display_title"], false),
        display_filter: raw.boolean(&["display_filter"], true),
        layout: raw
            .get(&["blog_layout"])
            .and_then(ImageLayout::parse)
            .unwrap_or_default(),
        no_gap: raw.boolean(&["no-gap", "no_gap"], false),
        excerpt: raw
            .get(&["except_lenght", "excerpt_length"])
            .map(ExcerptPolicy::parse)
            .unwrap_or_default(),
        excerpt_more: raw
            .get(&["except_more", "excerpt_more"])
            .unwrap_or_default()
            .to_string(),
        pagination: raw
            .get(&["pagination"])
            .and_then(PaginationMode::parse)
            .unwrap_or_default(),
        multi_selectable: raw.boolean(&["multi_selectable"], true),
        thumbnail_size_single: raw.string(&["thumbnail-size-single-row"], "full"),
        thumbnail_size_multi: raw.string(&["thumbnail-size-multi-row"], "large"),
        selectors,
        in_all_taxonomies: raw.boolean(&["in_all_taxnomies", "in_all_taxonomies"], true),
        update_paged: raw.boolean(&["update_paged"], false),
        display_page_number: raw.boolean(&["display_page_number"], false),
        page,
        effect: raw.string(&["effect"], "apollo"),
        search,
        store_session: raw.boolean(&["store_session"], false),
        load_from_url: raw.boolean(&["load_from_url"], false),
        randomize: raw.boolean(&["random"], false),
        metas,
        meta_taxonomies,
        container_id,
        container_classes: raw.list(&["container_classes"]),
        style: raw
            .get(&["style"])
            .map(ItemStyle::parse)
            .unwrap_or_default(),
        permalink: ctx.permalink.clone(),
        link_args: ctx.link_args.clone(),
        token,
    }
    .enforce_invariants()
}

/// Parse a boolean flag. Unknown values yield `None`.
fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Remove all whitespace, then split on commas, dropping empty entries.
fn split_list(value: &str) -> Vec<String> {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    compact
        .split(',')
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a taxonomy expression list such as `category(news|events), post_tag`.
///
/// Duplicate taxonomies keep their first occurrence.
pub fn parse_selectors(expression: &str) -> Vec<TermSelector> {
    let mut selectors: Vec<TermSelector> = Vec::new();
    for entry in split_list(expression) {
        let Some(selector) = parse_selector(&entry) else {
            continue;
        };
        if selectors.iter().any(|s| s.taxonomy == selector.taxonomy) {
            continue;
        }
        selectors.push(selector);
    }
    selectors
}

/// Parse one `name(term1|term2)` entry.
///
/// Malformed term lists degrade to "all terms"; an entry without a name is
/// dropped.
fn parse_selector(entry: &str) -> Option<TermSelector> {
    let Some(open) = entry.find('(') else {
        return Some(TermSelector::all(entry));
    };

    let name = &entry[..open];
    if name.is_empty() {
        return None;
    }

    let rest = &entry[open + 1..];
    let Some(close) = rest.find(')') else {
        tracing::debug!(entry, "unterminated term list, matching all terms");
        return Some(TermSelector::all(name));
    };

    let mut slugs: Vec<String> = Vec::new();
    for slug in rest[..close].split('|').filter(|s| !s.is_empty()) {
        if !slugs.iter().any(|s| s == slug) {
            slugs.push(slug.to_string());
        }
    }

    if slugs.is_empty() {
        Some(TermSelector::all(name))
    } else {
        Some(TermSelector {
            taxonomy: name.to_string(),
            terms: TermSet::Only(slugs),
        })
    }
}

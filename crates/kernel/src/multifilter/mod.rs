//! Multifilter listing pipeline.
//!
//! Renders filterable, paginated content listings:
//! - Normalizer: raw key/value configuration to a typed QuerySpec
//! - Compiler: QuerySpec to a repository-agnostic Query
//! - Executor: runs the Query, promoting pinned items
//! - Renderer: item grid, thumbnails, metas, excerpts, pagination
//! - Service: initial container render and nonce-checked AJAX follow-ups

mod compiler;
mod executor;
mod filter_ui;
pub mod html;
pub mod normalizer;
mod pager;
mod renderer;
mod service;
mod strategy;
mod types;

pub use compiler::{
    PageWindow, Query, Relation, STICKY_CONTENT_TYPE, SortOrder, TaxonomyClause, TermPredicate,
    compile,
};
pub use executor::QueryExecutor;
pub use filter_ui::render_filter_ui;
pub use normalizer::{RawConfig, RequestContext, normalize, parse_selectors};
pub use pager::{PageEntry, classic_entries, page_url, render_pagination};
pub use renderer::{
    DEFAULT_DATE_FORMAT, DEFAULT_EXCERPT_MORE, NO_RESULTS, RenderAssets, RenderedItem, Renderer,
};
pub use service::{MultifilterService, NONCE_ACTION};
pub use strategy::{
    DummyImagePlaceholder, Excerpt, ExcerptFormatter, ImageSizes, PlaceholderImage, WordExcerpt,
};
pub use types::{
    DEFAULT_PAGE_SIZE, DEFAULT_PER_ROW, ExcerptPolicy, ImageLayout, ImagePosition, ItemStyle,
    MAX_PAGE_SIZE, MAX_PER_ROW, MetaField, PaginationMode, QuerySpec, ResultPage, TermSelector,
    TermSet,
};

//! Listing renderer.
//!
//! Turns a [`ResultPage`] into the item grid plus its pagination fragment.
//! Everything the renderer needs from storage (thumbnails, term names) is
//! fetched up front into [`RenderAssets`], so rendering itself is pure.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

use chrono::DateTime;

use super::html::{escape, sanitize};
use super::pager::render_pagination;
use super::strategy::{
    DummyImagePlaceholder, ExcerptFormatter, ImageSizes, PlaceholderImage, WordExcerpt,
};
use super::types::{ExcerptPolicy, ImagePosition, ItemStyle, MetaField, QuerySpec, ResultPage};
use crate::content::{ContentItem, ItemId, Thumbnail};

/// Date format used when none is configured.
pub const DEFAULT_DATE_FORMAT: &str = "%B %-d, %Y";

/// Marker appended to truncated excerpts when a view leaves it empty.
pub const DEFAULT_EXCERPT_MORE: &str = "[…]";

/// Fragment rendered when a page has no items.
pub const NO_RESULTS: &str = r#"<div class="col-12 text-center no-posts-found">No posts found</div>"#;

/// Storage lookups resolved before rendering.
#[derive(Debug, Clone, Default)]
pub struct RenderAssets {
    /// Stored thumbnails at the view's size, by item.
    pub thumbnails: HashMap<ItemId, Thumbnail>,
    /// Term display names: taxonomy -> slug -> name.
    pub term_names: HashMap<String, HashMap<String, String>>,
}

impl RenderAssets {
    fn term_name<'a>(&'a self, taxonomy: &str, slug: &'a str) -> &'a str {
        self.term_names
            .get(taxonomy)
            .and_then(|names| names.get(slug))
            .map_or(slug, String::as_str)
    }
}

/// View model of one item, ready for markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedItem {
    pub title: String,
    pub permalink: String,
    /// Thumbnail placement; `None` renders no thumbnail.
    pub position: Option<ImagePosition>,
    /// Stored or placeholder image URL.
    pub image_url: String,
    /// Meta fragments in configuration order.
    pub metas: Vec<String>,
    /// Excerpt or body fragment, absent when the policy shows none.
    pub body: Option<String>,
    /// Password-protected: no image, no content.
    pub protected: bool,
}

/// Renders listings with injected image and excerpt strategies.
#[derive(Clone)]
pub struct Renderer {
    placeholder: Arc<dyn PlaceholderImage>,
    excerpts: Arc<dyn ExcerptFormatter>,
    image_sizes: ImageSizes,
    date_format: String,
    excerpt_more: String,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(ImageSizes::default(), DEFAULT_DATE_FORMAT)
    }
}

impl Renderer {
    pub fn new(image_sizes: ImageSizes, date_format: impl Into<String>) -> Self {
        Self {
            placeholder: Arc::new(DummyImagePlaceholder),
            excerpts: Arc::new(WordExcerpt),
            image_sizes,
            date_format: date_format.into(),
            excerpt_more: DEFAULT_EXCERPT_MORE.to_string(),
        }
    }

    /// Replace the placeholder image strategy.
    pub fn with_placeholder(mut self, placeholder: Arc<dyn PlaceholderImage>) -> Self {
        self.placeholder = placeholder;
        self
    }

    /// Replace the excerpt strategy.
    pub fn with_excerpt_formatter(mut self, excerpts: Arc<dyn ExcerptFormatter>) -> Self {
        self.excerpts = excerpts;
        self
    }

    /// Marker used when a view does not configure one.
    pub fn with_excerpt_more(mut self, marker: impl Into<String>) -> Self {
        self.excerpt_more = marker.into();
        self
    }

    /// Item grid and pagination, or the no-results fragment.
    pub fn render_page(&self, spec: &QuerySpec, page: &ResultPage, assets: &RenderAssets) -> String {
        if page.is_empty() {
            return NO_RESULTS.to_string();
        }

        let mut out = String::new();
        let gap = if spec.no_gap { " no-gap-container" } else { "" };
        let _ = write!(
            out,
            r#"<div class="row multifilter-items{gap}" data-page="{}">"#,
            escape(&spec.permalink)
        );
        for (index, item) in page.items.iter().enumerate() {
            let rendered = self.prepare(spec, item, index, assets);
            out.push_str(&self.markup(spec, &rendered));
        }
        out.push_str("</div>");
        out.push_str(&render_pagination(spec, page.page, page.total_pages));
        out
    }

    /// Build the view model for the item at `index` on the page.
    pub fn prepare(
        &self,
        spec: &QuerySpec,
        item: &ContentItem,
        index: usize,
        assets: &RenderAssets,
    ) -> RenderedItem {
        let protected = item.password_required();
        let position = spec.layout.position(index);

        let image_url = match assets.thumbnails.get(&item.id) {
            Some(thumbnail) if !thumbnail.url.is_empty() => thumbnail.url.clone(),
            _ => {
                let size_key = spec.thumbnail_size();
                let (width, height) = self.image_sizes.dimensions(size_key);
                self.placeholder.url(size_key, width, height)
            }
        };

        let metas = spec
            .metas
            .iter()
            .map(|meta| self.meta(spec, *meta, item, assets))
            .collect();

        let body = if protected {
            None
        } else {
            match spec.excerpt {
                ExcerptPolicy::None => None,
                ExcerptPolicy::Full => Some(sanitize(&item.body)),
                ExcerptPolicy::FixedLength(length) => Some(self.excerpt(spec, item, length)),
            }
        };

        RenderedItem {
            title: item.title.clone(),
            permalink: item.permalink.clone(),
            position,
            image_url,
            metas,
            body,
            protected,
        }
    }

    fn excerpt(&self, spec: &QuerySpec, item: &ContentItem, length: u32) -> String {
        let excerpt = self.excerpts.excerpt(item, length);
        let mut out = format!(r#"<div class="entry-excerpt">{}</div>"#, excerpt.html);
        if excerpt.truncated && spec.excerpt_more != "none" {
            let marker = if spec.excerpt_more.is_empty() {
                &self.excerpt_more
            } else {
                &spec.excerpt_more
            };
            let _ = write!(
                out,
                r#"<div class="entry-excerpt-more">{}</div>"#,
                escape(marker)
            );
        }
        out
    }

    fn meta(&self, spec: &QuerySpec, meta: MetaField, item: &ContentItem, assets: &RenderAssets) -> String {
        let value = match meta {
            MetaField::Date => escape(&self.format_date(item.created)),
            MetaField::Author => escape(&item.author),
            MetaField::CommentCount => item.comment_count.to_string(),
            MetaField::LastModified => escape(&self.format_date(item.changed)),
            MetaField::Taxonomy => spec
                .meta_taxonomies
                .iter()
                .map(|taxonomy| {
                    let names: Vec<String> = item
                        .terms_in(taxonomy)
                        .iter()
                        .map(|slug| escape(assets.term_name(taxonomy, slug)))
                        .collect();
                    format!(
                        r#"<span class="multifilter-meta-taxonomy-{}">{}</span>"#,
                        escape(taxonomy),
                        names.join("/")
                    )
                })
                .collect::<Vec<_>>()
                .join(", "),
        };
        format!(
            r#"<span class="multifilter-meta-{}">{value}</span>"#,
            meta.as_str()
        )
    }

    fn format_date(&self, timestamp: i64) -> String {
        let Some(date) = DateTime::from_timestamp(timestamp, 0) else {
            return String::new();
        };
        let mut out = String::new();
        if write!(out, "{}", date.format(&self.date_format)).is_err() {
            out.clear();
            let _ = write!(out, "{}", date.format("%Y-%m-%d"));
        }
        out
    }

    fn markup(&self, spec: &QuerySpec, item: &RenderedItem) -> String {
        let mut classes = if spec.per_row > 1 {
            let lg = 12 / spec.per_row;
            let md = if lg == 3 { 4 } else { 6 };
            format!("col-sm-6 col-md-{md} col-lg-{lg} multi-column")
        } else {
            "single-column".to_string()
        };
        if spec.no_gap {
            classes.push_str(" no-gap");
        }
        if let Some(position) = item.position {
            if position.is_aside() {
                classes.push_str(" image-aside");
            }
            classes.push_str(" has-post-thumbnail");
        }

        let container_style = match spec.style {
            ItemStyle::Default => "",
            ItemStyle::EqualHeight => " equal-height",
            ItemStyle::Masonry => " masonry",
        };

        let thumbnail = item
            .position
            .map(|position| self.thumbnail(spec, item, position))
            .unwrap_or_default();
        let content = self.content(spec, item);

        let body = match item.position {
            Some(ImagePosition::Right) => format!("{content}{thumbnail}"),
            _ => format!("{thumbnail}{content}"),
        };

        format!(
            r#"<article class="col-12 {classes}"><div class="article-container{container_style}">{body}</div></article>"#
        )
    }

    fn thumbnail(&self, spec: &QuerySpec, item: &RenderedItem, position: ImagePosition) -> String {
        let mut effect = String::new();
        if spec.effect != "none" && !spec.effect.is_empty() {
            let _ = write!(effect, " effect-{}", escape(&spec.effect));
        }
        if item.protected {
            effect.push_str(" image-protected");
        }

        let title = escape(&item.title);
        let image = if item.protected {
            String::new()
        } else {
            format!(r#"<img src="{}" alt="{title}">"#, escape(&item.image_url))
        };
        let caption_meta = if item.metas.is_empty() {
            String::new()
        } else {
            format!(
                r#"<div class="figure-caption-meta">{}</div>"#,
                item.metas.join(", ")
            )
        };

        format!(
            concat!(
                r#"<div class="entry-thumbnail-container clearfix image-{position}">"#,
                r#"<a href="{href}"><figure class="effect-multifilter{effect} entry-thumbnail">{image}"#,
                r#"<figcaption><div class="figure-caption animation">"#,
                r#"<div class="figure-caption-title">{title}</div>{caption_meta}</div></figcaption>"#,
                r#"</figure></a></div>"#
            ),
            position = position.as_str(),
            href = escape(&item.permalink),
            effect = effect,
            image = image,
            title = title,
            caption_meta = caption_meta,
        )
    }

    fn content(&self, spec: &QuerySpec, item: &RenderedItem) -> String {
        if item.protected || (!spec.display_title && item.body.is_none()) {
            return String::new();
        }

        let mut out = String::from(r#"<div class="entry-content-container">"#);
        if spec.display_title {
            let _ = write!(
                out,
                r#"<header class="entry-header"><h2 class="entry-title"><a href="{}">{}</a></h2></header>"#,
                escape(&item.permalink),
                escape(&item.title)
            );
        }
        if !item.metas.is_empty() {
            let _ = write!(out, r#"<div class="entry-metas">{}</div>"#, item.metas.join(", "));
        }
        if let Some(body) = &item.body {
            let _ = write!(
                out,
                r#"<div class="entry-content"><div class="entry-content-inner">{body}</div></div>"#
            );
        }
        out.push_str("</div>");
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::content::ItemStatus;
    use crate::multifilter::normalizer::{RawConfig, RequestContext, normalize};
    use uuid::Uuid;

    fn spec(pairs: &[(&str, &str)]) -> QuerySpec {
        let raw: RawConfig = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        normalize(&raw, &RequestContext::default(), String::new())
    }

    fn item(title: &str) -> ContentItem {
        ContentItem {
            id: Uuid::now_v7(),
            item_type: "post".to_string(),
            title: title.to_string(),
            permalink: format!("/{}/", title.to_lowercase()),
            status: ItemStatus::Publish,
            author: "Ada".to_string(),
            // 2024-03-05 12:00:00 UTC
            created: 1_709_640_000,
            changed: 1_709_640_000,
            comment_count: 7,
            body: "<p>alpha beta gamma delta</p><script>x()</script>".to_string(),
            excerpt: None,
            password: None,
            terms: [("category".to_string(), vec!["news".to_string()])].into(),
        }
    }

    fn page(items: Vec<ContentItem>, total_pages: u32) -> ResultPage {
        ResultPage {
            total: items.len() as u64,
            items,
            total_pages,
            page: 1,
        }
    }

    #[test]
    fn column_classes() {
        let renderer = Renderer::default();
        let assets = RenderAssets::default();

        let two = renderer.render_page(&spec(&[]), &page(vec![item("A")], 1), &assets);
        assert!(two.contains("col-sm-6 col-md-6 col-lg-6 multi-column"));

        let four = renderer.render_page(
            &spec(&[("posts_per_row", "4")]),
            &page(vec![item("A")], 1),
            &assets,
        );
        assert!(four.contains("col-md-4 col-lg-3"));

        let one = renderer.render_page(
            &spec(&[("posts_per_row", "1")]),
            &page(vec![item("A")], 1),
            &assets,
        );
        assert!(one.contains(r#"class="col-12 single-column has-post-thumbnail""#));
    }

    #[test]
    fn placeholder_uses_size_dimensions() {
        let renderer = Renderer::default();
        let html = renderer.render_page(&spec(&[]), &page(vec![item("A")], 1), &RenderAssets::default());
        // Multi-column default size is "large".
        assert!(html.contains("https://dummyimage.com/1024x1024/cccccc/fff.jpg"));
    }

    #[test]
    fn stored_thumbnail_wins() {
        let renderer = Renderer::default();
        let a = item("A");
        let mut assets = RenderAssets::default();
        assets.thumbnails.insert(
            a.id,
            Thumbnail {
                url: "/media/a.jpg".to_string(),
                width: 10,
                height: 10,
            },
        );
        let html = renderer.render_page(&spec(&[]), &page(vec![a], 1), &assets);
        assert!(html.contains(r#"<img src="/media/a.jpg" alt="A">"#));
        assert!(!html.contains("dummyimage"));
    }

    #[test]
    fn zigzag_alternates_sides() {
        let renderer = Renderer::default();
        let s = spec(&[("blog_layout", "zigzag"), ("display_title", "true")]);
        let assets = RenderAssets::default();

        let first = renderer.prepare(&s, &item("A"), 0, &assets);
        let second = renderer.prepare(&s, &item("B"), 1, &assets);
        assert_eq!(first.position, Some(ImagePosition::Left));
        assert_eq!(second.position, Some(ImagePosition::Right));

        let html = renderer.render_page(&s, &page(vec![item("A"), item("B")], 1), &assets);
        assert!(html.contains("image-aside"));
        // Right-hand image follows the content.
        let b_start = html.rfind("<article").unwrap();
        let b = &html[b_start..];
        assert!(b.find("entry-content-container").unwrap() < b.find("entry-thumbnail-container").unwrap());
    }

    #[test]
    fn layout_none_renders_content_only() {
        let renderer = Renderer::default();
        let s = spec(&[("blog_layout", "none"), ("display_title", "true")]);
        let html = renderer.render_page(&s, &page(vec![item("A")], 1), &RenderAssets::default());
        assert!(!html.contains("entry-thumbnail"));
        assert!(!html.contains("has-post-thumbnail"));
        assert!(html.contains(r#"<h2 class="entry-title"><a href="/a/">A</a></h2>"#));
    }

    #[test]
    fn excerpt_length_and_marker() {
        let renderer = Renderer::default();
        let s = spec(&[("except_lenght", "2")]);
        let html = renderer.render_page(&s, &page(vec![item("A")], 1), &RenderAssets::default());
        assert!(html.contains(r#"<div class="entry-excerpt">alpha beta</div>"#));
        assert!(html.contains(r#"<div class="entry-excerpt-more">[…]</div>"#));

        let custom = spec(&[("except_lenght", "2"), ("except_more", "More >")]);
        let html = renderer.render_page(&custom, &page(vec![item("A")], 1), &RenderAssets::default());
        assert!(html.contains("More &gt;"));

        let none = spec(&[("except_lenght", "2"), ("except_more", "none")]);
        let html = renderer.render_page(&none, &page(vec![item("A")], 1), &RenderAssets::default());
        assert!(!html.contains("entry-excerpt-more"));
    }

    #[test]
    fn full_body_is_sanitized() {
        let renderer = Renderer::default();
        let s = spec(&[("except_lenght", "full")]);
        let html = renderer.render_page(&s, &page(vec![item("A")], 1), &RenderAssets::default());
        assert!(html.contains("<p>alpha beta gamma delta</p>"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn protected_items_hide_image_and_body() {
        let renderer = Renderer::default();
        let s = spec(&[("except_lenght", "full"), ("display_title", "true")]);
        let mut secret = item("Secret");
        secret.password = Some("hunter2".to_string());
        let html = renderer.render_page(&s, &page(vec![secret], 1), &RenderAssets::default());

        assert!(html.contains("image-protected"));
        assert!(!html.contains("<img"));
        assert!(!html.contains("alpha"));
        assert!(!html.contains("entry-content-container"));
    }

    #[test]
    fn metas_in_configured_order() {
        let renderer = Renderer::default();
        let s = spec(&[
            ("display_title", "true"),
            ("display_metas", "author, date, commentcount, taxonomy"),
            ("display_metas_taxonomies", "category"),
        ]);
        let mut assets = RenderAssets::default();
        assets.term_names.insert(
            "category".to_string(),
            [("news".to_string(), "News & Views".to_string())].into(),
        );
        let rendered = renderer.prepare(&s, &item("A"), 0, &assets);

        assert_eq!(
            rendered.metas,
            vec![
                r#"<span class="multifilter-meta-author">Ada</span>"#.to_string(),
                r#"<span class="multifilter-meta-date">March 5, 2024</span>"#.to_string(),
                r#"<span class="multifilter-meta-commentcount">7</span>"#.to_string(),
                concat!(
                    r#"<span class="multifilter-meta-taxonomies">"#,
                    r#"<span class="multifilter-meta-taxonomy-category">News &amp; Views</span></span>"#
                )
                .to_string(),
            ]
        );
    }

    #[test]
    fn invalid_date_format_falls_back() {
        let renderer = Renderer::new(ImageSizes::default(), "%Y %");
        assert_eq!(renderer.format_date(1_709_640_000), "2024-03-05");
    }

    #[test]
    fn titles_are_escaped() {
        let renderer = Renderer::default();
        let s = spec(&[("display_title", "true")]);
        let html = renderer.render_page(&s, &page(vec![item("<b>x</b>")], 1), &RenderAssets::default());
        assert!(html.contains("&lt;b&gt;x&lt;/b&gt;"));
        assert!(!html.contains("<b>x</b>"));
    }

    #[test]
    fn empty_page_renders_no_results() {
        let renderer = Renderer::default();
        let html = renderer.render_page(&spec(&[]), &ResultPage::empty(1), &RenderAssets::default());
        assert_eq!(html, NO_RESULTS);
    }

    #[test]
    fn single_page_has_no_pagination() {
        let renderer = Renderer::default();
        let html = renderer.render_page(&spec(&[]), &page(vec![item("A")], 1), &RenderAssets::default());
        assert!(!html.contains("multifilter-paginations"));
    }
}

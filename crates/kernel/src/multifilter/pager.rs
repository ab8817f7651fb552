//! Pagination fragments.

use super::html::escape;
use super::types::{PaginationMode, QuerySpec};

/// Pages always shown at each end of a classic pager.
const END_SIZE: u32 = 1;

/// Pages shown on each side of the current page.
const MID_SIZE: u32 = 2;

/// One entry of a classic pager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEntry {
    Prev(u32),
    Page(u32),
    Current(u32),
    Gap,
    Next(u32),
}

/// Windowed page list: both ends, the current page and its neighbours,
/// gaps elsewhere.
pub fn classic_entries(current: u32, total_pages: u32) -> Vec<PageEntry> {
    let mut entries = Vec::new();
    if total_pages <= 1 {
        return entries;
    }
    let current = current.clamp(1, total_pages);

    if current > 1 {
        entries.push(PageEntry::Prev(current - 1));
    }

    let mut gap_pending = false;
    for n in 1..=total_pages {
        if n == current {
            entries.push(PageEntry::Current(n));
            gap_pending = true;
        } else if n <= END_SIZE
            || (n + MID_SIZE >= current && n <= current + MID_SIZE)
            || n > total_pages.saturating_sub(END_SIZE)
        {
            entries.push(PageEntry::Page(n));
            gap_pending = true;
        } else if gap_pending {
            entries.push(PageEntry::Gap);
            gap_pending = false;
        }
    }

    if current < total_pages {
        entries.push(PageEntry::Next(current + 1));
    }
    entries
}

/// URL of `page`: the permalink for page 1, `{permalink}page/{n}/` after.
/// Link arguments and the search string are carried as query arguments.
pub fn page_url(spec: &QuerySpec, page: u32) -> String {
    let base = if spec.permalink.ends_with('/') {
        spec.permalink.clone()
    } else {
        format!("{}/", spec.permalink)
    };
    let mut url = if page <= 1 {
        base
    } else {
        format!("{base}page/{page}/")
    };

    let mut args: Vec<(&str, &str)> = spec
        .link_args
        .iter()
        .filter(|(k, _)| k != "s")
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    if !spec.search.is_empty() {
        args.push(("s", spec.search.as_str()));
    }
    if !args.is_empty() {
        let query: Vec<String> = args
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        url.push('?');
        url.push_str(&query.join("&"));
    }
    url
}

/// Pagination fragment for one rendered page.
///
/// Empty for a single page and for [`PaginationMode::None`].
pub fn render_pagination(spec: &QuerySpec, current: u32, total_pages: u32) -> String {
    if total_pages <= 1 {
        return String::new();
    }

    let (orientation, inner) = match spec.pagination {
        PaginationMode::None => return String::new(),
        PaginationMode::Classic => ("text-right", render_classic(spec, current, total_pages)),
        PaginationMode::ReadMore => {
            let inner = if current < total_pages {
                format!(
                    r#"<a href="{}" class="btn btn-material btn-readmore next">Read more</a>"#,
                    escape(&page_url(spec, current + 1))
                )
            } else {
                r#"<span class="nothing-more">Nothing more to load.</span>"#.to_string()
            };
            ("text-center", inner)
        }
        PaginationMode::Infinite => {
            // The client stops loading when no `.next` marker is present.
            if current >= total_pages {
                return String::new();
            }
            (
                "text-center",
                format!(
                    r#"<span class="next" data-next="{}"></span>"#,
                    escape(&page_url(spec, current + 1))
                ),
            )
        }
    };

    format!(
        r#"<div class="row multifilter-paginations {orientation}"><div class="col-12">{inner}</div></div>"#
    )
}

fn render_classic(spec: &QuerySpec, current: u32, total_pages: u32) -> String {
    let link = |n: u32| escape(&page_url(spec, n));
    classic_entries(current, total_pages)
        .into_iter()
        .map(|entry| match entry {
            PageEntry::Prev(n) => {
                format!(r#"<a class="prev page-numbers" href="{}">&lsaquo;</a>"#, link(n))
            }
            PageEntry::Next(n) => {
                format!(r#"<a class="next page-numbers" href="{}">&rsaquo;</a>"#, link(n))
            }
            PageEntry::Page(n) => format!(r#"<a class="page-numbers" href="{}">{n}</a>"#, link(n)),
            PageEntry::Current(n) => {
                format!(r#"<span aria-current="page" class="page-numbers current">{n}</span>"#)
            }
            PageEntry::Gap => r#"<span class="page-numbers dots">&hellip;</span>"#.to_string(),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::multifilter::normalizer::{RawConfig, RequestContext, normalize};
    use PageEntry::*;

    fn spec(pagination: &str) -> QuerySpec {
        let raw = RawConfig::new().set("pagination", pagination);
        let ctx = RequestContext {
            permalink: "/blog/".to_string(),
            ..Default::default()
        };
        normalize(&raw, &ctx, String::new())
    }

    #[test]
    fn classic_window() {
        assert_eq!(
            classic_entries(1, 3),
            vec![Current(1), Page(2), Page(3), Next(2)]
        );
        assert_eq!(
            classic_entries(6, 10),
            vec![
                Prev(5),
                Page(1),
                Gap,
                Page(4),
                Page(5),
                Current(6),
                Page(7),
                Page(8),
                Gap,
                Page(10),
                Next(7)
            ]
        );
        assert!(classic_entries(1, 1).is_empty());
    }

    #[test]
    fn page_urls() {
        let s = spec("pagination");
        assert_eq!(page_url(&s, 1), "/blog/");
        assert_eq!(page_url(&s, 3), "/blog/page/3/");

        let mut searching = s.clone();
        searching.search = "red fox".to_string();
        searching.link_args = vec![("lang".to_string(), "en".to_string())];
        assert_eq!(page_url(&searching, 2), "/blog/page/2/?lang=en&s=red%20fox");
    }

    #[test]
    fn single_page_renders_nothing() {
        for mode in ["pagination", "readmore", "infinite", "none"] {
            assert_eq!(render_pagination(&spec(mode), 1, 1), "");
        }
    }

    #[test]
    fn read_more_terminal_marker() {
        let s = spec("readmore");
        let middle = render_pagination(&s, 1, 2);
        assert!(middle.contains(r#"href="/blog/page/2/""#));
        assert!(middle.contains("Read more"));
        assert!(middle.contains("text-center"));

        let last = render_pagination(&s, 2, 2);
        assert!(last.contains("Nothing more to load."));
        assert!(!last.contains("Read more"));
    }

    #[test]
    fn infinite_next_marker() {
        let s = spec("infinite");
        assert_eq!(
            render_pagination(&s, 1, 3),
            r#"<div class="row multifilter-paginations text-center"><div class="col-12"><span class="next" data-next="/blog/page/2/"></span></div></div>"#
        );
        assert_eq!(render_pagination(&s, 3, 3), "");
    }

    #[test]
    fn classic_markup() {
        let html = render_pagination(&spec("pagination"), 2, 3);
        assert!(html.contains("text-right"));
        assert!(html.contains(r#"<a class="prev page-numbers" href="/blog/">&lsaquo;</a>"#));
        assert!(html.contains(r#"<span aria-current="page" class="page-numbers current">2</span>"#));
        assert!(html.contains(r#"<a class="next page-numbers" href="/blog/page/3/">&rsaquo;</a>"#));
    }

    #[test]
    fn none_mode_renders_nothing() {
        assert_eq!(render_pagination(&spec("none"), 1, 5), "");
    }
}

//! Filter controls rendered above the initial listing.

use std::fmt::Write;

use super::html::escape;
use super::types::QuerySpec;
use crate::content::Term;

/// Reset link, search form, and one chip group per taxonomy.
///
/// `taxonomies` pairs each selected taxonomy with its terms, in selector
/// order. Terms without published items are skipped; a taxonomy left with
/// no terms renders no group.
pub fn render_filter_ui(spec: &QuerySpec, taxonomies: &[(String, Vec<Term>)], search_action: &str) -> String {
    let mut out = String::from(r#"<div class="multifilter-filter-wrapper">"#);

    out.push_str(concat!(
        r#"<div class="multifilter-filter-reset-search text-right">"#,
        r#"<span class="multifilter-filter-reset">Reset all</span>"#
    ));
    if spec.search.is_empty() {
        let _ = write!(
            out,
            concat!(
                r#"<form role="search" method="get" class="multifilter-search" action="{}">"#,
                r#"<div class="form-group"><input type="text" class="form-control" placeholder="Search…" name="s" value="">"#,
                r#"<span class="form-group-btn"><button class="btn btn-default" type="submit" value="Search">Search</button></span>"#,
                r#"</div></form>"#
            ),
            escape(search_action)
        );
    }
    out.push_str("</div>");

    for (taxonomy, terms) in taxonomies {
        let visible: Vec<&Term> = terms.iter().filter(|t| t.count > 0).collect();
        if visible.is_empty() {
            continue;
        }
        let taxonomy = escape(taxonomy);
        let _ = write!(
            out,
            r#"<div class="multifilter-filter-taxonomy multifilter-filter-taxonomy-{taxonomy}" data-post-type="{}" data-multiselect="{}" data-taxonomy="{taxonomy}">"#,
            escape(&spec.post_type),
            spec.multi_selectable
        );
        for term in visible {
            let slug = escape(&term.slug);
            let _ = write!(
                out,
                r#"<span class="multifilter-filter-item multifilter-filter-item-{slug}" data-term="{slug}">{}</span>"#,
                escape(&term.name)
            );
        }
        out.push_str("</div>");
    }

    out.push_str("</div>");
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::multifilter::normalizer::{RawConfig, RequestContext, normalize};

    fn term(slug: &str, name: &str, count: u64) -> Term {
        Term {
            taxonomy: "category".to_string(),
            slug: slug.to_string(),
            name: name.to_string(),
            parent: None,
            count,
        }
    }

    #[test]
    fn chips_skip_empty_terms() {
        let spec = normalize(&RawConfig::new(), &RequestContext::default(), String::new());
        let html = render_filter_ui(
            &spec,
            &[
                (
                    "category".to_string(),
                    vec![term("news", "News & Co", 3), term("empty", "Empty", 0)],
                ),
                ("post_tag".to_string(), vec![term("old", "Old", 0)]),
            ],
            "/",
        );

        assert!(html.contains("Reset all"));
        assert!(html.contains(r#"name="s""#));
        assert!(html.contains(r#"data-taxonomy="category""#));
        assert!(html.contains(r#"data-multiselect="true""#));
        assert!(html.contains(r#"data-term="news">News &amp; Co</span>"#));
        assert!(!html.contains("data-term=\"empty\""));
        assert!(!html.contains("post_tag"));
    }
}

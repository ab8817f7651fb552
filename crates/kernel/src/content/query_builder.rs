//! Content query builder using SeaQuery.
//!
//! Generates PostgreSQL for a compiled [`Query`] with support for:
//! - Taxonomy predicates with term descendants
//! - Word search over title, excerpt, and body
//! - Include/exclude lists and listed ordering
//! - Pagination

use sea_query::{
    Cond, Expr, ExprTrait, Iden, Order, PostgresQueryBuilder, Query as SqlQuery,
    SelectStatement, SimpleExpr,
};

use crate::multifilter::{PageWindow, Query, Relation, SortOrder, TermPredicate};

#[derive(Iden)]
enum Item {
    #[iden = "content_item"]
    Table,
    Id,
    Type,
    Title,
    Permalink,
    Status,
    Author,
    Created,
    Changed,
    CommentCount,
    Body,
    Excerpt,
    Password,
}

/// Query builder for content listings.
pub struct ContentQueryBuilder<'a> {
    query: &'a Query,
}

impl<'a> ContentQueryBuilder<'a> {
    pub fn new(query: &'a Query) -> Self {
        Self { query }
    }

    /// Build the item SELECT for one window.
    pub fn build(&self, window: PageWindow) -> String {
        let mut select = SqlQuery::select();
        select
            .columns([
                (Item::Table, Item::Id),
                (Item::Table, Item::Type),
                (Item::Table, Item::Title),
                (Item::Table, Item::Permalink),
                (Item::Table, Item::Status),
                (Item::Table, Item::Author),
                (Item::Table, Item::Created),
                (Item::Table, Item::Changed),
                (Item::Table, Item::CommentCount),
                (Item::Table, Item::Body),
                (Item::Table, Item::Excerpt),
                (Item::Table, Item::Password),
            ])
            .from(Item::Table);

        self.add_filters(&mut select);
        self.add_sort(&mut select);
        Self::add_window(&mut select, window);

        select.to_string(PostgresQueryBuilder)
    }

    /// Build a COUNT query over every match.
    pub fn build_count(&self) -> String {
        let mut select = SqlQuery::select();
        select
            .expr(Expr::col((Item::Table, Item::Id)).count())
            .from(Item::Table);

        self.add_filters(&mut select);

        select.to_string(PostgresQueryBuilder)
    }

    /// Build an identifiers-only SELECT, windowed when the query is.
    pub fn build_ids(&self) -> String {
        let mut select = SqlQuery::select();
        select.column((Item::Table, Item::Id)).from(Item::Table);

        self.add_filters(&mut select);
        self.add_sort(&mut select);
        if let Some(window) = self.query.window {
            Self::add_window(&mut select, window);
        }

        select.to_string(PostgresQueryBuilder)
    }

    fn add_filters(&self, select: &mut SelectStatement) {
        let query = self.query;

        select.and_where(Expr::col((Item::Table, Item::Type)).eq(query.content_type.as_str()));
        select.and_where(Expr::col((Item::Table, Item::Status)).eq(query.status.as_str()));

        if let Some(condition) = self.taxonomy_condition() {
            select.cond_where(condition);
        }

        if let Some(search) = query.search.as_deref() {
            for word in search.split_whitespace() {
                let pattern = format!("%{}%", escape_like_wildcards(word));
                select.and_where(Expr::cust_with_values(
                    "(content_item.title ILIKE $1 OR COALESCE(content_item.excerpt, '') ILIKE $2 \
                     OR content_item.body ILIKE $3)",
                    [pattern.clone(), pattern.clone(), pattern],
                ));
            }
        }

        match &query.include {
            // An empty include list matches nothing.
            Some(ids) if ids.is_empty() => {
                select.and_where(Expr::cust("FALSE"));
            }
            Some(ids) => {
                select.and_where(Expr::col((Item::Table, Item::Id)).is_in(ids.iter().copied()));
            }
            None => {}
        }

        if !query.exclude.is_empty() {
            select.and_where(
                Expr::col((Item::Table, Item::Id)).is_not_in(query.exclude.iter().copied()),
            );
        }
    }

    fn taxonomy_condition(&self) -> Option<Cond> {
        let clause = &self.query.taxonomy;
        if clause.is_empty() {
            return None;
        }
        let mut cond = match clause.relation {
            Relation::And => Cond::all(),
            Relation::Or => Cond::any(),
        };
        for predicate in &clause.predicates {
            cond = cond.add(term_predicate_expr(predicate));
        }
        Some(cond)
    }

    fn add_sort(&self, select: &mut SelectStatement) {
        match (self.query.sort, self.query.include.as_deref()) {
            (SortOrder::AsListed, Some(ids)) if !ids.is_empty() => {
                let listed: Vec<String> = ids.iter().map(|id| format!("'{id}'")).collect();
                select.order_by_expr(
                    Expr::cust(format!(
                        "array_position(ARRAY[{}]::uuid[], content_item.id)",
                        listed.join(", ")
                    )),
                    Order::Asc,
                );
            }
            (SortOrder::Random, _) => {
                select.order_by_expr(Expr::cust("RANDOM()"), Order::Asc);
            }
            _ => {
                select
                    .order_by((Item::Table, Item::Created), Order::Desc)
                    .order_by((Item::Table, Item::Id), Order::Desc);
            }
        }
    }

    fn add_window(select: &mut SelectStatement, window: PageWindow) {
        select.limit(u64::from(window.per_page));
        select.offset(window.offset());
    }
}

/// Membership test for one taxonomy predicate.
fn term_predicate_expr(predicate: &TermPredicate) -> SimpleExpr {
    if predicate.slugs.is_empty() {
        return Expr::cust("FALSE");
    }

    let mut values: Vec<String> = Vec::with_capacity(predicate.slugs.len() * 2 + 2);
    values.push(predicate.taxonomy.clone());

    let slugs_sql = if predicate.include_descendants {
        let (sql, params) = TermHierarchyQuery::descendants_subquery(
            &predicate.taxonomy,
            &predicate.slugs,
            values.len() + 1,
        );
        values.extend(params);
        sql
    } else {
        let placeholders = placeholders(values.len() + 1, predicate.slugs.len());
        values.extend(predicate.slugs.iter().cloned());
        placeholders
    };

    Expr::cust_with_values(
        format!(
            "content_item.id IN (SELECT cit.item_id FROM content_item_term cit \
             WHERE cit.taxonomy = $1 AND cit.slug IN ({slugs_sql}))"
        ),
        values,
    )
}

/// `$n, $n+1, ...` for `count` parameters.
fn placeholders(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|n| format!("${n}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Escape SQL LIKE wildcard characters (`%`, `_`, `\`) in a value.
fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Builder for term hierarchy subqueries.
pub struct TermHierarchyQuery;

impl TermHierarchyQuery {
    /// Recursive subquery selecting `slugs` and all their descendants.
    ///
    /// Placeholders are numbered from `first_param`; the returned values
    /// bind them in order.
    pub fn descendants_subquery(
        taxonomy: &str,
        slugs: &[String],
        first_param: usize,
    ) -> (String, Vec<String>) {
        let roots = (first_param..first_param + slugs.len())
            .map(|n| format!("(${n})"))
            .collect::<Vec<_>>()
            .join(", ");
        let taxonomy_param = first_param + slugs.len();

        let sql = format!(
            "WITH RECURSIVE term_descendants AS (\
             SELECT r.slug FROM (VALUES {roots}) AS r(slug) \
             UNION \
             SELECT t.slug FROM taxonomy_term t \
             INNER JOIN term_descendants d ON t.parent = d.slug \
             WHERE t.taxonomy = ${taxonomy_param}\
             ) SELECT slug FROM term_descendants"
        );

        let mut values = slugs.to_vec();
        values.push(taxonomy.to_string());
        (sql, values)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::content::ItemStatus;
    use crate::multifilter::TaxonomyClause;
    use uuid::Uuid;

    fn query() -> Query {
        Query {
            content_type: "post".to_string(),
            status: ItemStatus::Publish,
            taxonomy: TaxonomyClause::default(),
            search: None,
            sort: SortOrder::Newest,
            window: Some(PageWindow {
                page: 1,
                per_page: 4,
            }),
            promote_sticky: true,
            include: None,
            exclude: Vec::new(),
        }
    }

    #[test]
    fn simple_listing() {
        let q = query();
        let sql = ContentQueryBuilder::new(&q).build(PageWindow {
            page: 2,
            per_page: 4,
        });

        assert!(sql.contains("FROM \"content_item\""));
        assert!(sql.contains("\"type\" = 'post'"));
        assert!(sql.contains("\"status\" = 'publish'"));
        assert!(sql.contains("ORDER BY \"content_item\".\"created\" DESC"));
        assert!(sql.contains("LIMIT 4"));
        assert!(sql.contains("OFFSET 4"));
    }

    #[test]
    fn count_has_no_window_or_order() {
        let q = query();
        let sql = ContentQueryBuilder::new(&q).build_count();

        assert!(sql.contains("COUNT("));
        assert!(!sql.contains("LIMIT"));
        assert!(!sql.contains("ORDER BY"));
    }

    #[test]
    fn taxonomy_predicates_use_hierarchy() {
        let mut q = query();
        q.taxonomy = TaxonomyClause {
            relation: Relation::Or,
            predicates: vec![
                TermPredicate {
                    taxonomy: "category".to_string(),
                    slugs: vec!["news".to_string()],
                    include_descendants: true,
                },
                TermPredicate {
                    taxonomy: "post_tag".to_string(),
                    slugs: vec!["rust".to_string(), "go".to_string()],
                    include_descendants: false,
                },
            ],
        };
        let sql = ContentQueryBuilder::new(&q).build_count();

        assert!(sql.contains("WITH RECURSIVE term_descendants"));
        assert!(sql.contains("'news'"));
        assert!(sql.contains("cit.slug IN ('rust', 'go')"));
        assert!(sql.contains(" OR "));
    }

    #[test]
    fn search_words_are_escaped() {
        let mut q = query();
        q.search = Some("100% rust_lang".to_string());
        let sql = ContentQueryBuilder::new(&q).build_count();

        assert!(sql.contains("ILIKE"));
        // The backend may double the escape backslash when inlining.
        assert!(sql.contains("100\\%") || sql.contains("100\\\\%"));
        assert!(sql.contains("rust\\_lang") || sql.contains("rust\\\\_lang"));
    }

    #[test]
    fn as_listed_orders_by_position() {
        let id = Uuid::nil();
        let mut q = query();
        q.include = Some(vec![id]);
        q.sort = SortOrder::AsListed;
        let sql = ContentQueryBuilder::new(&q).build(PageWindow {
            page: 1,
            per_page: 4,
        });

        assert!(sql.contains("array_position"));
        assert!(sql.contains(&id.to_string()));
    }

    #[test]
    fn empty_include_matches_nothing() {
        let mut q = query();
        q.include = Some(Vec::new());
        let sql = ContentQueryBuilder::new(&q).build_ids();
        assert!(sql.contains("FALSE"));
    }

    #[test]
    fn random_sort() {
        let mut q = query();
        q.sort = SortOrder::Random;
        q.window = None;
        let sql = ContentQueryBuilder::new(&q).build_ids();
        assert!(sql.contains("RANDOM()"));
        assert!(!sql.contains("LIMIT"));
    }

    #[test]
    fn descendants_subquery_numbering() {
        let (sql, values) = TermHierarchyQuery::descendants_subquery(
            "category",
            &["a".to_string(), "b".to_string()],
            2,
        );
        assert!(sql.contains("VALUES ($2), ($3)"));
        assert!(sql.contains("t.taxonomy = $4"));
        assert_eq!(values, vec!["a", "b", "category"]);
    }
}

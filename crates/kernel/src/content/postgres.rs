//! PostgreSQL content repository.

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::model::{ContentItem, ContentPage, ItemId, ItemStatus, Term, Thumbnail};
use super::query_builder::ContentQueryBuilder;
use super::repository::ContentRepository;
use super::term_cache::TermCache;
use crate::multifilter::{PageWindow, Query};

/// Row shape of the item SELECT.
#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: Uuid,
    #[sqlx(rename = "type")]
    item_type: String,
    title: String,
    permalink: String,
    status: String,
    author: String,
    created: i64,
    changed: i64,
    comment_count: i32,
    body: String,
    excerpt: Option<String>,
    password: Option<String>,
}

impl ItemRow {
    fn into_item(self, terms: BTreeMap<String, Vec<String>>) -> ContentItem {
        ContentItem {
            id: self.id,
            item_type: self.item_type,
            title: self.title,
            permalink: self.permalink,
            status: ItemStatus::parse(&self.status),
            author: self.author,
            created: self.created,
            changed: self.changed,
            comment_count: u32::try_from(self.comment_count).unwrap_or(0),
            body: self.body,
            excerpt: self.excerpt,
            password: self.password,
            terms,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TermRow {
    taxonomy: String,
    slug: String,
    name: String,
    parent: Option<String>,
    count: i64,
}

/// Content repository backed by PostgreSQL.
pub struct PgContentRepository {
    pool: PgPool,
    /// Cache: taxonomy -> terms with counts, expiring on a short TTL
    term_cache: TermCache,
}

impl PgContentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            term_cache: TermCache::default(),
        }
    }

    /// Begin a read transaction with a statement timeout.
    async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to begin transaction")?;

        sqlx::query("SET LOCAL statement_timeout = '10s'")
            .execute(&mut *tx)
            .await
            .context("failed to set statement timeout")?;

        Ok(tx)
    }

    /// Terms of one taxonomy with published-item counts, ordered by name.
    async fn load_taxonomy_terms(&self, taxonomy: &str) -> Result<Vec<Term>> {
        let rows: Vec<TermRow> = sqlx::query_as(
            "SELECT t.taxonomy, t.slug, t.name, t.parent, \
                    COUNT(ci.id) AS count \
             FROM taxonomy_term t \
             LEFT JOIN content_item_term cit \
                    ON cit.taxonomy = t.taxonomy AND cit.slug = t.slug \
             LEFT JOIN content_item ci \
                    ON ci.id = cit.item_id AND ci.status = 'publish' \
             WHERE t.taxonomy = $1 \
             GROUP BY t.taxonomy, t.slug, t.name, t.parent \
             ORDER BY t.name, t.slug",
        )
        .bind(taxonomy)
        .fetch_all(&self.pool)
        .await
        .context("failed to load taxonomy terms")?;

        Ok(rows
            .into_iter()
            .map(|row| Term {
                taxonomy: row.taxonomy,
                slug: row.slug,
                name: row.name,
                parent: row.parent,
                count: u64::try_from(row.count).unwrap_or(0),
            })
            .collect())
    }

    /// Term assignments for a batch of items.
    async fn load_terms(
        tx: &mut Transaction<'static, Postgres>,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, BTreeMap<String, Vec<String>>>> {
        let mut map: HashMap<Uuid, BTreeMap<String, Vec<String>>> = HashMap::new();
        if ids.is_empty() {
            return Ok(map);
        }

        let rows: Vec<(Uuid, String, String)> = sqlx::query_as(
            "SELECT item_id, taxonomy, slug FROM content_item_term \
             WHERE item_id = ANY($1) ORDER BY taxonomy, slug",
        )
        .bind(ids)
        .fetch_all(&mut **tx)
        .await
        .context("failed to load item terms")?;

        for (item_id, taxonomy, slug) in rows {
            map.entry(item_id)
                .or_default()
                .entry(taxonomy)
                .or_default()
                .push(slug);
        }
        Ok(map)
    }
}

#[async_trait]
impl ContentRepository for PgContentRepository {
    async fn query_content(&self, query: &Query) -> Result<ContentPage> {
        let builder = ContentQueryBuilder::new(query);
        let mut tx = self.begin().await?;

        let count_sql = builder.build_count();
        let total: i64 = sqlx::query_scalar(&count_sql)
            .fetch_one(&mut *tx)
            .await
            .context("failed to execute count query")?;
        let total = u64::try_from(total).unwrap_or(0);

        let window = query.window.unwrap_or(PageWindow {
            page: 1,
            per_page: u32::try_from(total).unwrap_or(u32::MAX).max(1),
        });

        let main_sql = builder.build(window);
        let rows: Vec<ItemRow> = sqlx::query_as(&main_sql)
            .fetch_all(&mut *tx)
            .await
            .context("failed to execute content query")?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut terms = Self::load_terms(&mut tx, &ids).await?;

        tx.commit()
            .await
            .context("failed to commit query transaction")?;

        let items = rows
            .into_iter()
            .map(|row| {
                let item_terms = terms.remove(&row.id).unwrap_or_default();
                row.into_item(item_terms)
            })
            .collect();

        Ok(ContentPage::new(items, total, window.per_page))
    }

    async fn query_identifiers_only(&self, query: &Query) -> Result<Vec<ItemId>> {
        let sql = ContentQueryBuilder::new(query).build_ids();
        let mut tx = self.begin().await?;

        let ids: Vec<Uuid> = sqlx::query_scalar(&sql)
            .fetch_all(&mut *tx)
            .await
            .context("failed to execute identifier query")?;

        tx.commit()
            .await
            .context("failed to commit query transaction")?;
        Ok(ids)
    }

    async fn pinned_identifiers(&self) -> Result<Vec<ItemId>> {
        // Pins are read fresh on every call so unpinning takes effect at once.
        let ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT item_id FROM pinned_item ORDER BY weight, item_id")
                .fetch_all(&self.pool)
                .await
                .context("failed to load pinned items")?;
        Ok(ids)
    }

    async fn taxonomy_terms(&self, taxonomy: &str) -> Result<Vec<Term>> {
        self.term_cache
            .get_or_load(taxonomy, || self.load_taxonomy_terms(taxonomy))
            .await
    }

    async fn item_thumbnail(&self, item_id: ItemId, size_key: &str) -> Result<Option<Thumbnail>> {
        let row: Option<(String, i32, i32)> = sqlx::query_as(
            "SELECT url, width, height FROM content_item_thumbnail \
             WHERE item_id = $1 AND size_key = $2",
        )
        .bind(item_id)
        .bind(size_key)
        .fetch_optional(&self.pool)
        .await
        .context("failed to load item thumbnail")?;

        Ok(row.map(|(url, width, height)| Thumbnail {
            url,
            width: u32::try_from(width).unwrap_or(0),
            height: u32::try_from(height).unwrap_or(0),
        }))
    }

    async fn healthy(&self) -> bool {
        crate::db::check_health(&self.pool).await
    }
}

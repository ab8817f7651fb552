//! Short-lived cache of taxonomy term lists.
//!
//! Term counts change whenever content is published elsewhere, and this
//! service never sees those writes. Entries therefore expire on a short
//! TTL.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use moka::future::Cache;
use tracing::debug;

use super::model::Term;

/// Default lifetime of a cached term list (60 seconds).
const TERM_CACHE_TTL: Duration = Duration::from_secs(60);

/// Maximum number of cached taxonomies.
const TERM_CACHE_CAPACITY: u64 = 1_000;

/// Term lists keyed by taxonomy.
#[derive(Clone)]
pub struct TermCache {
    local: Cache<String, Vec<Term>>,
}

impl TermCache {
    pub fn new(ttl: Duration) -> Self {
        let local = Cache::builder()
            .max_capacity(TERM_CACHE_CAPACITY)
            .time_to_live(ttl)
            .build();
        Self { local }
    }

    /// Cached terms for `taxonomy`, or the result of `load` on a miss.
    ///
    /// Load failures are returned and not cached.
    pub async fn get_or_load<F, Fut>(&self, taxonomy: &str, load: F) -> Result<Vec<Term>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Term>>>,
    {
        if let Some(terms) = self.local.get(taxonomy).await {
            debug!(taxonomy = %taxonomy, "term cache hit");
            return Ok(terms);
        }

        let terms = load().await?;
        self.local
            .insert(taxonomy.to_string(), terms.clone())
            .await;
        Ok(terms)
    }
}

impl Default for TermCache {
    fn default() -> Self {
        Self::new(TERM_CACHE_TTL)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;

    use parking_lot::RwLock;

    use super::*;

    fn term(slug: &str) -> Term {
        Term {
            taxonomy: "category".to_string(),
            slug: slug.to_string(),
            name: slug.to_string(),
            parent: None,
            count: 1,
        }
    }

    fn slugs(terms: &[Term]) -> Vec<&str> {
        terms.iter().map(|t| t.slug.as_str()).collect()
    }

    async fn lookup(cache: &TermCache, store: &Arc<RwLock<Vec<Term>>>) -> Vec<Term> {
        let store = store.clone();
        cache
            .get_or_load("category", || async move { Ok(store.read().clone()) })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn term_added_after_first_lookup_appears_once_expired() {
        let cache = TermCache::new(Duration::from_millis(50));
        let store = Arc::new(RwLock::new(vec![term("news")]));

        assert_eq!(slugs(&lookup(&cache, &store).await), vec!["news"]);

        store.write().push(term("events"));
        assert_eq!(slugs(&lookup(&cache, &store).await), vec!["news"]);

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(slugs(&lookup(&cache, &store).await), vec!["news", "events"]);
    }

    #[tokio::test]
    async fn failed_load_is_not_cached() {
        let cache = TermCache::default();
        let failed = cache
            .get_or_load("category", || async { Err(anyhow::anyhow!("database down")) })
            .await;
        assert!(failed.is_err());

        let store = Arc::new(RwLock::new(vec![term("news")]));
        assert_eq!(slugs(&lookup(&cache, &store).await), vec!["news"]);
    }
}

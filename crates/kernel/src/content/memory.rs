//! In-memory content repository.
//!
//! No persistence. Used by tests and local demos; behaves like the
//! PostgreSQL repository for every query shape the pipeline produces.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::{Result, bail};
use async_trait::async_trait;
use parking_lot::RwLock;
use rand::seq::SliceRandom;

use super::model::{ContentItem, ContentPage, ItemId, ItemStatus, Term, Thumbnail};
use super::repository::ContentRepository;
use crate::multifilter::{Query, Relation, SortOrder, TermPredicate};

/// Process-local content store.
#[derive(Default)]
pub struct InMemoryRepository {
    items: RwLock<Vec<ContentItem>>,
    /// Terms keyed by taxonomy.
    terms: RwLock<BTreeMap<String, Vec<Term>>>,
    pinned: RwLock<Vec<ItemId>>,
    thumbnails: RwLock<HashMap<(ItemId, String), Thumbnail>>,
    /// Content and identifier queries executed so far.
    queries: AtomicUsize,
    /// Simulated outage: every call fails while set.
    failing: AtomicBool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an item.
    pub fn insert_item(&self, item: ContentItem) {
        let mut items = self.items.write();
        items.retain(|existing| existing.id != item.id);
        items.push(item);
    }

    /// Add or replace a term.
    pub fn insert_term(&self, term: Term) {
        let mut terms = self.terms.write();
        let list = terms.entry(term.taxonomy.clone()).or_default();
        list.retain(|existing| existing.slug != term.slug);
        list.push(term);
    }

    /// Pin an item; pins keep insertion order.
    pub fn pin(&self, id: ItemId) {
        let mut pinned = self.pinned.write();
        if !pinned.contains(&id) {
            pinned.push(id);
        }
    }

    /// Store an image rendition for an item.
    pub fn set_thumbnail(&self, id: ItemId, size_key: &str, thumbnail: Thumbnail) {
        self.thumbnails
            .write()
            .insert((id, size_key.to_string()), thumbnail);
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of content and identifier queries executed.
    pub fn queries_executed(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("content repository unavailable");
        }
        Ok(())
    }

    /// Every match for `query`, sorted, before windowing.
    fn matching(&self, query: &Query) -> Vec<ContentItem> {
        let terms = self.terms.read();
        let expanded: Vec<(&TermPredicate, HashSet<String>)> = query
            .taxonomy
            .predicates
            .iter()
            .map(|predicate| (predicate, expand_predicate(predicate, &terms)))
            .collect();

        let include: Option<HashSet<ItemId>> =
            query.include.as_ref().map(|ids| ids.iter().copied().collect());
        let search_words: Vec<String> = query
            .search
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_lowercase).collect())
            .unwrap_or_default();

        let mut matches: Vec<ContentItem> = self
            .items
            .read()
            .iter()
            .filter(|item| item.item_type == query.content_type && item.status == query.status)
            .filter(|item| include.as_ref().is_none_or(|ids| ids.contains(&item.id)))
            .filter(|item| !query.exclude.contains(&item.id))
            .filter(|item| matches_taxonomy(item, query.taxonomy.relation, &expanded))
            .filter(|item| matches_search(item, &search_words))
            .cloned()
            .collect();

        match (query.sort, query.include.as_ref()) {
            (SortOrder::AsListed, Some(order)) => {
                let position: HashMap<ItemId, usize> =
                    order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
                matches.sort_by_key(|item| position.get(&item.id).copied().unwrap_or(usize::MAX));
            }
            (SortOrder::Random, _) => matches.shuffle(&mut rand::thread_rng()),
            _ => matches.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id))),
        }

        matches
    }
}

/// Slugs matched by a predicate, descendants included when requested.
fn expand_predicate(predicate: &TermPredicate, terms: &BTreeMap<String, Vec<Term>>) -> HashSet<String> {
    let mut slugs: HashSet<String> = predicate.slugs.iter().cloned().collect();
    if !predicate.include_descendants {
        return slugs;
    }
    let Some(taxonomy_terms) = terms.get(&predicate.taxonomy) else {
        return slugs;
    };

    let mut frontier: Vec<String> = slugs.iter().cloned().collect();
    while let Some(parent) = frontier.pop() {
        for child in taxonomy_terms
            .iter()
            .filter(|t| t.parent.as_deref() == Some(parent.as_str()))
        {
            if slugs.insert(child.slug.clone()) {
                frontier.push(child.slug.clone());
            }
        }
    }
    slugs
}

fn matches_taxonomy(
    item: &ContentItem,
    relation: Relation,
    predicates: &[(&TermPredicate, HashSet<String>)],
) -> bool {
    if predicates.is_empty() {
        return true;
    }
    let hit = |(predicate, slugs): &(&TermPredicate, HashSet<String>)| {
        item.terms_in(&predicate.taxonomy)
            .iter()
            .any(|slug| slugs.contains(slug))
    };
    match relation {
        Relation::And => predicates.iter().all(hit),
        Relation::Or => predicates.iter().any(hit),
    }
}

/// Every search word must appear in the title, excerpt, or body.
fn matches_search(item: &ContentItem, words: &[String]) -> bool {
    if words.is_empty() {
        return true;
    }
    let haystack = format!(
        "{} {} {}",
        item.title,
        item.excerpt.as_deref().unwrap_or_default(),
        item.body
    )
    .to_lowercase();
    words.iter().all(|word| haystack.contains(word.as_str()))
}

#[async_trait]
impl ContentRepository for InMemoryRepository {
    async fn query_content(&self, query: &Query) -> Result<ContentPage> {
        self.check_available()?;
        self.queries.fetch_add(1, Ordering::SeqCst);

        let matches = self.matching(query);
        let total = matches.len() as u64;

        match query.window {
            Some(window) => {
                let items = matches
                    .into_iter()
                    .skip(window.offset() as usize)
                    .take(window.per_page as usize)
                    .collect();
                Ok(ContentPage::new(items, total, window.per_page))
            }
            None => Ok(ContentPage {
                items: matches,
                total,
                total_pages: u32::from(total > 0),
            }),
        }
    }

    async fn query_identifiers_only(&self, query: &Query) -> Result<Vec<ItemId>> {
        self.check_available()?;
        self.queries.fetch_add(1, Ordering::SeqCst);

        let ids = self.matching(query).into_iter().map(|item| item.id);
        Ok(match query.window {
            Some(window) => ids
                .skip(window.offset() as usize)
                .take(window.per_page as usize)
                .collect(),
            None => ids.collect(),
        })
    }

    async fn pinned_identifiers(&self) -> Result<Vec<ItemId>> {
        self.check_available()?;
        Ok(self.pinned.read().clone())
    }

    async fn taxonomy_terms(&self, taxonomy: &str) -> Result<Vec<Term>> {
        self.check_available()?;

        let items = self.items.read();
        let mut terms: Vec<Term> = self
            .terms
            .read()
            .get(taxonomy)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|mut term| {
                term.count = items
                    .iter()
                    .filter(|item| item.status == ItemStatus::Publish)
                    .filter(|item| item.terms_in(taxonomy).contains(&term.slug))
                    .count() as u64;
                term
            })
            .collect();
        terms.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.slug.cmp(&b.slug)));
        Ok(terms)
    }

    async fn item_thumbnail(&self, item_id: ItemId, size_key: &str) -> Result<Option<Thumbnail>> {
        self.check_available()?;
        Ok(self
            .thumbnails
            .read()
            .get(&(item_id, size_key.to_string()))
            .cloned())
    }

    async fn healthy(&self) -> bool {
        !self.failing.load(Ordering::SeqCst)
    }
}

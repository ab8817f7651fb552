//! Multifilter request handling.
//!
//! Ties the pipeline together: normalize, compile, execute, render. Every
//! failure resolves here; callers always get HTML (or nothing, for a
//! rejected follow-up).

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

use anyhow::{Context, Result};

use super::compiler::compile;
use super::executor::QueryExecutor;
use super::filter_ui::render_filter_ui;
use super::html::escape;
use super::normalizer::{RawConfig, RequestContext, normalize};
use super::renderer::{NO_RESULTS, RenderAssets, Renderer};
use super::types::{MetaField, QuerySpec, ResultPage};
use crate::content::{ContentRepository, Term};
use crate::form::NonceService;

/// Action every listing nonce is bound to.
pub const NONCE_ACTION: &str = "multifilter-nonce";

/// Loading indicator shown by the client while a follow-up is in flight.
const NOW_LOADING: &str =
    r#"<div class="multifilter-now-loading"><div class="uil-ripple-css"><div></div><div></div></div></div>"#;

/// Renders filtered listings and answers AJAX follow-ups.
pub struct MultifilterService {
    repository: Arc<dyn ContentRepository>,
    executor: QueryExecutor,
    renderer: Renderer,
    nonces: NonceService,
    /// Target of the search form.
    search_action: String,
}

impl MultifilterService {
    pub fn new(
        repository: Arc<dyn ContentRepository>,
        renderer: Renderer,
        nonces: NonceService,
        search_action: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            executor: QueryExecutor::new(repository.clone()),
            repository,
            renderer,
            nonces,
            search_action: search_action.into(),
        })
    }

    /// Normalize raw configuration, attaching a fresh nonce.
    pub fn normalize(&self, raw: &RawConfig, ctx: &RequestContext) -> QuerySpec {
        normalize(raw, ctx, self.nonces.create(NONCE_ACTION))
    }

    /// Full container: state attribute, optional filter UI, listing, and
    /// loading indicator.
    pub async fn render_initial(&self, raw: &RawConfig, ctx: &RequestContext) -> Result<String> {
        let spec = self.normalize(raw, ctx);
        let state = serde_json::to_string(&spec).context("failed to serialize listing state")?;

        let mut out = String::from("<div ");
        if let Some(id) = &spec.container_id {
            let _ = write!(out, r#"id="{}" "#, escape(id));
        }
        out.push_str(r#"class="multifilter-container"#);
        for class in &spec.container_classes {
            out.push(' ');
            out.push_str(&escape(class));
        }
        let _ = write!(out, r#"" data-ajax="{}">"#, escape(&state));

        if spec.shows_filter_ui() {
            let taxonomies = self.filter_taxonomies(&spec).await;
            out.push_str(&render_filter_ui(&spec, &taxonomies, &self.search_action));
        }

        out.push_str(&self.render_listing(&spec).await);
        out.push_str(NOW_LOADING);
        out.push_str("</div>");

        tracing::debug!(
            post_type = %spec.post_type,
            page = spec.page,
            "rendered multifilter container"
        );
        Ok(out)
    }

    /// Item fragment for a follow-up request.
    ///
    /// `state` is the JSON echoed from `data-ajax`. Returns `None`, without
    /// touching the repository, when it does not parse or its nonce fails.
    /// Only the page is taken from the request; every other setting comes
    /// from the echoed state.
    pub async fn render_follow_up(&self, state: &str, paged: Option<u32>) -> Option<String> {
        let spec: QuerySpec = match serde_json::from_str(state) {
            Ok(spec) => spec,
            Err(e) => {
                tracing::warn!(error = %e, "rejecting follow-up with malformed state");
                return None;
            }
        };

        if !self.nonces.verify(&spec.token, NONCE_ACTION) {
            tracing::warn!("rejecting follow-up with invalid nonce");
            return None;
        }

        let page = paged.filter(|p| *p > 0).unwrap_or(1);
        let spec = spec.with_page(page).enforce_invariants();
        Some(self.render_listing(&spec).await)
    }

    /// Run the pipeline for one spec and render the result.
    async fn render_listing(&self, spec: &QuerySpec) -> String {
        let query = compile(spec);
        let page = match self.executor.execute(&query).await {
            Ok(page) => page,
            Err(e) => {
                tracing::error!(error = %e, post_type = %spec.post_type, "multifilter query failed");
                return NO_RESULTS.to_string();
            }
        };
        tracing::debug!(
            page = page.page,
            total_pages = page.total_pages,
            items = ?page.item_ids(),
            "rendering multifilter page"
        );
        let assets = self.load_assets(spec, &page).await;
        self.renderer.render_page(spec, &page, &assets)
    }

    /// Thumbnails and term names needed to render `page`.
    ///
    /// Lookup failures degrade to placeholders and slugs.
    async fn load_assets(&self, spec: &QuerySpec, page: &ResultPage) -> RenderAssets {
        let mut assets = RenderAssets::default();

        if spec.layout.position(0).is_some() {
            let size_key = spec.thumbnail_size();
            for item in page.items.iter().filter(|i| !i.password_required()) {
                match self.repository.item_thumbnail(item.id, size_key).await {
                    Ok(Some(thumbnail)) => {
                        assets.thumbnails.insert(item.id, thumbnail);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, item_id = %item.id, "thumbnail lookup failed");
                    }
                }
            }
        }

        if spec.metas.contains(&MetaField::Taxonomy) {
            for taxonomy in &spec.meta_taxonomies {
                match self.repository.taxonomy_terms(taxonomy).await {
                    Ok(terms) => {
                        let names: HashMap<String, String> =
                            terms.into_iter().map(|t| (t.slug, t.name)).collect();
                        assets.term_names.insert(taxonomy.clone(), names);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, taxonomy = %taxonomy, "term lookup failed");
                    }
                }
            }
        }

        assets
    }

    /// Terms for each selected taxonomy, in selector order.
    async fn filter_taxonomies(&self, spec: &QuerySpec) -> Vec<(String, Vec<Term>)> {
        let mut taxonomies = Vec::with_capacity(spec.selectors.len());
        for selector in &spec.selectors {
            match self.repository.taxonomy_terms(&selector.taxonomy).await {
                Ok(terms) => taxonomies.push((selector.taxonomy.clone(), terms)),
                Err(e) => {
                    tracing::warn!(error = %e, taxonomy = %selector.taxonomy, "term lookup failed");
                }
            }
        }
        taxonomies
    }

    /// Whether the content store is reachable.
    pub async fn healthy(&self) -> bool {
        self.repository.healthy().await
    }
}

#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Tests drive the REAL kernel router and listing service over an
//! in-memory content repository, so no database is needed.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

use multifilter_kernel::content::{ContentItem, InMemoryRepository, ItemId, ItemStatus, Term};
use multifilter_kernel::form::NonceService;
use multifilter_kernel::multifilter::{MultifilterService, Renderer};
use multifilter_kernel::state::AppState;

/// Key used for every test nonce.
pub const TEST_SECRET: &str = "0123456789abcdef0123";

/// Test application wrapper using the REAL kernel routes and state.
pub struct TestApp {
    router: Router,
    pub repository: Arc<InMemoryRepository>,
    pub service: Arc<MultifilterService>,
}

impl TestApp {
    /// Create a test application over an empty repository.
    pub fn new() -> Self {
        Self::with_repository(Arc::new(InMemoryRepository::new()))
    }

    /// Create a test application over `repository`.
    pub fn with_repository(repository: Arc<InMemoryRepository>) -> Self {
        let nonces = NonceService::new(TEST_SECRET, 86_400).expect("nonce service");
        let service = MultifilterService::new(
            repository.clone(),
            Renderer::default(),
            nonces,
            "http://localhost:3000/",
        );
        let router = multifilter_kernel::app(AppState::from_service(service.clone()));
        Self {
            router,
            repository,
            service,
        }
    }

    /// Send a request and return the raw response.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// GET `uri`, returning status and body.
    pub async fn get(&self, uri: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = self.request(request).await;
        let status = response.status();
        (status, body_string(response).await)
    }

    /// POST a follow-up form, returning status and body.
    pub async fn follow_up(&self, state: &str, paged: Option<&str>) -> (StatusCode, String) {
        let mut form = format!("json={}", urlencoding::encode(state));
        if let Some(paged) = paged {
            form.push_str(&format!("&paged={}", urlencoding::encode(paged)));
        }
        let request = Request::builder()
            .method("POST")
            .uri("/multifilter/ajax")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .unwrap();
        let response = self.request(request).await;
        let status = response.status();
        (status, body_string(response).await)
    }

    /// POST a raw body to the follow-up endpoint with `content_type`.
    pub async fn post_follow_up_body(&self, body: &str, content_type: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("POST")
            .uri("/multifilter/ajax")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = self.request(request).await;
        let status = response.status();
        (status, body_string(response).await)
    }
}

/// Collect a response body as UTF-8.
pub async fn body_string(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// A published post. Higher `n` means older, so "Item 1" sorts first.
pub fn post(n: u32) -> ContentItem {
    ContentItem {
        id: Uuid::now_v7(),
        item_type: "post".to_string(),
        title: format!("Item {n}"),
        permalink: format!("/item-{n}/"),
        status: ItemStatus::Publish,
        author: "Editor".to_string(),
        created: 1_700_000_000 - i64::from(n) * 3_600,
        changed: 1_700_000_000 - i64::from(n) * 3_600,
        comment_count: 0,
        body: format!("<p>Body of item {n}.</p>"),
        excerpt: None,
        password: None,
        terms: BTreeMap::new(),
    }
}

/// A post tagged with `slug` in `taxonomy`.
pub fn post_in(n: u32, taxonomy: &str, slug: &str) -> ContentItem {
    let mut item = post(n);
    item.terms
        .insert(taxonomy.to_string(), vec![slug.to_string()]);
    item
}

/// A top-level term.
pub fn term(taxonomy: &str, slug: &str, name: &str) -> Term {
    Term {
        taxonomy: taxonomy.to_string(),
        slug: slug.to_string(),
        name: name.to_string(),
        parent: None,
        count: 0,
    }
}

/// Repository holding `count` posts; returns their ids, newest first.
pub fn seeded_repository(count: u32) -> (Arc<InMemoryRepository>, Vec<ItemId>) {
    let repository = Arc::new(InMemoryRepository::new());
    let mut ids = Vec::new();
    for n in 1..=count {
        let item = post(n);
        ids.push(item.id);
        repository.insert_item(item);
    }
    (repository, ids)
}

/// Extract and unescape the `data-ajax` state from a container.
pub fn ajax_state(html: &str) -> String {
    let start = html.find(r#"data-ajax=""#).expect("data-ajax attribute") + r#"data-ajax=""#.len();
    let end = start + html[start..].find('"').expect("closing quote");
    html[start..end]
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Number of rendered items.
pub fn article_count(html: &str) -> usize {
    html.matches("<article").count()
}

//! Multifilter listing routes.
//!
//! The listing is configured through query arguments; every argument except
//! `page` and `s` is listing configuration and is carried on pagination links.

use crate::error::{AppError, AppResult};
use crate::multifilter::{RawConfig, RequestContext};
use crate::state::AppState;
use axum::{
    Form, Router,
    extract::{Path, Query, State, rejection::FormRejection},
    response::Html,
    routing::{get, post},
};
use serde::Deserialize;

/// Base path of the listing page; pagination links extend it.
const LISTING_PATH: &str = "/multifilter/";

/// Create the multifilter router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/multifilter", get(render_listing))
        .route("/multifilter/", get(render_listing))
        .route("/multifilter/page/{page}", get(render_listing_page))
        .route("/multifilter/page/{page}/", get(render_listing_page))
        .route("/multifilter/ajax", post(follow_up))
}

// -------------------------------------------------------------------------
// Request types
// -------------------------------------------------------------------------

/// AJAX follow-up form body.
#[derive(Debug, Deserialize)]
struct FollowUpForm {
    /// Listing state echoed from the container's `data-ajax` attribute.
    json: String,
    /// Requested page; missing, empty, or zero means page 1.
    #[serde(default)]
    paged: Option<String>,
}

// -------------------------------------------------------------------------
// Handlers
// -------------------------------------------------------------------------

/// Render the full listing container.
async fn render_listing(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> AppResult<Html<String>> {
    render(&state, params, None).await
}

/// Render the listing container at a page taken from the path.
async fn render_listing_page(
    State(state): State<AppState>,
    Path(page): Path<u32>,
    Query(params): Query<Vec<(String, String)>>,
) -> AppResult<Html<String>> {
    if page == 0 {
        return Err(AppError::BadRequest("page must be at least 1".to_string()));
    }
    render(&state, params, Some(page)).await
}

/// Answer an AJAX follow-up with the item fragment.
///
/// A rejected request, including one whose body is not a valid follow-up
/// form, gets an empty 200 response and no details.
async fn follow_up(
    State(state): State<AppState>,
    form: Result<Form<FollowUpForm>, FormRejection>,
) -> Html<String> {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "rejecting follow-up with unreadable form");
            return Html(String::new());
        }
    };

    let paged = form.paged.as_deref().and_then(|p| p.trim().parse::<u32>().ok());
    let fragment = state
        .multifilter()
        .render_follow_up(&form.json, paged)
        .await
        .unwrap_or_default();
    Html(fragment)
}

async fn render(
    state: &AppState,
    params: Vec<(String, String)>,
    path_page: Option<u32>,
) -> AppResult<Html<String>> {
    let (raw, ctx) = request_parts(params, path_page);
    let html = state.multifilter().render_initial(&raw, &ctx).await?;
    Ok(Html(html))
}

/// Split query arguments into listing configuration and request context.
fn request_parts(params: Vec<(String, String)>, path_page: Option<u32>) -> (RawConfig, RequestContext) {
    let mut ctx = RequestContext {
        paged: path_page,
        permalink: LISTING_PATH.to_string(),
        ..Default::default()
    };
    let mut config = Vec::new();

    for (key, value) in params {
        match key.as_str() {
            "page" => {
                if ctx.paged.is_none() {
                    ctx.paged = value.trim().parse().ok();
                }
            }
            "s" => {
                let search = value.trim();
                if !search.is_empty() {
                    ctx.search = Some(search.to_string());
                }
            }
            _ => config.push((key, value)),
        }
    }

    ctx.link_args = config.clone();
    (config.into_iter().collect(), ctx)
}

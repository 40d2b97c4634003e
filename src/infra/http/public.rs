use std::{
    num::NonZeroU32,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use futures::{TryStreamExt, stream};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
    application::{
        error::{AppError, HttpError},
        site::{LoadMoreLinks, SiteGenerator},
    },
    domain::posts::post_href,
    infra::{
        assets,
        cache::{Lookup, PageCache},
    },
    presentation::views::{render_error_response, render_not_found_response},
};

use super::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub site: Arc<SiteGenerator>,
    pub cache: PageCache,
}

impl HttpState {
    pub fn new(site: Arc<SiteGenerator>, cache: PageCache) -> Self {
        Self { site, cache }
    }
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/post/{uid}", get(post_detail))
        .route("/posts/more", get(more_posts))
        .route("/static/{*path}", get(assets::serve_public))
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

/// Renders the index and every enumerated article into the page cache.
/// Returns how many pages were cached.
pub async fn prerender(state: &HttpState, concurrency: NonZeroU32) -> Result<usize, AppError> {
    let index = state.site.index(LoadMoreLinks::Live).await?;
    state.cache.put("/", index).await;

    let uids = state.site.paths().paths().await?;
    let cached = Arc::new(AtomicUsize::new(1));
    let limit = usize::try_from(concurrency.get()).unwrap_or(usize::MAX);

    stream::iter(uids.into_iter().map(Ok::<String, AppError>))
        .try_for_each_concurrent(Some(limit), |uid| {
            let cached = Arc::clone(&cached);
            async move {
                if let Some(html) = state.site.article_page(&uid).await? {
                    state.cache.put(post_href(&uid), html).await;
                    cached.fetch_add(1, Ordering::Relaxed);
                }
                Ok(())
            }
        })
        .await?;

    let cached = cached.load(Ordering::Relaxed);
    info!(
        target = "spacetraveling::http::prerender",
        pages = cached,
        "Page cache warmed"
    );
    Ok(cached)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Page {
    Index,
    Post(String),
}

impl Page {
    fn path(&self) -> String {
        match self {
            Page::Index => "/".to_string(),
            Page::Post(uid) => post_href(uid),
        }
    }

    // The index is a startup snapshot; load-more fetches newer pages live.
    fn revalidates(&self) -> bool {
        matches!(self, Page::Post(_))
    }

    async fn render(&self, site: &SiteGenerator) -> Result<Option<String>, AppError> {
        match self {
            Page::Index => site.index(LoadMoreLinks::Live).await.map(Some),
            Page::Post(uid) => site.article_page(uid).await,
        }
    }
}

async fn index(State(state): State<HttpState>) -> Response {
    serve_page(state, Page::Index).await
}

async fn post_detail(State(state): State<HttpState>, Path(uid): Path<String>) -> Response {
    serve_page(state, Page::Post(uid)).await
}

async fn serve_page(state: HttpState, page: Page) -> Response {
    const SOURCE: &str = "infra::http::public::serve_page";

    let path = page.path();
    match state.cache.get(&path).await {
        Lookup::Fresh(cached) => cached.into_response(),
        Lookup::Stale(cached) => {
            if page.revalidates() {
                spawn_regeneration(&state, page);
            }
            cached.into_response()
        }
        Lookup::Missing => match page.render(&state.site).await {
            Ok(Some(html)) => {
                state.cache.put(path, html.clone()).await;
                html_response(html)
            }
            Ok(None) => render_not_found_response(state.site.chrome().clone()),
            Err(err) => app_error_response(&state, SOURCE, &err),
        },
    }
}

fn spawn_regeneration(state: &HttpState, page: Page) {
    let path = page.path();
    let Some(guard) = state.cache.try_begin_regeneration(&path) else {
        debug!(
            target = "spacetraveling::http::revalidate",
            path = %path,
            "regeneration already in flight"
        );
        return;
    };

    let state = state.clone();
    tokio::spawn(async move {
        let _guard = guard;
        match page.render(&state.site).await {
            Ok(Some(html)) => {
                state.cache.put(path.clone(), html).await;
                debug!(
                    target = "spacetraveling::http::revalidate",
                    path = %path,
                    "page regenerated"
                );
            }
            Ok(None) => {
                state.cache.remove(&path).await;
                info!(
                    target = "spacetraveling::http::revalidate",
                    path = %path,
                    "page no longer exists upstream; evicted"
                );
            }
            Err(err) => warn!(
                target = "spacetraveling::http::revalidate",
                path = %path,
                error = %err,
                "regeneration failed; keeping stale page"
            ),
        }
    });
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CursorQuery {
    cursor: Option<String>,
}

async fn more_posts(State(state): State<HttpState>, Query(query): Query<CursorQuery>) -> Response {
    const SOURCE: &str = "infra::http::public::more_posts";

    let Some(cursor) = query.cursor.filter(|cursor| !cursor.trim().is_empty()) else {
        return HttpError::new(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Missing cursor",
            "missing `cursor` query parameter",
        )
        .into_response();
    };

    match state.site.more_fragment(&cursor).await {
        Ok(html) => {
            let mut response = html_response(html);
            response
                .headers_mut()
                .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
            response
        }
        Err(err) => app_error_response(&state, SOURCE, &err),
    }
}

async fn fallback(State(state): State<HttpState>) -> Response {
    render_not_found_response(state.site.chrome().clone())
}

fn html_response(html: String) -> Response {
    (StatusCode::OK, Html(html)).into_response()
}

fn app_error_response(state: &HttpState, source: &'static str, err: &AppError) -> Response {
    let status = err.status_code();
    if status == StatusCode::NOT_FOUND {
        let mut response = render_not_found_response(state.site.chrome().clone());
        err.report(source).attach(&mut response);
        return response;
    }
    render_error_response(
        state.site.chrome().clone(),
        status,
        err.presentation_message(),
        err.report(source),
    )
}

//! Per-request experiment context for host applications.
//!
//! Mount with `route_layer` so the matched path is known:
//!
//! ```ignore
//! Router::new()
//!     .route("/products/:id", get(product_page))
//!     .route_layer(middleware::from_fn_with_state(state.clone(), experiment_context))
//!     .with_state(state)
//! ```
//!
//! Handlers then read `Extension<ResolvedExperiment>`.

use axum::{
    extract::{MatchedPath, Query, Request, State},
    middleware::Next,
    response::Response,
};
use stickyab::{AnalyticsEvent, HeaderCookieStore};
use std::collections::HashMap;
use std::sync::Arc;

use crate::handlers::AppState;

/// Route name for a matched path: segments joined with `-`, parameter markers
/// dropped, `index` for the root. `/products/:id` becomes `products-id`.
pub fn route_name_from_path(path: &str) -> String {
    let segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_start_matches([':', '*']))
        .filter(|s| !s.is_empty())
        .collect();
    if segments.is_empty() {
        "index".to_string()
    } else {
        segments.join("-")
    }
}

pub async fn experiment_context(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(route) = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| route_name_from_path(p.as_str()))
    else {
        tracing::debug!(path = %request.uri().path(), "no matched path, skipping experiment context");
        return next.run(request).await;
    };

    let config = state.resolver.config();
    let query_override = Query::<HashMap<String, String>>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(mut params)| params.remove(&config.query_param));

    let mut store = HeaderCookieStore::from_headers(request.headers());
    let context = {
        let assignment = state
            .resolver
            .resolve_in(&mut store, query_override.as_deref(), &route);
        if let Some(event) = AnalyticsEvent::from_assignment(&assignment) {
            state.analytics.push(event);
        }
        assignment.context(&config.tag_prefix)
    };
    request.extensions_mut().insert(context);

    let mut response = next.run(request).await;
    store.apply_to(response.headers_mut());
    response
}

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    response::Response,
    Json,
};
use serde::Serialize;
use stickyab::experiments::cookie::is_cookie_name_char;
use stickyab::{AnalyticsEvent, HeaderCookieStore, ResolvedExperiment, StickyabError};
use std::collections::HashMap;
use std::sync::Arc;

use super::{error_response, AppState};

#[derive(Debug, Serialize)]
pub struct AssignmentResponse {
    #[serde(flatten)]
    pub context: ResolvedExperiment,
    pub analytics: Option<AnalyticsEvent>,
}

/// Route names end up in a cookie name, so they must be cookie-safe tokens.
pub(crate) fn check_route_name(route: &str) -> Result<(), StickyabError> {
    if route.is_empty() {
        return Err(StickyabError::InvalidRoute("route name is empty".to_string()));
    }
    if let Some(c) = route.chars().find(|&c| !is_cookie_name_char(c)) {
        return Err(StickyabError::InvalidRoute(format!(
            "'{route}' contains {c:?}, which is not allowed in a cookie name"
        )));
    }
    Ok(())
}

/// Resolve the experiment for `routeName` using the request's query string and
/// cookies. Any cookie write is returned as `Set-Cookie`.
pub async fn route_assignment(
    State(state): State<Arc<AppState>>,
    Path(route_name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if let Err(e) = check_route_name(&route_name) {
        return error_response(e);
    }

    let config = state.resolver.config();
    let mut store = HeaderCookieStore::from_headers(&headers);
    let query_override = params.get(&config.query_param).map(String::as_str);
    let assignment = state
        .resolver
        .resolve_in(&mut store, query_override, &route_name);

    let analytics = AnalyticsEvent::from_assignment(&assignment);
    if let Some(event) = &analytics {
        state.analytics.push(event.clone());
    }

    let body = AssignmentResponse {
        context: assignment.context(&config.tag_prefix),
        analytics,
    };
    let mut response = Json(body).into_response();
    store.apply_to(response.headers_mut());
    response
}

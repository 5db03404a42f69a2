use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use stickyab::{Experiment, StickyabError};
use std::sync::Arc;

use super::{error_response, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListExperimentsQuery {
    #[serde(default)]
    pub route: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListExperimentsResponse<'a> {
    pub experiments: Vec<&'a Experiment>,
    pub count: usize,
}

pub async fn list_experiments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListExperimentsQuery>,
) -> Response {
    let catalog = state.resolver.catalog();
    let experiments: Vec<&Experiment> = match query.route.as_deref() {
        Some(route) => catalog.for_route(route).collect(),
        None => catalog.iter().collect(),
    };
    let count = experiments.len();
    Json(ListExperimentsResponse { experiments, count }).into_response()
}

pub async fn get_experiment(
    State(state): State<Arc<AppState>>,
    Path(experiment_id): Path<String>,
) -> Response {
    match state.resolver.catalog().get_by_id(&experiment_id) {
        Ok(experiment) => Json(experiment).into_response(),
        Err(e) => error_response(StickyabError::from(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{body_json, get, home_catalog, make_state};
    use axum::http::StatusCode;
    use axum::routing::get as get_route;
    use axum::Router;
    use stickyab::{Catalog, Variant};
    use tower::ServiceExt;

    fn app(catalog: Catalog) -> Router {
        let (state, _) = make_state(catalog);
        Router::new()
            .route("/1/experiments", get_route(list_experiments))
            .route("/1/experiments/:experimentID", get_route(get_experiment))
            .with_state(state)
    }

    fn two_route_catalog() -> Catalog {
        let btn = Experiment::new("btn", "E1")
            .on_route("home")
            .with_variants(vec![Variant::new(1.0)]);
        let cart = Experiment::new("cart", "E3")
            .on_route("checkout")
            .with_variants(vec![Variant::new(1.0)]);
        Catalog::new(vec![btn, cart]).unwrap()
    }

    // ── list ──

    #[tokio::test]
    async fn list_returns_whole_catalog() {
        let resp = app(two_route_catalog())
            .oneshot(get("/1/experiments"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["count"], 2);
        assert_eq!(json["experiments"][0]["experimentID"], "E1");
        assert_eq!(json["experiments"][1]["routeNames"], serde_json::json!(["checkout"]));
    }

    #[tokio::test]
    async fn list_filters_by_route() {
        let resp = app(two_route_catalog())
            .oneshot(get("/1/experiments?route=checkout"))
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["count"], 1);
        assert_eq!(json["experiments"][0]["name"], "cart");
    }

    #[tokio::test]
    async fn list_unknown_route_is_empty() {
        let resp = app(two_route_catalog())
            .oneshot(get("/1/experiments?route=about"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["count"], 0);
    }

    // ── get ──

    #[tokio::test]
    async fn get_returns_experiment() {
        let resp = app(home_catalog())
            .oneshot(get("/1/experiments/E2"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["name"], "hero");
        assert_eq!(json["sections"], 2);
        assert_eq!(json["variants"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn get_unknown_is_404() {
        let resp = app(home_catalog())
            .oneshot(get("/1/experiments/E9"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = body_json(resp).await;
        assert!(json["message"].as_str().unwrap().contains("E9"));
    }
}

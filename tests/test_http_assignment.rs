mod common;

use axum::{
    http::{header::SET_COOKIE, StatusCode},
    middleware,
    routing::get,
    Extension, Json, Router,
};
use serde_json::json;
use stickyab::ResolvedExperiment;
use stickyab_http::middleware::experiment_context;
use tower::ServiceExt;

fn set_cookies(resp: &axum::response::Response) -> Vec<String> {
    resp.headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

// ── /1/routes/:routeName/assignment ──

#[tokio::test]
async fn assignment_round_trip_through_cookie() {
    let (app, data_layer) = common::app();

    let resp = app
        .clone()
        .oneshot(common::request("/1/routes/landing/assignment", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cookies = set_cookies(&resp);
    assert_eq!(cookies.len(), 1);
    let pair = cookies[0].split(';').next().unwrap().to_string();
    assert!(pair.starts_with("exp-landing=E2."));

    let first = common::body_json(resp).await;
    assert_eq!(first["name"], "hero");
    assert_eq!(first["variantIndexes"].as_array().unwrap().len(), 2);

    let resp = app
        .oneshot(common::request("/1/routes/landing/assignment", Some(&pair)))
        .await
        .unwrap();
    assert!(set_cookies(&resp).is_empty());
    let second = common::body_json(resp).await;
    assert_eq!(second["variantIndexes"], first["variantIndexes"]);
    assert_eq!(second["classificationTags"], first["classificationTags"]);

    assert_eq!(data_layer.events().len(), 2);
}

#[tokio::test]
async fn override_wins_over_cookie() {
    let (app, data_layer) = common::app();
    let resp = app
        .oneshot(common::request(
            "/1/routes/home/assignment?experiment=x-btn-0",
            Some("exp-home=E1.1"),
        ))
        .await
        .unwrap();
    assert!(set_cookies(&resp)[0].starts_with("exp-home=E1.0"));
    let body = common::body_json(resp).await;
    assert_eq!(body["activeVariants"][0]["label"], "Buy");
    assert_eq!(body["analytics"], json!({"expId": "E1", "expVar": "0"}));
    assert_eq!(data_layer.drain().len(), 1);
}

#[tokio::test]
async fn cookies_for_other_routes_are_left_alone() {
    let (app, _) = common::app();
    let resp = app
        .oneshot(common::request(
            "/1/routes/checkout/assignment",
            Some("exp-home=E1.1; exp-landing=E2.0-1"),
        ))
        .await
        .unwrap();
    let cookies = set_cookies(&resp);
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].starts_with("exp-checkout=E3.0"));
    assert!(cookies[0].contains("Max-Age=3600"));
}

#[tokio::test]
async fn listing_and_lookup() {
    let (app, _) = common::app();
    let resp = app
        .clone()
        .oneshot(common::request("/1/experiments?route=home", None))
        .await
        .unwrap();
    let body = common::body_json(resp).await;
    assert_eq!(body["count"], 2);

    let resp = app
        .oneshot(common::request("/1/experiments/E3", None))
        .await
        .unwrap();
    let body = common::body_json(resp).await;
    assert_eq!(body["maxAge"], 3600);
    assert_eq!(body["variants"][0]["layout"], "compact");
}

// ── experiment_context middleware ──

async fn landing_page(Extension(ctx): Extension<ResolvedExperiment>) -> Json<serde_json::Value> {
    Json(json!({
        "classes": ctx.classification_tags.join(" "),
        "images": ctx
            .active_variants
            .iter()
            .map(|v| v.payload["img"].clone())
            .collect::<Vec<_>>(),
    }))
}

#[tokio::test]
async fn host_page_receives_context() {
    let (state, data_layer) = common::make_state();
    let app = Router::new()
        .route("/landing", get(landing_page))
        .route_layer(middleware::from_fn_with_state(state.clone(), experiment_context))
        .with_state(state);

    let resp = app
        .oneshot(common::request("/landing", Some("exp-landing=E2.2-0")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(set_cookies(&resp).is_empty());

    let body = common::body_json(resp).await;
    assert_eq!(body["classes"], "hero-2 hero-0");
    assert_eq!(body["images"], json!(["c.png", "a.png"]));
    assert_eq!(data_layer.events()[0].exp_var, "2-0");
}

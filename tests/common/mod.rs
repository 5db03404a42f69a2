use axum::{body::Body, http::Request, Router};
use std::sync::Arc;
use stickyab::{Catalog, DataLayer, Eligibility, ExperimentResolver, ResolverConfig};
use stickyab_http::handlers::AppState;

/// Catalog used across integration tests:
/// - `btn` (E1) on `home`, two variants
/// - `hero` (E2) on `home` and `landing`, three variants shown two at a time,
///   only eligible on `landing`
/// - `cart` (E3) on `checkout`, one variant, cookie kept for an hour
pub const CATALOG_JSON: &str = r#"{
  "experiments": [
    {
      "name": "btn",
      "experimentID": "E1",
      "routeNames": ["home"],
      "variants": [{"label": "Buy"}, {"label": "Purchase"}]
    },
    {
      "name": "hero",
      "experimentID": "E2",
      "routeNames": ["home", "landing"],
      "weight": 3,
      "sections": 2,
      "variants": [{"img": "a.png"}, {"img": "b.png"}, {"img": "c.png", "weight": 2}]
    },
    {
      "name": "cart",
      "experimentID": "E3",
      "routeNames": ["checkout"],
      "maxAge": 3600,
      "variants": [{"layout": "compact"}]
    }
  ]
}"#;

#[allow(dead_code)]
pub fn catalog() -> Catalog {
    let mut experiments: Vec<_> = Catalog::from_json_str(CATALOG_JSON)
        .unwrap()
        .iter()
        .cloned()
        .collect();
    for experiment in experiments.iter_mut().filter(|e| e.name == "hero") {
        experiment.is_eligible = Some(Eligibility::new(|route| route == "landing"));
    }
    Catalog::new(experiments).unwrap()
}

#[allow(dead_code)]
pub fn make_state() -> (Arc<AppState>, Arc<DataLayer>) {
    let data_layer = Arc::new(DataLayer::new());
    let resolver = ExperimentResolver::new(Arc::new(catalog()), ResolverConfig::default());
    (Arc::new(AppState::new(resolver, data_layer.clone())), data_layer)
}

#[allow(dead_code)]
pub fn app() -> (Router, Arc<DataLayer>) {
    let (state, data_layer) = make_state();
    (stickyab_http::build_router(state), data_layer)
}

#[allow(dead_code)]
pub fn request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

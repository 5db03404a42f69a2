use axum::{routing::get, Router};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::handlers::{get_experiment, health, list_experiments, route_assignment, AppState};
use stickyab::{Catalog, ExperimentResolver, ResolverConfig, StickyabError, TracingSink};

pub const DEFAULT_CATALOG_PATH: &str = "./experiments.json";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:7800";

pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/1/experiments", get(list_experiments))
        .route("/1/experiments/:experimentID", get(get_experiment))
        .route("/1/routes/:routeName/assignment", get(route_assignment))
        .with_state(state.clone());

    let health_route = Router::new()
        .route("/health", get(health))
        .with_state(state);

    Router::new()
        .merge(health_route)
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive().max_age(std::time::Duration::from_secs(86400)))
}

/// Load and validate the catalog named by `STICKYAB_CATALOG`.
pub fn load_catalog_from_env() -> Result<(PathBuf, Catalog), StickyabError> {
    let path = PathBuf::from(
        std::env::var("STICKYAB_CATALOG").unwrap_or_else(|_| DEFAULT_CATALOG_PATH.to_string()),
    );
    let catalog = Catalog::load(&path)?;
    Ok((path, catalog))
}

pub async fn serve() -> Result<(), Box<dyn std::error::Error>> {
    let startup_start = std::time::Instant::now();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ResolverConfig::from_env()?;
    tracing::info!(
        default_max_age_secs = config.default_max_age_secs,
        query_param = %config.query_param,
        cookie_prefix = %config.cookie_prefix,
        "Resolver configuration loaded"
    );

    let (catalog_path, catalog) = load_catalog_from_env()?;
    let experiment_count = catalog.len();
    if catalog.is_empty() {
        tracing::warn!(path = %catalog_path.display(), "Catalog is empty, every visitor resolves to no experiment");
    }

    let resolver = ExperimentResolver::new(Arc::new(catalog), config);
    let state = Arc::new(AppState::new(resolver, Arc::new(TracingSink)));
    let app = build_router(state);

    let bind_addr =
        std::env::var("STICKYAB_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    let local_addr = listener.local_addr()?.to_string();

    print_startup_banner(
        &local_addr,
        &catalog_path.display().to_string(),
        experiment_count,
        startup_start.elapsed().as_millis(),
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

fn print_startup_banner(bind_addr: &str, catalog_path: &str, experiments: usize, startup_ms: u128) {
    use colored::Colorize;

    let url = format!("http://{}", bind_addr);
    let version = format!("v{}", env!("CARGO_PKG_VERSION"));
    let timing = format!("ready in {}ms", startup_ms);

    println!();
    println!(
        "  {} {}  {}",
        "stickyab".bold().bright_green(),
        version.as_str().dimmed(),
        timing.as_str().dimmed(),
    );
    println!();
    println!("  {}  Local:       {}", "➜".green(), url.as_str().cyan());
    let assignment = format!("{}/1/routes/<route>/assignment", url);
    println!("  {}  Assignment:  {}", "➜".green(), assignment.as_str().cyan());
    println!(
        "  {}  Catalog:     {} ({} experiments)",
        "➜".green(),
        catalog_path.cyan(),
        experiments
    );
    println!();
}

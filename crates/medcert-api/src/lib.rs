//! medcert-api
//!
//! HTTP service generating homologation declarations and keeping the
//! patient/doctor registry used for autocomplete.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::middleware as axum_mw;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use medcert_export::Generator;
use medcert_storage::Store;
use medcert_storage::memory::MemoryStore;
use medcert_storage::sqlite::SqliteStore;

use crate::config::ServiceConfig;
use crate::state::AppState;

/// Local frontend dev servers.
pub const DEV_ORIGINS: [&str; 3] = [
    "http://localhost:3000",
    "http://localhost:3001",
    "http://localhost:5173",
];

/// Open the configured store and build the generator.
pub fn build_state(config: &ServiceConfig) -> eyre::Result<AppState> {
    let (store, store_source): (Arc<dyn Store>, String) = match config.database_path() {
        Some(path) => {
            let store = SqliteStore::open(&path)?;
            (Arc::new(store), path.display().to_string())
        }
        None => {
            tracing::warn!("using in-memory store, records are lost on exit");
            (Arc::new(MemoryStore::new()), config::MEMORY_DATABASE.to_string())
        }
    };

    let generator = Generator::new(config.export.clone())?;

    Ok(AppState {
        store,
        generator: Arc::new(generator),
        backup_dir: config.backup_dir(),
        store_source,
    })
}

pub fn cors_layer(frontend_url: Option<&str>) -> CorsLayer {
    let origins: Vec<HeaderValue> = DEV_ORIGINS
        .into_iter()
        .chain(frontend_url)
        .filter_map(|origin| match HeaderValue::from_str(origin.trim_end_matches('/')) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn app(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(routes::status::root))
        .route("/api/health", get(routes::status::health))
        .route("/api/patients", get(routes::search::search_patients))
        .route("/api/doctors", get(routes::search::search_doctors))
        .route(
            "/api/generate-document",
            post(routes::documents::generate_document),
        )
        .route("/api/template", get(routes::documents::inspect_template))
        .route("/api/backup", post(routes::backup::create_backup))
        .layer(
            ServiceBuilder::new()
                .layer(cors)
                .layer(axum_mw::from_fn(middleware::audit::request_log)),
        )
        .with_state(state)
}

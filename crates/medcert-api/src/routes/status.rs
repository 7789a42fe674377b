use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct ServiceStatus {
    pub name: &'static str,
    pub version: &'static str,
    pub status: &'static str,
}

pub async fn root() -> Json<ServiceStatus> {
    Json(ServiceStatus {
        name: "medcert",
        version: env!("CARGO_PKG_VERSION"),
        status: "online",
    })
}

#[derive(Serialize)]
pub struct DatabaseCounts {
    pub patients: usize,
    pub doctors: usize,
}

#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub timestamp: jiff::Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Always 200; a broken store shows up as `unhealthy` in the body.
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    let timestamp = jiff::Timestamp::now();
    match state.with_store(|store| store.stats()).await {
        Ok(stats) => Json(Health {
            status: "healthy",
            timestamp,
            database: Some(DatabaseCounts {
                patients: stats.patients,
                doctors: stats.doctors,
            }),
            error: None,
        }),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            Json(Health {
                status: "unhealthy",
                timestamp,
                database: None,
                error: Some(e.to_string()),
            })
        }
    }
}

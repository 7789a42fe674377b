use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;

use medcert_core::models::doctor::Doctor;
use medcert_core::models::patient::Patient;
use medcert_storage::DEFAULT_SEARCH_LIMIT;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub search: String,
}

/// Patient autocomplete.
pub async fn search_patients(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    let found = state
        .with_store(move |store| store.search_patients(&params.search, DEFAULT_SEARCH_LIMIT))
        .await?;
    Ok(Json(found))
}

/// Doctor autocomplete.
pub async fn search_doctors(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Doctor>>, ApiError> {
    let found = state
        .with_store(move |store| store.search_doctors(&params.search, DEFAULT_SEARCH_LIMIT))
        .await?;
    Ok(Json(found))
}

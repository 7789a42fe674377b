use std::path::PathBuf;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use medcert_storage::backup::Backup;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct BackupCreated {
    pub path: PathBuf,
    pub patients: usize,
    pub doctors: usize,
    pub certificates: usize,
}

/// Snapshot the store into the backup directory.
pub async fn create_backup(State(state): State<AppState>) -> Result<Json<BackupCreated>, ApiError> {
    let dir = state.backup_dir.clone();
    let source = state.store_source.clone();
    let created = state
        .with_store(move |store| {
            let backup = Backup::snapshot(store, source)?;
            let path = backup.write_to_dir(&dir)?;
            Ok(BackupCreated {
                path,
                patients: backup.patients.len(),
                doctors: backup.doctors.len(),
                certificates: backup.certificates.len(),
            })
        })
        .await?;

    tracing::info!(path = %created.path.display(), "backup created");
    Ok(Json(created))
}

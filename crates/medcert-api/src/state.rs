use std::path::PathBuf;
use std::sync::Arc;

use medcert_export::Generator;
use medcert_storage::Store;

use crate::error::ApiError;

/// Shared application state, injected into all route handlers via Axum state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub generator: Arc<Generator>,
    pub backup_dir: PathBuf,
    /// Recorded in backups as their origin.
    pub store_source: String,
}

impl AppState {
    /// Run a synchronous store operation off the async workers.
    pub async fn with_store<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Store) -> Result<T, medcert_storage::StorageError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let result = tokio::task::spawn_blocking(move || f(store.as_ref())).await?;
        Ok(result?)
    }
}

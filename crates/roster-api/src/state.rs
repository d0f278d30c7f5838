use std::sync::Arc;

use tracing::error;

use roster_db::Database;

use crate::error::AppError;
use crate::storage::ArtifactStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub artifacts: ArtifactStore,
    pub jwt_secret: String,
    pub max_upload_bytes: usize,
}

/// Run blocking store work off the async runtime.
pub async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&AppStateInner) -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            AppError::Internal("worker task failed".into())
        })?
}

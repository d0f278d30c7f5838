use axum::{
    Extension, Json,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use tracing::{error, info};

use roster_db::{Database, NewAssignment};
use roster_types::api::UploadQuery;
use roster_types::{Assignment, Principal};

use crate::access::{owned_classroom, visible_assignment, visible_classroom};
use crate::error::AppError;
use crate::extractors::{AppPath, AppQuery, UploadBody};
use crate::middleware::Caller;
use crate::state::{AppState, blocking};
use crate::storage::sanitize_filename;

pub fn list_classroom_assignments(
    db: &Database,
    caller: &impl Principal,
    classroom_id: i64,
) -> Result<Vec<Assignment>, AppError> {
    let class = visible_classroom(db, caller, classroom_id)?;
    Ok(db.list_assignments(class.id)?)
}

/// Store an uploaded artifact and record it against a classroom the caller
/// owns. Ownership is checked before anything is written.
pub async fn upload_assignment(
    state: &AppState,
    caller: Caller,
    classroom_id: i64,
    filename: &str,
    data: Bytes,
) -> Result<Assignment, AppError> {
    let who = caller.clone();
    blocking(state, move |s| owned_classroom(&s.db, &who, classroom_id)).await?;

    let filename = sanitize_filename(filename)
        .ok_or_else(|| AppError::Validation("filename is empty or invalid".into()))?;
    if data.is_empty() {
        return Err(AppError::Validation("upload body is empty".into()));
    }
    if data.len() > state.max_upload_bytes {
        return Err(AppError::PayloadTooLarge(state.max_upload_bytes));
    }

    // Detached: the write and the insert finish together even if the client goes away.
    let assignment = tokio::spawn(persist_upload(state.clone(), classroom_id, filename, data))
        .await
        .map_err(|e| {
            error!("upload task failed: {}", e);
            AppError::Internal("upload task failed".into())
        })??;

    info!(
        assignment_id = assignment.id,
        classroom_id,
        teacher_id = caller.id,
        "uploaded {} ({} bytes)",
        assignment.filename,
        assignment.size
    );
    Ok(assignment)
}

/// Write the blob, then its row. A failed insert removes the blob again.
async fn persist_upload(
    state: AppState,
    classroom_id: i64,
    filename: String,
    data: Bytes,
) -> Result<Assignment, AppError> {
    let stored = state.artifacts.put(&data).await.map_err(|e| {
        error!("Failed to write artifact: {}", e);
        AppError::Internal("artifact write failed".into())
    })?;

    let new = NewAssignment {
        classroom_id,
        filename,
        artifact_key: stored.key.clone(),
        size: stored.size,
        sha256: stored.sha256,
    };
    let inserted = blocking(&state, move |s| Ok(s.db.create_assignment(&new)?)).await;
    if inserted.is_err() {
        if let Err(cleanup) = state.artifacts.delete(&stored.key).await {
            error!("Failed to remove orphaned artifact {}: {}", stored.key, cleanup);
        }
    }
    inserted
}

/// Fetch an artifact's bytes for a caller who can see its classroom.
pub async fn download_artifact(
    state: &AppState,
    caller: Caller,
    assignment_id: i64,
) -> Result<(Assignment, Vec<u8>), AppError> {
    let assignment = blocking(state, move |s| visible_assignment(&s.db, &caller, assignment_id)).await?;

    let bytes = state.artifacts.read(&assignment.artifact_key).await.map_err(|e| {
        error!("Failed to read artifact {}: {}", assignment.artifact_key, e);
        AppError::NotFound("artifact".into())
    })?;
    Ok((assignment, bytes))
}

// -- Handlers --

pub async fn list(
    State(state): State<AppState>,
    AppPath(classroom_id): AppPath<i64>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<Assignment>>, AppError> {
    let rows = blocking(&state, move |s| list_classroom_assignments(&s.db, &caller, classroom_id)).await?;
    Ok(Json(rows))
}

/// POST /classrooms/{id}/assignments?filename=hw1.pdf with the raw file as body.
pub async fn upload(
    State(state): State<AppState>,
    AppPath(classroom_id): AppPath<i64>,
    AppQuery(query): AppQuery<UploadQuery>,
    Extension(caller): Extension<Caller>,
    UploadBody(body): UploadBody,
) -> Result<impl IntoResponse, AppError> {
    let assignment = upload_assignment(&state, caller, classroom_id, &query.filename, body).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

pub async fn download(
    State(state): State<AppState>,
    AppPath(assignment_id): AppPath<i64>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, AppError> {
    let (assignment, bytes) = download_artifact(&state, caller, assignment_id).await?;
    let disposition = format!("attachment; filename=\"{}\"", assignment.filename);

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use roster_types::{Role, User};
    use uuid::Uuid;

    use super::*;
    use crate::state::AppStateInner;
    use crate::storage::ArtifactStore;

    async fn state_in(dir: PathBuf) -> AppState {
        Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            artifacts: ArtifactStore::new(dir).await.unwrap(),
            jwt_secret: "test-secret".into(),
            max_upload_bytes: 64,
        })
    }

    fn as_caller(user: &User) -> Caller {
        Caller {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
            token_id: Uuid::new_v4().to_string(),
            expires_at: usize::MAX,
        }
    }

    fn blob_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn failed_insert_leaves_no_blob_behind() {
        let dir = std::env::temp_dir().join(format!("roster-upload-{}", Uuid::new_v4()));
        let state = state_in(dir.clone()).await;

        let err = persist_upload(state.clone(), 999, "hw1.pdf".into(), Bytes::from_static(b"data"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(blob_count(&dir), 0);

        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn upload_stores_one_blob_per_assignment() {
        let dir = std::env::temp_dir().join(format!("roster-upload-{}", Uuid::new_v4()));
        let state = state_in(dir.clone()).await;
        let teacher = state.db.create_user("teacher", "h", Role::Teacher).unwrap();
        let class = state.db.create_classroom(teacher.id, "Algebra").unwrap();

        let hw = upload_assignment(&state, as_caller(&teacher), class.id, "hw1.pdf", Bytes::from_static(b"data"))
            .await
            .unwrap();
        assert_eq!(hw.size, 4);
        assert_eq!(blob_count(&dir), 1);

        let too_big = Bytes::from(vec![0u8; 65]);
        assert!(matches!(
            upload_assignment(&state, as_caller(&teacher), class.id, "big.bin", too_big).await,
            Err(AppError::PayloadTooLarge(64))
        ));
        assert_eq!(blob_count(&dir), 1);

        std::fs::remove_dir_all(dir).ok();
    }
}

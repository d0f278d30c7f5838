pub mod access;
pub mod assignments;
pub mod attendance;
pub mod auth;
pub mod classrooms;
pub mod dashboard;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod state;
pub mod storage;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use serde_json::{Value, json};

pub use error::AppError;
pub use state::{AppState, AppStateInner};

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Full HTTP surface. Everything except register, login and health needs a
/// bearer token.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/health", get(health));

    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/dashboard", get(dashboard::dashboard))
        .route("/classrooms", get(classrooms::list).post(classrooms::create))
        .route("/classrooms/join", post(classrooms::join))
        .route("/classrooms/{classroom_id}/students", get(classrooms::students))
        .route(
            "/classrooms/{classroom_id}/assignments",
            get(assignments::list)
                .post(assignments::upload)
                .layer(DefaultBodyLimit::max(state.max_upload_bytes)),
        )
        .route("/assignments/{assignment_id}/artifact", get(assignments::download))
        .route(
            "/classrooms/{classroom_id}/attendance",
            get(attendance::list).put(attendance::record),
        )
        .route("/classrooms/{classroom_id}/attendance/me", get(attendance::mine))
        .layer(from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

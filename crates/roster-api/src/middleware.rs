use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use roster_types::{Principal, Role};
use roster_types::api::Claims;

use crate::auth::verify_token;
use crate::error::AppError;
use crate::state::{AppState, blocking};

/// Identity of the authenticated caller, attached to each protected request.
/// Adapts token claims to the `Principal` capability.
#[derive(Debug, Clone)]
pub struct Caller {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub token_id: String,
    pub expires_at: usize,
}

impl From<Claims> for Caller {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.uid,
            username: claims.sub,
            role: claims.role,
            token_id: claims.jti,
            expires_at: claims.exp,
        }
    }
}

impl Principal for Caller {
    fn id(&self) -> i64 {
        self.id
    }

    fn role(&self) -> Role {
        self.role
    }
}

/// Extract and validate the JWT from the Authorization header. Tokens
/// revoked by logout are rejected like expired ones.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthenticated)?;

    let claims = verify_token(&state.jwt_secret, token)?;

    let jti = claims.jti.clone();
    if blocking(&state, move |s| Ok(s.db.is_token_revoked(&jti)?)).await? {
        return Err(AppError::Unauthenticated);
    }

    req.extensions_mut().insert(Caller::from(claims));
    Ok(next.run(req).await)
}

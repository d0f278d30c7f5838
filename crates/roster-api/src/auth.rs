use std::sync::OnceLock;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{info, warn};

use roster_db::Database;
use roster_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};
use roster_types::{Role, User};

use crate::error::AppError;
use crate::extractors::AppJson;
use crate::middleware::Caller;
use crate::state::{AppState, blocking};

const TOKEN_TTL_DAYS: i64 = 30;

// -- Credential store --

fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Hash checked against when the username is unknown, so both failure paths
/// do the same Argon2 work.
fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| hash_password("roster-dummy-password").unwrap_or_default())
}

/// Create an account. Only a salted Argon2id hash of the password is stored.
pub fn register_user(db: &Database, username: &str, password: &str, role: &str) -> Result<User, AppError> {
    let username = username.trim();
    if username.len() < 3 || username.len() > 32 {
        return Err(AppError::Validation("username must be 3-32 characters".into()));
    }
    if password.len() < 8 {
        return Err(AppError::Validation("password must be at least 8 characters".into()));
    }
    let role = role
        .parse::<Role>()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    if db.get_user_by_username(username)?.is_some() {
        return Err(AppError::DuplicateUsername);
    }

    let hash = hash_password(password)?;
    let user = db.create_user(username, &hash, role)?;
    info!(user_id = user.id, role = %user.role, "registered {}", user.username);
    Ok(user)
}

/// Verify a username/password pair. Never reveals which half was wrong.
pub fn authenticate(db: &Database, username: &str, password: &str) -> Result<User, AppError> {
    match db.get_user_by_username(username.trim())? {
        Some(row) if verify_password(password, &row.password_hash) => Ok(row.into_user()),
        Some(_) => Err(AppError::InvalidCredentials),
        None => {
            verify_password(password, dummy_hash());
            Err(AppError::InvalidCredentials)
        }
    }
}

// -- Tokens --

pub fn issue_token(secret: &str, user: &User) -> Result<String, AppError> {
    let claims = Claims {
        sub: user.username.clone(),
        uid: user.id,
        role: user.role,
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
        jti: uuid::Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token encoding failed: {}", e)))
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthenticated)
}

/// End the caller's session. Tokens are stateless, so the token id is
/// recorded as revoked until it would have expired anyway.
pub fn logout_session(db: &Database, caller: &Caller) -> Result<(), AppError> {
    let now = chrono::Utc::now().timestamp();
    db.revoke_token(&caller.token_id, caller.expires_at as i64, now)?;
    info!(user_id = caller.id, "logged out {}", caller.username);
    Ok(())
}

fn auth_response(secret: &str, user: User) -> Result<AuthResponse, AppError> {
    let token = issue_token(secret, &user)?;
    Ok(AuthResponse {
        user_id: user.id,
        username: user.username,
        role: user.role,
        token,
    })
}

// -- Handlers --

pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = blocking(&state, move |s| {
        let user = register_user(&s.db, &req.username, &req.password, &req.role)?;
        auth_response(&s.jwt_secret, user)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = blocking(&state, move |s| {
        let user = authenticate(&s.db, &req.username, &req.password).inspect_err(|_| {
            warn!("failed login attempt for {}", req.username);
        })?;
        auth_response(&s.jwt_secret, user)
    })
    .await?;

    Ok(Json(response))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<StatusCode, AppError> {
    blocking(&state, move |s| logout_session(&s.db, &caller)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn register_stores_hash_not_password() {
        let db = Database::open_in_memory().unwrap();
        let user = register_user(&db, "ada", "correct horse", "teacher").unwrap();
        assert_eq!(user.role, Role::Teacher);

        let row = db.get_user_by_username("ada").unwrap().unwrap();
        assert_ne!(row.password_hash, "correct horse");
        assert!(row.password_hash.starts_with("$argon2"));
    }

    #[test]
    fn register_rejects_bad_input() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            register_user(&db, "ab", "long enough", "student"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            register_user(&db, "alice", "short", "student"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            register_user(&db, "alice", "long enough", "admin"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("same password").unwrap();
        let b = hash_password("same password").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("same password", &a));
        assert!(verify_password("same password", &b));
    }

    #[test]
    fn logout_revokes_only_that_token() {
        let db = Database::open_in_memory().unwrap();
        let user = register_user(&db, "ada", "password1", "student").unwrap();
        let first = Caller::from(verify_token(SECRET, &issue_token(SECRET, &user).unwrap()).unwrap());
        let second = Caller::from(verify_token(SECRET, &issue_token(SECRET, &user).unwrap()).unwrap());

        logout_session(&db, &first).unwrap();
        assert!(db.is_token_revoked(&first.token_id).unwrap());
        assert!(!db.is_token_revoked(&second.token_id).unwrap());
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        register_user(&db, "ada", "password1", "teacher").unwrap();
        assert!(matches!(
            register_user(&db, "ada", "password2", "student"),
            Err(AppError::DuplicateUsername)
        ));
    }

    #[test]
    fn authenticate_does_not_reveal_which_part_failed() {
        let db = Database::open_in_memory().unwrap();
        register_user(&db, "ada", "password1", "student").unwrap();

        let ok = authenticate(&db, "ada", "password1").unwrap();
        assert_eq!(ok.username, "ada");

        let wrong_password = authenticate(&db, "ada", "password2").unwrap_err();
        let unknown_user = authenticate(&db, "nobody", "password1").unwrap_err();
        assert!(matches!(wrong_password, AppError::InvalidCredentials));
        assert!(matches!(unknown_user, AppError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[test]
    fn token_round_trip_carries_identity() {
        let db = Database::open_in_memory().unwrap();
        let user = register_user(&db, "ada", "password1", "teacher").unwrap();

        let token = issue_token(SECRET, &user).unwrap();
        let claims = verify_token(SECRET, &token).unwrap();
        assert_eq!(claims.uid, user.id);
        assert_eq!(claims.sub, "ada");
        assert_eq!(claims.role, Role::Teacher);

        let again = verify_token(SECRET, &issue_token(SECRET, &user).unwrap()).unwrap();
        assert_ne!(claims.jti, again.jti);

        assert!(matches!(
            verify_token("other-secret", &token),
            Err(AppError::Unauthenticated)
        ));
        assert!(matches!(verify_token(SECRET, "garbage"), Err(AppError::Unauthenticated)));
    }
}

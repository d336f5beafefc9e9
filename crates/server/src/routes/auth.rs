use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse},
    Json,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    app::AppState,
    db::models::{Role, User},
    error::{AppError, Result},
    middleware::auth::SessionUser,
};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub email: String,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Session token claims. `sid` points at a `sessions` row; the token is
/// worthless once that row is deleted.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sid: String,
    pub exp: usize,
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| AppError::Internal("Failed to hash password".to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn create_session_token(session_id: &str, secret: &str) -> Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(chrono::Duration::days(7))
        .ok_or_else(|| AppError::Internal("Invalid expiry timestamp".to_string()))?
        .timestamp() as usize;

    let claims = Claims {
        sid: session_id.to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AppError::Internal("Failed to create session token".to_string()))
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<UserResponse>> {
    if body.email.is_empty() || !body.email.contains('@') {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }
    if body.username.trim().is_empty() {
        return Err(AppError::Validation("Username is required".to_string()));
    }
    if body.password.len() < 6 {
        return Err(AppError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let password_hash = hash_password(&body.password)?;

    // Uniqueness of email and username is left to the database; a
    // constraint violation surfaces as a 409.
    let mut tx = state.db.pool.begin().await?;
    sqlx::query("INSERT INTO users (email, username, password_hash, role) VALUES (?, ?, ?, ?)")
        .bind(&body.email)
        .bind(&body.username)
        .bind(&password_hash)
        .bind(body.role)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    // No session is created on registration; the user logs in next.
    Ok(Json(UserResponse {
        email: body.email,
        username: body.username,
        role: body.role,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    // One generic failure for unknown email and bad password alike, so
    // the endpoint cannot be used to enumerate accounts.
    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

    let user = sqlx::query_as::<_, User>(
        "SELECT email, username, password_hash, role FROM users WHERE email = ?",
    )
    .bind(&body.email)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or_else(invalid)?;

    if !verify_password(&body.password, &user.password_hash)? {
        return Err(invalid());
    }

    let session_id = Uuid::new_v4().to_string();
    let mut tx = state.db.pool.begin().await?;
    sqlx::query("INSERT INTO sessions (id, user_email, role, created_at) VALUES (?, ?, ?, ?)")
        .bind(&session_id)
        .bind(&user.email)
        .bind(user.role)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    let token = create_session_token(&session_id, &state.config.session_secret)?;
    let cookie = format!("session={token}; HttpOnly; Path=/");

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(AuthResponse {
            token,
            user: UserResponse {
                email: user.email,
                username: user.username,
                role: user.role,
            },
        }),
    ))
}

pub async fn logout(State(state): State<AppState>, user: SessionUser) -> Result<impl IntoResponse> {
    // Idempotent: deleting an already-removed session is still a success.
    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(&user.session_id)
        .execute(&state.db.pool)
        .await?;

    let cookie = "session=; HttpOnly; Path=/; Max-Age=0".to_string();
    Ok((AppendHeaders([(SET_COOKIE, cookie)]), Json(())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_never_stores_plaintext() {
        let hash = hash_password("alicepw").unwrap();
        assert_ne!(hash, "alicepw");
        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn verify_accepts_only_the_right_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }
}

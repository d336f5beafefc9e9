use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{
    app::AppState,
    db::models::{Role, Session},
    error::{AppError, Result},
    routes::auth::Claims,
};

/// Per-request authentication context, resolved from the server-side
/// session row the presented token points at.
#[derive(Clone, Debug)]
pub struct SessionUser {
    pub session_id: String,
    pub email: String,
    pub role: Role,
}

fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        return Some(token.to_string());
    }

    headers
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|cookies| {
            cookies
                .split(';')
                .map(str::trim)
                .find_map(|c| c.strip_prefix("session="))
                .map(str::to_string)
        })
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = extract_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    let token_data = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(state.config.session_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid session token".to_string()))?;

    // The session row is the source of truth; logout removes it, which
    // invalidates any outstanding token immediately.
    let session = sqlx::query_as::<_, Session>(
        "SELECT id, user_email, role, created_at FROM sessions WHERE id = ?",
    )
    .bind(&token_data.claims.sid)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or_else(|| AppError::Unauthorized("Session expired".to_string()))?;

    request.extensions_mut().insert(SessionUser {
        session_id: session.id,
        email: session.user_email,
        role: session.role,
    });

    Ok(next.run(request).await)
}

/// Gate for admin-only operations (project and task creation).
pub fn require_admin(user: &SessionUser) -> Result<()> {
    if user.role.can_create() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Admins only".to_string()))
    }
}

// Extractor for getting the authenticated user from request extensions
#[async_trait]
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<SessionUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

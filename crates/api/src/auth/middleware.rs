//! Bearer-token authentication middleware

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{auth::jwt::JwtError, error::ApiError, state::AppState};

/// Authenticated caller, inserted as a request extension
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// Require a valid Supabase bearer token
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let jwt = state.jwt.as_ref().ok_or_else(|| {
        tracing::warn!("Authenticated route called but SUPABASE_JWT_SECRET is not configured");
        ApiError::ServiceUnavailable
    })?;

    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Unauthorized)?;

    let claims = jwt.validate_supabase_token(token).map_err(|e| {
        match &e {
            JwtError::Validation(detail) => {
                tracing::warn!(error = %detail, "Supabase token validation failed")
            }
            _ => tracing::debug!(error = %e, "Rejected bearer token"),
        }
        ApiError::InvalidToken
    })?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| ApiError::InvalidToken)?;

    request.extensions_mut().insert(AuthUser { user_id });

    Ok(next.run(request).await)
}

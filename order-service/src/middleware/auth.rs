use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::{AppState, models::Role};

/// Caller identity resolved from the bearer token, with the role snapshot
/// currently stored on the user document.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: String,
    pub email: String,
    pub roles: Vec<Role>,
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Requires a valid access token belonging to an active user.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req).ok_or_else(|| {
        AppError::Unauthorized(anyhow::anyhow!("Missing or invalid Authorization header"))
    })?;

    let claims = state.jwt.validate_access_token(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected access token");
        AppError::Unauthorized(anyhow::anyhow!("Invalid or expired token"))
    })?;

    let user = state
        .users
        .find_user(&claims.sub)
        .await
        .map_err(AppError::from)?
        .filter(|user| !user.archived)
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Unknown or archived user")))?;

    req.extensions_mut().insert(Principal {
        user_id: user.id,
        email: user.email,
        roles: user.roles,
    });

    Ok(next.run(req).await)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Principal>().cloned().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!("Principal missing from request extensions"))
        })
    }
}

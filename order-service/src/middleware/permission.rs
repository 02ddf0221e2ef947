use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use metrics::counter;
use service_core::error::AppError;

use super::auth::Principal;
use crate::services::authorize;

/// Checks the caller's roles against the matched route template.
///
/// Runs after `auth_middleware`; must be attached with `route_layer` so the
/// matched path is available.
pub async fn permission_middleware(req: Request, next: Next) -> Result<Response, AppError> {
    let principal = req.extensions().get::<Principal>().ok_or_else(|| {
        AppError::Unauthorized(anyhow::anyhow!("Authentication required"))
    })?;

    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let method = req.method().as_str().to_string();

    if !authorize(&principal.roles, &path, &method) {
        counter!("authz_denied_total").increment(1);
        tracing::warn!(
            user_id = %principal.user_id,
            path = %path,
            method = %method,
            "Permission denied"
        );
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "You do not have permission to access this resource"
        )));
    }

    Ok(next.run(req).await)
}

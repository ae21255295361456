use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::state::AppState;

/// Guards staff-only routes with a shared API key in the `x-api-key` header.
pub async fn require_admin_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get("x-api-key")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::AuthenticationError("Missing API key".to_string()))?;

    if provided != state.admin_api_key {
        return Err(AppError::AuthenticationError("Invalid API key".to_string()));
    }

    Ok(next.run(req).await)
}

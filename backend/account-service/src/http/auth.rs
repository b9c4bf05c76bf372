use super::AppState;
use crate::error::AccountError;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

/// Bearer-token gate. Valid, unrevoked claims are stored as a request
/// extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AccountError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AccountError::Unauthorized)?;

    let claims = state.tokens.validate(token)?;
    if state.accounts.is_session_revoked(&claims).await {
        tracing::debug!(jti = %claims.jti, "Rejected revoked session token");
        return Err(AccountError::Unauthorized);
    }
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

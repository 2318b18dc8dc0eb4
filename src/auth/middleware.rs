use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::AppState;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    pub email_verified: bool,
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;

    let auth_user = authenticate(token, &state.config)?;

    req.extensions_mut().insert(auth_user);
    Ok(next.run(req).await)
}

/// Verify a bearer token and turn its claims into the caller's identity.
/// Shared by the HTTP middleware and the WebSocket handshake.
pub fn authenticate(token: &str, config: &Config) -> AppResult<AuthUser> {
    let token_data = verify_token(token, config)?;

    // Sign-in is refused upstream until the address is verified; enforce the
    // same rule here for tokens minted before verification.
    if config.require_verified_email && !token_data.claims.email_verified {
        return Err(AppError::EmailNotVerified);
    }

    Ok(AuthUser {
        id: token_data.claims.sub,
        email: token_data.claims.email.filter(|e| !e.is_empty()),
        email_verified: token_data.claims.email_verified,
    })
}

//! Session authorization for wallet routes.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::{app_error::AppError, app_state::AppState, services::auth::AuthWallet};

/// Claimed identity header. Never trusted on its own.
pub const WALLET_HEADER: &str = "wallet-address";

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolves the bearer session and attaches `Extension<AuthWallet>`.
pub async fn wallet_authorization(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request)
        .ok_or_else(|| AppError::unauthorized("Missing bearer session token"))?
        .to_string();
    let claimed = match request.headers().get(WALLET_HEADER) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| AppError::unauthorized("Invalid wallet address"))?
                .to_string(),
        ),
        None => None,
    };

    let wallet = state.auth.authenticate(&token, claimed.as_deref()).await?;
    request.extensions_mut().insert(wallet);

    Ok(next.run(request).await)
}

/// Must run after [`wallet_authorization`].
pub async fn admin_authorization(request: Request, next: Next) -> Result<Response, AppError> {
    let is_admin = request
        .extensions()
        .get::<AuthWallet>()
        .is_some_and(|wallet| wallet.is_admin);
    if !is_admin {
        return Err(AppError::unauthorized("Admin access required"));
    }

    Ok(next.run(request).await)
}

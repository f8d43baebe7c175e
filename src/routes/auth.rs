use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, AppJson, StdResponse},
    app_state::AppState,
    services::auth::{ChallengeRes, SessionRes},
    wallet::WalletAddress,
};

/// Defines routes with OpenAPI specs.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/api/auth",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_challenge))
            .routes(utoipa_axum::routes!(verify_challenge)),
    )
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct ChallengeReq {
    wallet_address: WalletAddress,
}

/// Issue a single-use sign-in message for a wallet.
#[utoipa::path(
    post,
    path = "/challenge",
    tags = ["Auth"],
    request_body = ChallengeReq,
    responses(
        (status = 201, description = "Created challenge successfully", body = StdResponse<ChallengeRes, String>)
    )
)]
async fn create_challenge(
    State(state): State<AppState>,
    AppJson(body): AppJson<ChallengeReq>,
) -> Result<impl IntoResponse, AppError> {
    let challenge = state.auth.issue_challenge(body.wallet_address).await?;

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(challenge),
            message: Some("Created challenge successfully"),
        },
    ))
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct VerifyReq {
    wallet_address: WalletAddress,
    nonce: String,
    /// Base58 ed25519 signature of the challenge message.
    signature: String,
}

/// Exchange a signed challenge for a bearer session token.
#[utoipa::path(
    post,
    path = "/verify",
    tags = ["Auth"],
    request_body = VerifyReq,
    responses(
        (status = 200, description = "Signed in successfully", body = StdResponse<SessionRes, String>),
        (status = 401, description = "Unknown, expired or wrongly signed challenge")
    )
)]
async fn verify_challenge(
    State(state): State<AppState>,
    AppJson(body): AppJson<VerifyReq>,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .auth
        .verify(body.wallet_address, &body.nonce, &body.signature)
        .await?;

    Ok(StdResponse {
        data: Some(session),
        message: Some("Signed in successfully"),
    })
}

use axum::{
    Extension,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, AppJson, StdResponse},
    app_state::AppState,
    middleware,
    models::{NftReward, RewardTier},
    services::{auth::AuthWallet, rewards::Eligibility},
};

/// Defines routes with OpenAPI specs.
pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/api/nft-rewards",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_eligibility))
            .routes(utoipa_axum::routes!(mint_reward))
            .routes(utoipa_axum::routes!(get_my_rewards))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::wallet_authorization,
            )),
    )
}

/// Tiers the signed-in wallet can mint now, and progress toward the next one.
#[utoipa::path(
    get,
    path = "/eligibility",
    tags = ["Rewards"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Get eligibility successfully", body = StdResponse<Eligibility, String>)
    )
)]
async fn get_eligibility(
    State(state): State<AppState>,
    Extension(wallet): Extension<AuthWallet>,
) -> Result<impl IntoResponse, AppError> {
    let eligibility = state.rewards.eligibility(&wallet.address).await?;

    Ok(StdResponse {
        data: Some(eligibility),
        message: Some("Get eligibility successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct MintRewardReq {
    tier: RewardTier,
}

/// Mint the reward NFT for a tier the wallet qualifies for.
#[utoipa::path(
    post,
    path = "/mint",
    tags = ["Rewards"],
    security(("bearerAuth" = [])),
    request_body = MintRewardReq,
    responses(
        (status = 201, description = "Minted reward successfully", body = StdResponse<NftReward, String>),
        (status = 400, description = "Not eligible or already claimed")
    )
)]
async fn mint_reward(
    State(state): State<AppState>,
    Extension(wallet): Extension<AuthWallet>,
    AppJson(body): AppJson<MintRewardReq>,
) -> Result<impl IntoResponse, AppError> {
    let reward = state.rewards.mint(&wallet.address, body.tier).await?;

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(reward),
            message: Some("Minted reward successfully"),
        },
    ))
}

/// Every mint attempt of the signed-in wallet, including failed ones.
#[utoipa::path(
    get,
    path = "/user",
    tags = ["Rewards"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List my rewards", body = StdResponse<Vec<NftReward>, String>)
    )
)]
async fn get_my_rewards(
    State(state): State<AppState>,
    Extension(wallet): Extension<AuthWallet>,
) -> Result<impl IntoResponse, AppError> {
    let rewards = state.rewards.rewards_for(&wallet.address).await?;

    Ok(StdResponse {
        data: Some(rewards),
        message: Some("Get my rewards successfully"),
    })
}

use axum::{
    Extension,
    extract::{Path, State},
    response::IntoResponse,
};
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppJson, StdResponse},
    app_state::AppState,
    middleware,
    services::{
        auth::AuthWallet,
        payments::{BalanceRes, ConfirmPaymentReq, ConfirmPaymentRes, PaymentRequestRes},
    },
};

/// Defines routes with OpenAPI specs.
pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/api/payments",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_payment))
            .routes(utoipa_axum::routes!(confirm_payment))
            .routes(utoipa_axum::routes!(get_balance))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::wallet_authorization,
            )),
    )
}

/// Build the unsigned transfer paying for an order.
#[utoipa::path(
    post,
    path = "/orders/{id}",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Order ID to pay for")
    ),
    responses(
        (status = 200, description = "Created payment transaction successfully", body = StdResponse<PaymentRequestRes, String>)
    )
)]
async fn create_payment(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(wallet): Extension<AuthWallet>,
) -> Result<impl IntoResponse, AppError> {
    let payment = state.payments.create_payment(&wallet, id).await?;

    Ok(StdResponse {
        data: Some(payment),
        message: Some("Created payment transaction successfully"),
    })
}

/// Confirm a submitted payment against the ledger and complete the order.
#[utoipa::path(
    post,
    path = "/orders/{id}/confirm",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Order ID the payment settles")
    ),
    request_body = ConfirmPaymentReq,
    responses(
        (status = 200, description = "Confirmed payment successfully", body = StdResponse<ConfirmPaymentRes, String>),
        (status = 400, description = "Ledger reported the transaction as failed")
    )
)]
async fn confirm_payment(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(wallet): Extension<AuthWallet>,
    AppJson(body): AppJson<ConfirmPaymentReq>,
) -> Result<impl IntoResponse, AppError> {
    let confirmed = state
        .payments
        .confirm_payment(&wallet, id, &body.signature)
        .await?;

    Ok(StdResponse {
        data: Some(confirmed),
        message: Some("Confirmed payment successfully"),
    })
}

/// Native balance of the signed-in wallet.
#[utoipa::path(
    get,
    path = "/balance",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Get balance successfully", body = StdResponse<BalanceRes, String>)
    )
)]
async fn get_balance(
    State(state): State<AppState>,
    Extension(wallet): Extension<AuthWallet>,
) -> Result<impl IntoResponse, AppError> {
    let balance = state.payments.balance(&wallet.address).await?;

    Ok(StdResponse {
        data: Some(balance),
        message: Some("Get balance successfully"),
    })
}

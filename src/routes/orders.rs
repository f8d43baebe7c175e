use axum::{
    Extension,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppJson, StdResponse},
    app_state::AppState,
    middleware,
    models::Order,
    services::{
        auth::AuthWallet,
        orders::{CreateOrderReq, UpdateOrderStatusReq},
    },
};

pub const IDEMPOTENCY_HEADER: &str = "idempotency-key";

/// Defines routes with OpenAPI specs.
pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/api/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_order))
            .routes(utoipa_axum::routes!(get_my_orders))
            .routes(utoipa_axum::routes!(get_order))
            .routes(utoipa_axum::routes!(update_order_status))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::wallet_authorization,
            )),
    )
}

/// Place an order for the signed-in wallet. The total is computed server-side.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("Idempotency-Key" = Option<String>, Header, description = "Repeat-safe submission key")
    ),
    request_body = CreateOrderReq,
    responses(
        (status = 201, description = "Created order successfully", body = StdResponse<Order, String>),
        (status = 400, description = "Invalid items or insufficient stock")
    )
)]
async fn create_order(
    State(state): State<AppState>,
    Extension(wallet): Extension<AuthWallet>,
    headers: HeaderMap,
    AppJson(body): AppJson<CreateOrderReq>,
) -> Result<impl IntoResponse, AppError> {
    let idempotency_key = match headers.get(IDEMPOTENCY_HEADER) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| AppError::invalid_field("Idempotency-Key", "Must be visible ASCII"))?
                .to_string(),
        ),
        None => None,
    };

    let order = state
        .orders
        .create(&wallet.address, body, idempotency_key)
        .await?;

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(order),
            message: Some("Created order successfully"),
        },
    ))
}

/// Fetch all orders of the signed-in wallet, newest first.
#[utoipa::path(
    get,
    path = "/user",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List my orders", body = StdResponse<Vec<Order>, String>)
    )
)]
async fn get_my_orders(
    State(state): State<AppState>,
    Extension(wallet): Extension<AuthWallet>,
) -> Result<impl IntoResponse, AppError> {
    let orders = state.orders.list_for(&wallet.address).await?;

    Ok(StdResponse {
        data: Some(orders),
        message: Some("Get my orders successfully"),
    })
}

/// Fetch one order. Owners and admins only.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Order ID to fetch")
    ),
    responses(
        (status = 200, description = "Get order successfully", body = StdResponse<Order, String>),
        (status = 404, description = "Order not found")
    )
)]
async fn get_order(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(wallet): Extension<AuthWallet>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders.get(&wallet, id).await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Get order successfully"),
    })
}

/// Move an order along its lifecycle. Owners may only cancel.
#[utoipa::path(
    patch,
    path = "/{id}/status",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Order ID to update")
    ),
    request_body = UpdateOrderStatusReq,
    responses(
        (status = 200, description = "Updated order status successfully", body = StdResponse<Order, String>),
        (status = 409, description = "Status changed concurrently")
    )
)]
async fn update_order_status(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(wallet): Extension<AuthWallet>,
    AppJson(body): AppJson<UpdateOrderStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders.update_status(&wallet, id, body.status).await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Updated order status successfully"),
    })
}

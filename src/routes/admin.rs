use axum::{extract::State, response::IntoResponse};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware,
    models::{DashboardStats, Order, SupportTicket},
};

/// Defines admin routes. Session auth runs first, then the admin check.
pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/api/admin",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_stats))
            .routes(utoipa_axum::routes!(get_all_orders))
            .routes(utoipa_axum::routes!(get_all_tickets))
            .route_layer(axum::middleware::from_fn(middleware::admin_authorization))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::wallet_authorization,
            )),
    )
}

/// Totals over completed orders and minted rewards.
#[utoipa::path(
    get,
    path = "/stats",
    tags = ["Admin"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Get dashboard stats", body = StdResponse<DashboardStats, String>)
    )
)]
async fn get_stats(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let stats = state.admin.stats().await?;

    Ok(StdResponse {
        data: Some(stats),
        message: Some("Get dashboard stats successfully"),
    })
}

#[utoipa::path(
    get,
    path = "/orders",
    tags = ["Admin"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List all orders", body = StdResponse<Vec<Order>, String>)
    )
)]
async fn get_all_orders(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let orders = state.orders.list_all().await?;

    Ok(StdResponse {
        data: Some(orders),
        message: Some("Get orders successfully"),
    })
}

#[utoipa::path(
    get,
    path = "/support",
    tags = ["Admin"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List all tickets", body = StdResponse<Vec<SupportTicket>, String>)
    )
)]
async fn get_all_tickets(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let tickets = state.support.list_all().await?;

    Ok(StdResponse {
        data: Some(tickets),
        message: Some("Get tickets successfully"),
    })
}

pub mod admin;
pub mod auth;
pub mod health;
pub mod menu;
pub mod orders;
pub mod payments;
pub mod rewards;
pub mod support;

use utoipa_axum::router::OpenApiRouter;

use crate::app_state::AppState;

/// Every route of the service, with its OpenAPI document.
pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    health::routes_with_openapi()
        .merge(auth::routes_with_openapi())
        .merge(menu::routes_with_openapi())
        .merge(orders::routes_with_openapi(state.clone()))
        .merge(payments::routes_with_openapi(state.clone()))
        .merge(rewards::routes_with_openapi(state.clone()))
        .merge(support::routes_with_openapi(state.clone()))
        .merge(admin::routes_with_openapi(state.clone()))
}

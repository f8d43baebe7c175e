use axum::{extract::State, response::IntoResponse};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    models::MenuItem,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/api/menu",
        OpenApiRouter::new().routes(utoipa_axum::routes!(get_menu)),
    )
}

/// Menu items currently on sale.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Menu"],
    responses(
        (status = 200, description = "List menu items", body = StdResponse<Vec<MenuItem>, String>)
    )
)]
async fn get_menu(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let items = state.store.list_menu_items().await?;

    Ok(StdResponse {
        data: Some(items),
        message: Some("Get menu successfully"),
    })
}

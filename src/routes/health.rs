use axum::{Json, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::app_state::AppState;

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(utoipa_axum::routes!(health))
}

#[derive(Serialize, ToSchema)]
struct HealthRes {
    status: String,
}

#[utoipa::path(
    get,
    path = "/health",
    tags = ["Health"],
    responses(
        (status = 200, description = "Service is up", body = HealthRes)
    )
)]
async fn health() -> impl IntoResponse {
    Json(HealthRes {
        status: "ok".to_string(),
    })
}

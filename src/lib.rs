pub mod api;
pub mod app_error;
pub mod app_state;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
pub mod store;
pub mod swagger;
pub mod transfer;
pub mod wallet;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::app_state::AppState;

/// Builds the full HTTP application: API routes, Swagger UI, tracing and CORS.
pub fn app(state: AppState) -> Router {
    let routes = routes::routes_with_openapi(&state);

    let mut openapi = routes.get_openapi().clone();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("Joey's Lemonades API")
        .version("1.0.0")
        .build();
    let swagger_ui = swagger::create_swagger_ui(openapi);

    Router::new()
        .merge(routes)
        .merge(swagger_ui)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

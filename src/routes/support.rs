use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppJson, StdResponse},
    app_state::AppState,
    middleware,
    models::{SupportTicket, TicketComment},
    services::{
        auth::AuthWallet,
        support::{AddCommentReq, CreateTicketReq, UpdateTicketStatusReq},
    },
};

/// Defines routes with OpenAPI specs.
pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/api/support",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_ticket))
            .routes(utoipa_axum::routes!(get_my_tickets))
            .routes(utoipa_axum::routes!(get_ticket))
            .routes(utoipa_axum::routes!(update_ticket_status))
            .routes(utoipa_axum::routes!(add_comment, get_comments))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::wallet_authorization,
            )),
    )
}

/// Open a support ticket, optionally about one of the caller's orders.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Support"],
    security(("bearerAuth" = [])),
    request_body = CreateTicketReq,
    responses(
        (status = 201, description = "Created ticket successfully", body = StdResponse<SupportTicket, String>)
    )
)]
async fn create_ticket(
    State(state): State<AppState>,
    Extension(wallet): Extension<AuthWallet>,
    AppJson(body): AppJson<CreateTicketReq>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = state.support.create(&wallet, body).await?;

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(ticket),
            message: Some("Created ticket successfully"),
        },
    ))
}

#[utoipa::path(
    get,
    path = "/user",
    tags = ["Support"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List my tickets", body = StdResponse<Vec<SupportTicket>, String>)
    )
)]
async fn get_my_tickets(
    State(state): State<AppState>,
    Extension(wallet): Extension<AuthWallet>,
) -> Result<impl IntoResponse, AppError> {
    let tickets = state.support.list_for(&wallet).await?;

    Ok(StdResponse {
        data: Some(tickets),
        message: Some("Get my tickets successfully"),
    })
}

#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Support"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Ticket ID to fetch")
    ),
    responses(
        (status = 200, description = "Get ticket successfully", body = StdResponse<SupportTicket, String>)
    )
)]
async fn get_ticket(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(wallet): Extension<AuthWallet>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = state.support.get(&wallet, id).await?;

    Ok(StdResponse {
        data: Some(ticket),
        message: Some("Get ticket successfully"),
    })
}

/// Set a ticket's status and optional response. Admins only.
#[utoipa::path(
    patch,
    path = "/{id}/status",
    tags = ["Support"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Ticket ID to update")
    ),
    request_body = UpdateTicketStatusReq,
    responses(
        (status = 200, description = "Updated ticket successfully", body = StdResponse<SupportTicket, String>),
        (status = 401, description = "Caller is not an admin")
    )
)]
async fn update_ticket_status(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(wallet): Extension<AuthWallet>,
    AppJson(body): AppJson<UpdateTicketStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = state.support.update_status(&wallet, id, body).await?;

    Ok(StdResponse {
        data: Some(ticket),
        message: Some("Updated ticket successfully"),
    })
}

#[utoipa::path(
    post,
    path = "/{id}/comments",
    tags = ["Support"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Ticket ID to comment on")
    ),
    request_body = AddCommentReq,
    responses(
        (status = 201, description = "Added comment successfully", body = StdResponse<TicketComment, String>)
    )
)]
async fn add_comment(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(wallet): Extension<AuthWallet>,
    AppJson(body): AppJson<AddCommentReq>,
) -> Result<impl IntoResponse, AppError> {
    let comment = state.support.add_comment(&wallet, id, body).await?;

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(comment),
            message: Some("Added comment successfully"),
        },
    ))
}

#[utoipa::path(
    get,
    path = "/{id}/comments",
    tags = ["Support"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Ticket ID")
    ),
    responses(
        (status = 200, description = "List comments", body = StdResponse<Vec<TicketComment>, String>)
    )
)]
async fn get_comments(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(wallet): Extension<AuthWallet>,
) -> Result<impl IntoResponse, AppError> {
    let comments = state.support.comments(&wallet, id).await?;

    Ok(StdResponse {
        data: Some(comments),
        message: Some("Get comments successfully"),
    })
}

//! Grievance-ticket endpoints

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::{created, ok, AppState};
use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::service::NewTicket;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_ticket).get(list_tickets))
        .route("/mine", get(my_tickets))
        .route("/track/:ticket_id", get(track_ticket))
        .route("/:id", get(get_ticket))
        .route("/:id/respond", post(respond))
        .route("/:id/status", patch(set_status))
}

async fn create_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<NewTicket>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let ticket = state.tickets.create(&user, input).await?;
    Ok(created(ticket))
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
struct ListParams {
    status: Option<String>,
    category: Option<String>,
    case_id: Option<String>,
}

async fn list_tickets(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListParams>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let tickets = state
        .tickets
        .list(
            &user,
            params.status.as_deref(),
            params.category.as_deref(),
            params.case_id,
        )
        .await?;
    Ok(ok(tickets))
}

async fn my_tickets(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<(StatusCode, Json<Value>)> {
    let tickets = state.tickets.mine(&user).await?;
    Ok(ok(tickets))
}

async fn track_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<String>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let ticket = state.tickets.track(&ticket_id).await?;
    Ok(ok(ticket))
}

async fn get_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let ticket = state.tickets.get(&user, id).await?;
    Ok(ok(ticket))
}

#[derive(Deserialize)]
struct RespondBody {
    message: String,
}

async fn respond(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<RespondBody>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let ticket = state.tickets.respond(&user, id, &body.message).await?;
    Ok(ok(ticket))
}

#[derive(Deserialize)]
struct SetStatusBody {
    status: String,
}

async fn set_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<SetStatusBody>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let ticket = state.tickets.set_status(&user, id, &body.status).await?;
    Ok(ok(ticket))
}

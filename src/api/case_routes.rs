//! Relief-case endpoints

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::{created, ok, ok_with_message, AppState};
use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::model::QueryType;
use crate::service::{NewCase, SaveDisbursementRequest};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_case).get(list_cases))
        .route("/mine", get(my_cases))
        .route("/track/:case_id", get(track_case))
        .route("/:id", get(get_case))
        .route("/:id/status", patch(set_status))
        .route("/:id/assign", patch(assign_officer))
        .route("/:id/queries", post(raise_query))
        .route("/:id/queries/:idx/respond", patch(respond_to_query))
        .route("/:id/queries/:idx/resolve", patch(resolve_query))
        .route("/:id/disbursements", post(save_disbursement))
        .route("/:id/disbursements/:idx/verify", patch(verify_disbursement))
}

async fn create_case(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<NewCase>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let case = state.cases.submit_case(&user, input).await?;
    Ok(created(case))
}

#[derive(Deserialize)]
struct ListParams {
    status: Option<String>,
    #[serde(default)]
    assigned_to_me: bool,
}

async fn list_cases(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListParams>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let cases = state
        .cases
        .list_cases(&user, params.status.as_deref(), params.assigned_to_me)
        .await?;
    Ok(ok(cases))
}

async fn my_cases(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<(StatusCode, Json<Value>)> {
    let cases = state.cases.my_cases(&user).await?;
    Ok(ok(cases))
}

async fn track_case(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let view = state.cases.track(&case_id).await?;
    Ok(ok(view))
}

async fn get_case(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let case = state.cases.get_case(&user, id).await?;
    Ok(ok(case))
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
    let case = state.cases.set_status(&user, id, &body.status).await?;
    Ok(ok(case))
}

#[derive(Deserialize)]
struct AssignBody {
    /// Defaults to the calling officer
    officer_id: Option<Uuid>,
}

async fn assign_officer(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<AssignBody>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let officer = body.officer_id.unwrap_or(user.id);
    let case = state.cases.assign(&user, id, officer).await?;
    Ok(ok(case))
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
struct RaiseQueryBody {
    query_type: QueryType,
    message: String,
    #[serde(default)]
    high_priority: bool,
}

async fn raise_query(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<RaiseQueryBody>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let (case, _index) = state
        .cases
        .raise_query(&user, id, body.query_type, &body.message, body.high_priority)
        .await?;
    Ok(created(case))
}

#[derive(Deserialize)]
struct RespondBody {
    response: String,
}

async fn respond_to_query(
    State(state): State<AppState>,
    Path((id, idx)): Path<(Uuid, usize)>,
    Json(body): Json<RespondBody>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let case = state.cases.respond_to_query(id, idx, &body.response).await?;
    Ok(ok(case))
}

async fn resolve_query(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, idx)): Path<(Uuid, usize)>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let case = state.cases.resolve_query(&user, id, idx).await?;
    Ok(ok(case))
}

async fn save_disbursement(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<SaveDisbursementRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let (case, _outcome, message) = state.cases.save_disbursement(&user, id, body).await?;
    Ok(ok_with_message(&message, case))
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
struct VerifyBody {
    transaction_id: String,
}

async fn verify_disbursement(
    State(state): State<AppState>,
    Path((id, idx)): Path<(Uuid, usize)>,
    Json(body): Json<VerifyBody>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let (case, _outcome, message) = state
        .cases
        .verify_disbursement(id, idx, &body.transaction_id)
        .await?;
    Ok(ok_with_message(&message, case))
}

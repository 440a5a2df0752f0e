//! Supporting-document endpoints, nested under `/api/cases`

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use uuid::Uuid;

use super::{created, ok, AppState};
use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::service::DocumentUpload;

pub fn router() -> Router<AppState> {
    Router::new().route("/:id/documents", post(upload_document).get(list_documents))
}

async fn upload_document(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<DocumentUpload>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let doc = state.documents.upload(&user, id, input).await?;
    Ok(created(doc))
}

async fn list_documents(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let docs = state.documents.list(&user, id).await?;
    Ok(ok(docs))
}

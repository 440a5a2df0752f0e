//! HTTP gateway
//!
//! Thin handlers over the service layer: extract identity, deserialize the
//! request, call the service, shape the `{success, data|message}` envelope.
//! All error rendering goes through `AppError: IntoResponse`.

use std::sync::Arc;

use axum::extract::FromRef;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};

use crate::auth::TokenVerifier;
use crate::service::{CaseService, DocumentService, TicketService};

pub mod case_routes;
pub mod document_routes;
pub mod ticket_routes;

/// Shared application state handed to every router
#[derive(Clone)]
pub struct AppState {
    pub cases: CaseService,
    pub tickets: TicketService,
    pub documents: DocumentService,
    pub verifier: Arc<dyn TokenVerifier>,
}

impl FromRef<AppState> for Arc<dyn TokenVerifier> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.verifier)
    }
}

/// `200 {success: true, data}`
pub(crate) fn ok<T: Serialize>(data: T) -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "success": true, "data": data })))
}

/// `200 {success: true, message, data}`
pub(crate) fn ok_with_message<T: Serialize>(message: &str, data: T) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "success": true, "message": message, "data": data })),
    )
}

/// `201 {success: true, data}`
pub(crate) fn created<T: Serialize>(data: T) -> (StatusCode, Json<Value>) {
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": data })),
    )
}

async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "healthy", "service": "nyayasetu" })),
    )
}

/// Assemble the full application router
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .nest(
            "/api/cases",
            case_routes::router().merge(document_routes::router()),
        )
        .nest("/api/tickets", ticket_routes::router())
        .with_state(state)
}

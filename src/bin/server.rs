//! NyayaSetu HTTP server

use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use nyayasetu::api::{app_router, AppState};
use nyayasetu::auth::{DevTokenVerifier, TokenVerifier};
use nyayasetu::blob_store::LocalBlobStore;
use nyayasetu::config::AppConfig;
use nyayasetu::notify::{LogNotifier, Notifier, SendGridNotifier};
use nyayasetu::service::{CaseService, DocumentService, TicketService};
use nyayasetu::db;
use nyayasetu::store::{CaseStore, PgCaseStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("nyayasetu=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    let pool = db::connect(&config.database_url, config.max_connections)
        .await
        .context("database connection failed")?;
    db::verify_schema(&pool).await?;

    let store: Arc<dyn CaseStore> = Arc::new(PgCaseStore::new(pool));
    let blobs = Arc::new(LocalBlobStore::new(&config.upload_dir));
    let notifier: Arc<dyn Notifier> = match &config.sendgrid_api_key {
        Some(key) => {
            tracing::info!("email notifications via SendGrid");
            Arc::new(SendGridNotifier::new(key.clone(), config.email_from.clone()))
        }
        None => {
            tracing::info!("no SENDGRID_API_KEY set, emails will be logged only");
            Arc::new(LogNotifier)
        }
    };
    let verifier: Arc<dyn TokenVerifier> = Arc::new(DevTokenVerifier);

    let state = AppState {
        cases: CaseService::new(Arc::clone(&store), Arc::clone(&notifier)),
        tickets: TicketService::new(Arc::clone(&store), Arc::clone(&notifier)),
        documents: DocumentService::new(Arc::clone(&store), blobs),
        verifier,
    };

    let app = app_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "nyayasetu server listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

//! Persistence seam for the case aggregate
//!
//! `CaseStore` is the single trait the services talk to. The production
//! implementation is Postgres via sqlx with the ledger and query channel as
//! JSONB sub-documents (one row write commits the whole aggregate); the
//! in-memory implementation backs the lifecycle integration tests with the
//! same uniqueness and version semantics.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::model::{Case, CaseDocument, CaseStatus, Ticket, TicketCategory, TicketStatus};

pub mod memory;
pub mod postgres;

pub use memory::MemoryCaseStore;
pub use postgres::PgCaseStore;

/// Storage-level failures, mapped into the HTTP taxonomy by `AppError`
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique index rejected the write
    #[error("duplicate {field}")]
    Duplicate {
        field: String,
        existing_case_id: Option<String>,
    },

    #[error("record not found")]
    NotFound,

    /// The optimistic version stamp did not match; the caller should reload
    /// and retry
    #[error("stale version stamp")]
    VersionConflict,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Filters for the reviewer case listing
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    pub status: Option<CaseStatus>,
    pub assigned_officer: Option<Uuid>,
}

/// Filters for the reviewer ticket listing
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub category: Option<TicketCategory>,
    /// Substring match on the related case id
    pub case_id: Option<String>,
}

/// Persistent store for cases, tickets, and document metadata
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Insert a freshly submitted case. Fails with `Duplicate` when the
    /// case id or FIR number unique index rejects it.
    async fn insert_case(&self, case: &Case) -> Result<(), StoreError>;

    async fn case_by_id(&self, id: Uuid) -> Result<Option<Case>, StoreError>;

    async fn case_by_case_id(&self, case_id: &str) -> Result<Option<Case>, StoreError>;

    async fn case_by_fir_number(&self, fir_case_number: &str)
        -> Result<Option<Case>, StoreError>;

    /// Persist the mutable state of a case. The write only lands when the
    /// stored version still equals `expected_version`; the stored stamp is
    /// then bumped to `expected_version + 1`.
    async fn save_case(&self, case: &Case, expected_version: i64) -> Result<(), StoreError>;

    async fn list_cases(&self, filter: &CaseFilter) -> Result<Vec<Case>, StoreError>;

    async fn cases_by_filer(&self, filer_id: Uuid) -> Result<Vec<Case>, StoreError>;

    /// Most recently issued case id under a `DBT-<year>-<DISTRICT>` prefix,
    /// used by the scan-then-insert id generator
    async fn latest_case_id_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<String>, StoreError>;

    /// Atomically increment and return the global ticket sequence. Safe
    /// under concurrency, unlike the case-id scan above.
    async fn next_ticket_sequence(&self) -> Result<i64, StoreError>;

    async fn insert_ticket(&self, ticket: &Ticket) -> Result<(), StoreError>;

    async fn ticket_by_id(&self, id: Uuid) -> Result<Option<Ticket>, StoreError>;

    async fn ticket_by_ticket_id(&self, ticket_id: &str) -> Result<Option<Ticket>, StoreError>;

    async fn save_ticket(&self, ticket: &Ticket) -> Result<(), StoreError>;

    async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, StoreError>;

    async fn tickets_by_filer(&self, filer_id: Uuid) -> Result<Vec<Ticket>, StoreError>;

    async fn insert_document(&self, doc: &CaseDocument) -> Result<(), StoreError>;

    async fn documents_for_case(&self, case_pk: Uuid) -> Result<Vec<CaseDocument>, StoreError>;
}

//! Postgres implementation of `CaseStore`
//!
//! Cases live in a single table with the disbursement ledger and query
//! channel as JSONB columns, so every aggregate mutation is one row write.
//! Versioned saves use `WHERE id = $1 AND version = $2`; the ticket counter
//! is a single atomic upsert-increment.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{CaseFilter, CaseStore, StoreError, TicketFilter};
use crate::model::{
    Case, CaseDocument, CaseQuery, Disbursement, Ticket, TicketResponse,
};

/// Postgres-backed store
#[derive(Clone)]
pub struct PgCaseStore {
    pool: PgPool,
}

impl PgCaseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(FromRow)]
struct CaseRow {
    id: Uuid,
    case_id: String,
    filer_id: Uuid,
    aadhaar_number: String,
    mobile_number: String,
    email: Option<String>,
    fir_case_number: String,
    police_station: String,
    district: String,
    state: String,
    date_of_incident: NaiveDate,
    date_of_fir_registration: Option<NaiveDate>,
    type_of_atrocity: Option<String>,
    caste_category: Option<String>,
    caste_certificate_number: Option<String>,
    village: Option<String>,
    pincode: Option<String>,
    witness_name: Option<String>,
    witness_contact: Option<String>,
    delay_reason: Option<String>,
    incident_description: Option<String>,
    relief_amount_requested: Option<Decimal>,
    account_holder_name: String,
    account_number: String,
    ifsc_code: String,
    bank_name: Option<String>,
    status: String,
    assigned_officer: Option<Uuid>,
    approved_amount: Option<Decimal>,
    disbursements: Json<Vec<Disbursement>>,
    queries: Json<Vec<CaseQuery>>,
    version: i64,
    submitted_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CaseRow {
    fn into_case(self) -> Result<Case, StoreError> {
        let status = self
            .status
            .parse()
            .map_err(|e: String| StoreError::Backend(anyhow!(e)))?;
        Ok(Case {
            id: self.id,
            case_id: self.case_id,
            filer_id: self.filer_id,
            aadhaar_number: self.aadhaar_number,
            mobile_number: self.mobile_number,
            email: self.email,
            fir_case_number: self.fir_case_number,
            police_station: self.police_station,
            district: self.district,
            state: self.state,
            date_of_incident: self.date_of_incident,
            date_of_fir_registration: self.date_of_fir_registration,
            type_of_atrocity: self.type_of_atrocity,
            caste_category: self.caste_category,
            caste_certificate_number: self.caste_certificate_number,
            village: self.village,
            pincode: self.pincode,
            witness_name: self.witness_name,
            witness_contact: self.witness_contact,
            delay_reason: self.delay_reason,
            incident_description: self.incident_description,
            relief_amount_requested: self.relief_amount_requested,
            account_holder_name: self.account_holder_name,
            account_number: self.account_number,
            ifsc_code: self.ifsc_code,
            bank_name: self.bank_name,
            status,
            assigned_officer: self.assigned_officer,
            approved_amount: self.approved_amount,
            disbursements: self.disbursements.0,
            queries: self.queries.0,
            version: self.version,
            submitted_at: self.submitted_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct TicketRow {
    id: Uuid,
    ticket_id: String,
    case_id: String,
    filer_id: Uuid,
    category: String,
    subject: String,
    description: String,
    attachment: Option<String>,
    status: String,
    responses: Json<Vec<TicketResponse>>,
    assigned_officer: Option<Uuid>,
    resolved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TicketRow {
    fn into_ticket(self) -> Result<Ticket, StoreError> {
        let category = self
            .category
            .parse()
            .map_err(|e: String| StoreError::Backend(anyhow!(e)))?;
        let status = self
            .status
            .parse()
            .map_err(|e: String| StoreError::Backend(anyhow!(e)))?;
        Ok(Ticket {
            id: self.id,
            ticket_id: self.ticket_id,
            case_id: self.case_id,
            filer_id: self.filer_id,
            category,
            subject: self.subject,
            description: self.description,
            attachment: self.attachment,
            status,
            responses: self.responses.0,
            assigned_officer: self.assigned_officer,
            resolved_at: self.resolved_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct DocumentRow {
    id: Uuid,
    case_pk: Uuid,
    document_type: String,
    file_name: String,
    mime_type: String,
    blob_ref: String,
    uploaded_by: Uuid,
    uploaded_at: DateTime<Utc>,
}

impl From<DocumentRow> for CaseDocument {
    fn from(r: DocumentRow) -> Self {
        CaseDocument {
            id: r.id,
            case_pk: r.case_pk,
            document_type: r.document_type,
            file_name: r.file_name,
            mime_type: r.mime_type,
            blob_ref: r.blob_ref,
            uploaded_by: r.uploaded_by,
            uploaded_at: r.uploaded_at,
        }
    }
}

const CASE_COLUMNS: &str = "id, case_id, filer_id, aadhaar_number, mobile_number, email, \
     fir_case_number, police_station, district, state, date_of_incident, \
     date_of_fir_registration, type_of_atrocity, caste_category, \
     caste_certificate_number, village, pincode, witness_name, witness_contact, \
     delay_reason, incident_description, relief_amount_requested, \
     account_holder_name, account_number, ifsc_code, bank_name, status, \
     assigned_officer, approved_amount, disbursements, queries, version, \
     submitted_at, updated_at";

const TICKET_COLUMNS: &str = "id, ticket_id, case_id, filer_id, category, subject, description, \
     attachment, status, responses, assigned_officer, resolved_at, created_at, updated_at";

/// Map unique-index violations on the cases table to `Duplicate`
fn map_case_insert_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            let field = match db.constraint() {
                Some(c) if c.contains("fir") => "FIR number",
                _ => "case ID",
            };
            return StoreError::Duplicate {
                field: field.to_string(),
                existing_case_id: None,
            };
        }
    }
    StoreError::Backend(anyhow::Error::new(e).context("failed to insert case"))
}

#[async_trait]
impl CaseStore for PgCaseStore {
    async fn insert_case(&self, case: &Case) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO cases ({CASE_COLUMNS}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
              $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, \
              $31, $32, $33, $34)"
        );
        sqlx::query(&sql)
            .bind(case.id)
            .bind(&case.case_id)
            .bind(case.filer_id)
            .bind(&case.aadhaar_number)
            .bind(&case.mobile_number)
            .bind(&case.email)
            .bind(&case.fir_case_number)
            .bind(&case.police_station)
            .bind(&case.district)
            .bind(&case.state)
            .bind(case.date_of_incident)
            .bind(case.date_of_fir_registration)
            .bind(&case.type_of_atrocity)
            .bind(&case.caste_category)
            .bind(&case.caste_certificate_number)
            .bind(&case.village)
            .bind(&case.pincode)
            .bind(&case.witness_name)
            .bind(&case.witness_contact)
            .bind(&case.delay_reason)
            .bind(&case.incident_description)
            .bind(case.relief_amount_requested)
            .bind(&case.account_holder_name)
            .bind(&case.account_number)
            .bind(&case.ifsc_code)
            .bind(&case.bank_name)
            .bind(case.status.as_str())
            .bind(case.assigned_officer)
            .bind(case.approved_amount)
            .bind(Json(&case.disbursements))
            .bind(Json(&case.queries))
            .bind(case.version)
            .bind(case.submitted_at)
            .bind(case.updated_at)
            .execute(&self.pool)
            .await
            .map_err(map_case_insert_err)?;

        tracing::info!(case_id = %case.case_id, "inserted case");
        Ok(())
    }

    async fn case_by_id(&self, id: Uuid) -> Result<Option<Case>, StoreError> {
        let sql = format!("SELECT {CASE_COLUMNS} FROM cases WHERE id = $1");
        let row = sqlx::query_as::<_, CaseRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to load case by id")?;
        row.map(CaseRow::into_case).transpose()
    }

    async fn case_by_case_id(&self, case_id: &str) -> Result<Option<Case>, StoreError> {
        let sql = format!("SELECT {CASE_COLUMNS} FROM cases WHERE case_id = $1");
        let row = sqlx::query_as::<_, CaseRow>(&sql)
            .bind(case_id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to load case by case id")?;
        row.map(CaseRow::into_case).transpose()
    }

    async fn case_by_fir_number(
        &self,
        fir_case_number: &str,
    ) -> Result<Option<Case>, StoreError> {
        let sql = format!("SELECT {CASE_COLUMNS} FROM cases WHERE fir_case_number = $1");
        let row = sqlx::query_as::<_, CaseRow>(&sql)
            .bind(fir_case_number)
            .fetch_optional(&self.pool)
            .await
            .context("failed to load case by FIR number")?;
        row.map(CaseRow::into_case).transpose()
    }

    async fn save_case(&self, case: &Case, expected_version: i64) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE cases
            SET status = $3,
                assigned_officer = $4,
                approved_amount = $5,
                disbursements = $6,
                queries = $7,
                updated_at = $8,
                version = $2 + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(case.id)
        .bind(expected_version)
        .bind(case.status.as_str())
        .bind(case.assigned_officer)
        .bind(case.approved_amount)
        .bind(Json(&case.disbursements))
        .bind(Json(&case.queries))
        .bind(case.updated_at)
        .execute(&self.pool)
        .await
        .context("failed to save case")?;

        if result.rows_affected() == 0 {
            // Distinguish a stale stamp from a missing row
            let exists = sqlx::query_scalar::<_, i32>("SELECT 1 FROM cases WHERE id = $1")
                .bind(case.id)
                .fetch_optional(&self.pool)
                .await
                .context("failed to re-check case existence")?;
            return match exists {
                Some(_) => Err(StoreError::VersionConflict),
                None => Err(StoreError::NotFound),
            };
        }
        Ok(())
    }

    async fn list_cases(&self, filter: &CaseFilter) -> Result<Vec<Case>, StoreError> {
        let sql = format!(
            "SELECT {CASE_COLUMNS} FROM cases \
             WHERE ($1::text IS NULL OR status = $1) \
               AND ($2::uuid IS NULL OR assigned_officer = $2) \
             ORDER BY submitted_at DESC"
        );
        let rows = sqlx::query_as::<_, CaseRow>(&sql)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.assigned_officer)
            .fetch_all(&self.pool)
            .await
            .context("failed to list cases")?;
        rows.into_iter().map(CaseRow::into_case).collect()
    }

    async fn cases_by_filer(&self, filer_id: Uuid) -> Result<Vec<Case>, StoreError> {
        let sql = format!(
            "SELECT {CASE_COLUMNS} FROM cases WHERE filer_id = $1 ORDER BY submitted_at DESC"
        );
        let rows = sqlx::query_as::<_, CaseRow>(&sql)
            .bind(filer_id)
            .fetch_all(&self.pool)
            .await
            .context("failed to list cases by filer")?;
        rows.into_iter().map(CaseRow::into_case).collect()
    }

    async fn latest_case_id_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<String>, StoreError> {
        let last = sqlx::query_scalar::<_, String>(
            r#"
            SELECT case_id FROM cases
            WHERE case_id LIKE $1 || '-%'
            ORDER BY submitted_at DESC, case_id DESC
            LIMIT 1
            "#,
        )
        .bind(prefix)
        .fetch_optional(&self.pool)
        .await
        .context("failed to scan latest case id")?;
        Ok(last)
    }

    async fn next_ticket_sequence(&self) -> Result<i64, StoreError> {
        let seq = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO counters (name, seq) VALUES ('ticket_id', 1)
            ON CONFLICT (name) DO UPDATE SET seq = counters.seq + 1
            RETURNING seq
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("failed to increment ticket counter")?;
        Ok(seq)
    }

    async fn insert_ticket(&self, ticket: &Ticket) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO tickets ({TICKET_COLUMNS}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        );
        sqlx::query(&sql)
            .bind(ticket.id)
            .bind(&ticket.ticket_id)
            .bind(&ticket.case_id)
            .bind(ticket.filer_id)
            .bind(ticket.category.as_str())
            .bind(&ticket.subject)
            .bind(&ticket.description)
            .bind(&ticket.attachment)
            .bind(ticket.status.as_str())
            .bind(Json(&ticket.responses))
            .bind(ticket.assigned_officer)
            .bind(ticket.resolved_at)
            .bind(ticket.created_at)
            .bind(ticket.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db) = &e {
                    if db.is_unique_violation() {
                        return StoreError::Duplicate {
                            field: "ticket ID".to_string(),
                            existing_case_id: None,
                        };
                    }
                }
                StoreError::Backend(anyhow::Error::new(e).context("failed to insert ticket"))
            })?;

        tracing::info!(ticket_id = %ticket.ticket_id, "inserted ticket");
        Ok(())
    }

    async fn ticket_by_id(&self, id: Uuid) -> Result<Option<Ticket>, StoreError> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1");
        let row = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to load ticket by id")?;
        row.map(TicketRow::into_ticket).transpose()
    }

    async fn ticket_by_ticket_id(&self, ticket_id: &str) -> Result<Option<Ticket>, StoreError> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE ticket_id = $1");
        let row = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(ticket_id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to load ticket by ticket id")?;
        row.map(TicketRow::into_ticket).transpose()
    }

    async fn save_ticket(&self, ticket: &Ticket) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE tickets
            SET status = $2,
                responses = $3,
                assigned_officer = $4,
                resolved_at = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(ticket.id)
        .bind(ticket.status.as_str())
        .bind(Json(&ticket.responses))
        .bind(ticket.assigned_officer)
        .bind(ticket.resolved_at)
        .bind(ticket.updated_at)
        .execute(&self.pool)
        .await
        .context("failed to save ticket")?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, StoreError> {
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets \
             WHERE ($1::text IS NULL OR status = $1) \
               AND ($2::text IS NULL OR category = $2) \
               AND ($3::text IS NULL OR case_id ILIKE '%' || $3 || '%') \
             ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.category.map(|c| c.as_str()))
            .bind(&filter.case_id)
            .fetch_all(&self.pool)
            .await
            .context("failed to list tickets")?;
        rows.into_iter().map(TicketRow::into_ticket).collect()
    }

    async fn tickets_by_filer(&self, filer_id: Uuid) -> Result<Vec<Ticket>, StoreError> {
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE filer_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(filer_id)
            .fetch_all(&self.pool)
            .await
            .context("failed to list tickets by filer")?;
        rows.into_iter().map(TicketRow::into_ticket).collect()
    }

    async fn insert_document(&self, doc: &CaseDocument) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO case_documents
                (id, case_pk, document_type, file_name, mime_type, blob_ref,
                 uploaded_by, uploaded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(doc.id)
        .bind(doc.case_pk)
        .bind(&doc.document_type)
        .bind(&doc.file_name)
        .bind(&doc.mime_type)
        .bind(&doc.blob_ref)
        .bind(doc.uploaded_by)
        .bind(doc.uploaded_at)
        .execute(&self.pool)
        .await
        .context("failed to insert document metadata")?;
        Ok(())
    }

    async fn documents_for_case(&self, case_pk: Uuid) -> Result<Vec<CaseDocument>, StoreError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, case_pk, document_type, file_name, mime_type, blob_ref,
                   uploaded_by, uploaded_at
            FROM case_documents
            WHERE case_pk = $1
            ORDER BY uploaded_at DESC
            "#,
        )
        .bind(case_pk)
        .fetch_all(&self.pool)
        .await
        .context("failed to list documents")?;
        Ok(rows.into_iter().map(CaseDocument::from).collect())
    }
}

//! Data model for the relief-case aggregate and grievance tickets
//!
//! `Case` is the aggregate root: the disbursement ledger and the
//! query/response channel are nested sub-documents so one row write commits
//! the whole aggregate atomically. Tickets are a separate, simpler record
//! keyed by a human-facing ticket id.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle status of a relief case.
///
/// The natural flow is pending → under_review → (approved | rejected |
/// on_hold) → disbursed → closed, but reviewers may set any value directly;
/// only `Disbursed` and `Closed` are additionally derived by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Pending,
    UnderReview,
    Approved,
    Rejected,
    OnHold,
    Disbursed,
    Closed,
}

impl CaseStatus {
    pub const ALL: [CaseStatus; 7] = [
        CaseStatus::Pending,
        CaseStatus::UnderReview,
        CaseStatus::Approved,
        CaseStatus::Rejected,
        CaseStatus::OnHold,
        CaseStatus::Disbursed,
        CaseStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Pending => "pending",
            CaseStatus::UnderReview => "under_review",
            CaseStatus::Approved => "approved",
            CaseStatus::Rejected => "rejected",
            CaseStatus::OnHold => "on_hold",
            CaseStatus::Disbursed => "disbursed",
            CaseStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|v| v.as_str()).collect();
                format!("Invalid status. Must be one of: {}", valid.join(", "))
            })
    }
}

/// One phased fund release on a case.
///
/// Entries are index-addressed: index 0/1/2 correspond to the fixed
/// 25/25/50 percent schedule. Once `victim_verified` is set the entry is
/// immutable except for the audit fields stamped at verification time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Disbursement {
    pub amount: Decimal,
    pub percentage: u32,
    pub transaction_id: String,
    pub disbursed_at: DateTime<Utc>,
    pub disbursed_by: Uuid,
    #[serde(default)]
    pub victim_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub victim_verified_at: Option<DateTime<Utc>>,
    /// Raw string the victim entered, kept unnormalized for audit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub victim_entered_txn_id: Option<String>,
}

/// Kind of clarification an officer is asking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    MissingDocument,
    ClarificationRequired,
    IncorrectInformation,
    Other,
}

/// Query lifecycle: officer raises (action_required), victim responds
/// (waiting_review), officer closes (resolved).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    ActionRequired,
    WaitingReview,
    Resolved,
}

/// One entry in the officer/victim query channel of a case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseQuery {
    pub query_type: QueryType,
    pub message: String,
    #[serde(default)]
    pub high_priority: bool,
    pub status: QueryStatus,
    pub asked_by: Uuid,
    pub asked_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,
}

/// A relief case: the aggregate root of this system.
///
/// Immutable facts are captured at submission; reviewers mutate status,
/// assignment, approved amount, the ledger, and the query channel. Cases are
/// never hard-deleted. `version` is the optimistic-concurrency stamp checked
/// by every persisted write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub id: Uuid,
    /// Human-facing identifier, e.g. `DBT-2024-SOUTHDELHI-001`
    pub case_id: String,
    pub filer_id: Uuid,

    // Personal information
    pub aadhaar_number: String,
    pub mobile_number: String,
    pub email: Option<String>,

    // Incident facts
    pub fir_case_number: String,
    pub police_station: String,
    pub district: String,
    pub state: String,
    pub date_of_incident: NaiveDate,
    pub date_of_fir_registration: Option<NaiveDate>,
    pub type_of_atrocity: Option<String>,
    pub caste_category: Option<String>,
    pub caste_certificate_number: Option<String>,
    pub village: Option<String>,
    pub pincode: Option<String>,
    pub witness_name: Option<String>,
    pub witness_contact: Option<String>,
    pub delay_reason: Option<String>,
    pub incident_description: Option<String>,
    pub relief_amount_requested: Option<Decimal>,

    // Bank-transfer target
    pub account_holder_name: String,
    pub account_number: String,
    pub ifsc_code: String,
    pub bank_name: Option<String>,

    // Mutable state
    pub status: CaseStatus,
    pub assigned_officer: Option<Uuid>,
    pub approved_amount: Option<Decimal>,
    pub disbursements: Vec<Disbursement>,
    pub queries: Vec<CaseQuery>,

    /// Optimistic-concurrency stamp, bumped on every persisted write
    pub version: i64,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Case {
    /// Stamp the aggregate as modified
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

/// Grievance ticket category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketCategory {
    Delay,
    Verification,
    Disbursement,
    Technical,
    Document,
    Other,
}

impl TicketCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketCategory::Delay => "delay",
            TicketCategory::Verification => "verification",
            TicketCategory::Disbursement => "disbursement",
            TicketCategory::Technical => "technical",
            TicketCategory::Document => "document",
            TicketCategory::Other => "other",
        }
    }
}

impl FromStr for TicketCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const ALL: [TicketCategory; 6] = [
            TicketCategory::Delay,
            TicketCategory::Verification,
            TicketCategory::Disbursement,
            TicketCategory::Technical,
            TicketCategory::Document,
            TicketCategory::Other,
        ];
        ALL.iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| format!("Unknown ticket category: {s}"))
    }
}

/// Grievance ticket status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    UnderReview,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 4] = [
        TicketStatus::Open,
        TicketStatus::UnderReview,
        TicketStatus::Resolved,
        TicketStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::UnderReview => "under_review",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|v| v.as_str()).collect();
                format!("Invalid status. Must be one of: {}", valid.join(", "))
            })
    }
}

/// Officer reply on a ticket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketResponse {
    pub message: String,
    pub responded_by: Uuid,
    pub responded_at: DateTime<Utc>,
}

/// A complaint ticket raised against an existing relief case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    /// Human-facing identifier, e.g. `GRV-2024-0001`
    pub ticket_id: String,
    pub case_id: String,
    pub filer_id: Uuid,
    pub category: TicketCategory,
    pub subject: String,
    pub description: String,
    pub attachment: Option<String>,
    pub status: TicketStatus,
    pub responses: Vec<TicketResponse>,
    pub assigned_officer: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Metadata for an uploaded supporting document; the bytes live in the blob
/// store under `blob_ref`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseDocument {
    pub id: Uuid,
    pub case_pk: Uuid,
    pub document_type: String,
    pub file_name: String,
    pub mime_type: String,
    pub blob_ref: String,
    pub uploaded_by: Uuid,
    pub uploaded_at: DateTime<Utc>,
}

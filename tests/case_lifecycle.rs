//! End-to-end lifecycle through the service layer against the in-memory
//! store: submission, review, the three-phase disbursement schedule with
//! victim verification, the query channel, and grievance tickets.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use nyayasetu::auth::{AuthUser, Role};
use nyayasetu::blob_store::MemoryBlobStore;
use nyayasetu::error::AppError;
use nyayasetu::model::{CaseStatus, QueryStatus, QueryType, TicketCategory, TicketStatus};
use nyayasetu::notify::LogNotifier;
use nyayasetu::service::{
    CaseService, DocumentService, DocumentUpload, NewCase, NewTicket, SaveDisbursementRequest,
    TicketService,
};
use nyayasetu::store::{CaseStore, MemoryCaseStore};

fn victim() -> AuthUser {
    AuthUser {
        id: Uuid::new_v4(),
        role: Role::Victim,
        email: Some("victim@example.com".to_string()),
        name: Some("Ramesh Kumar".to_string()),
    }
}

fn officer() -> AuthUser {
    AuthUser {
        id: Uuid::new_v4(),
        role: Role::Officer,
        email: Some("officer@gov.in".to_string()),
        name: None,
    }
}

fn submission(fir: &str) -> NewCase {
    NewCase {
        aadhaar_number: Some("123456789012".to_string()),
        mobile_number: Some("9876543210".to_string()),
        email: Some("victim@example.com".to_string()),
        fir_case_number: Some(fir.to_string()),
        police_station: Some("Hauz Khas".to_string()),
        district: Some("South Delhi".to_string()),
        state: Some("Delhi".to_string()),
        date_of_incident: NaiveDate::from_ymd_opt(2024, 3, 15),
        date_of_fir_registration: NaiveDate::from_ymd_opt(2024, 3, 16),
        type_of_atrocity: Some("Physical assault".to_string()),
        caste_category: Some("SC".to_string()),
        caste_certificate_number: None,
        village: None,
        pincode: Some("110017".to_string()),
        witness_name: None,
        witness_contact: None,
        delay_reason: None,
        incident_description: Some("Assault following a land dispute".to_string()),
        relief_amount_requested: Some(Decimal::from(100_000)),
        account_holder_name: Some("Ramesh Kumar".to_string()),
        account_number: Some("001122334455".to_string()),
        ifsc_code: Some("SBIN0001234".to_string()),
        bank_name: Some("State Bank of India".to_string()),
    }
}

fn services() -> (Arc<MemoryCaseStore>, CaseService, TicketService, DocumentService) {
    let store = Arc::new(MemoryCaseStore::new());
    let notifier = Arc::new(LogNotifier);
    let cases = CaseService::new(store.clone(), notifier.clone());
    let tickets = TicketService::new(store.clone(), notifier);
    let documents = DocumentService::new(store.clone(), Arc::new(MemoryBlobStore::new()));
    (store, cases, tickets, documents)
}

fn save(txn: &str, amount: Option<i64>) -> SaveDisbursementRequest {
    SaveDisbursementRequest {
        phase: None,
        transaction_id: Some(txn.to_string()),
        approved_amount: amount.map(Decimal::from),
        replace: false,
    }
}

#[tokio::test]
async fn full_disbursement_lifecycle_closes_the_case() {
    let (_, cases, _, _) = services();
    let filer = victim();
    let reviewer = officer();
    let year = Utc::now().year();

    let case = cases.submit_case(&filer, submission("FIR/1001")).await.unwrap();
    assert_eq!(case.case_id, format!("DBT-{year}-SOUTHDELHI-001"));
    assert_eq!(case.status, CaseStatus::Pending);

    let case = cases.assign(&reviewer, case.id, reviewer.id).await.unwrap();
    assert_eq!(case.status, CaseStatus::UnderReview);
    assert_eq!(case.assigned_officer, Some(reviewer.id));

    let case = cases.set_status(&reviewer, case.id, "approved").await.unwrap();
    assert_eq!(case.status, CaseStatus::Approved);

    // Phase 1: 25% of the approved amount
    let (case, outcome, message) = cases
        .save_disbursement(&reviewer, case.id, save("ABC1", Some(10_000)))
        .await
        .unwrap();
    assert_eq!(outcome.percentage, 25);
    assert!(message.contains("Phase 1 (25%)"));
    assert_eq!(case.disbursements[0].amount, Decimal::from(2_500));

    // Phase 2 is blocked until the victim verifies phase 1
    let err = cases
        .save_disbursement(&reviewer, case.id, save("DEF2", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Verification matches case-insensitively against the bank SMS reference
    let (_, outcome, _) = cases.verify_disbursement(case.id, 0, " abc1 ").await.unwrap();
    assert!(!outcome.all_verified);

    let (case, _, _) = cases
        .save_disbursement(&reviewer, case.id, save("DEF2", None))
        .await
        .unwrap();
    assert_eq!(case.disbursements[1].amount, Decimal::from(2_500));
    cases.verify_disbursement(case.id, 1, "def2").await.unwrap();

    // Third save flips the case to disbursed
    let (case, outcome, _) = cases
        .save_disbursement(&reviewer, case.id, save("GHI3", None))
        .await
        .unwrap();
    assert_eq!(outcome.status, CaseStatus::Disbursed);
    assert_eq!(case.disbursements[2].amount, Decimal::from(5_000));

    // Final verification closes the case
    let (case, outcome, message) = cases.verify_disbursement(case.id, 2, "GHI3").await.unwrap();
    assert!(outcome.all_verified);
    assert_eq!(case.status, CaseStatus::Closed);
    assert_eq!(message, "All transactions verified. Case closed.");

    let track = cases.track(&case.case_id).await.unwrap();
    assert_eq!(track.status, CaseStatus::Closed);
    assert_eq!(track.disbursements.len(), 3);
}

#[tokio::test]
async fn duplicate_fir_surfaces_the_existing_case_id() {
    let (_, cases, _, _) = services();
    let filer = victim();

    let first = cases.submit_case(&filer, submission("FIR/2002")).await.unwrap();

    let err = cases
        .submit_case(&victim(), submission("FIR/2002"))
        .await
        .unwrap_err();
    match err {
        AppError::Conflict {
            existing_case_id, ..
        } => assert_eq!(existing_case_id.as_deref(), Some(first.case_id.as_str())),
        other => panic!("expected Conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn case_ids_increment_per_district_and_year() {
    let (_, cases, _, _) = services();
    let year = Utc::now().year();

    let a = cases.submit_case(&victim(), submission("FIR/3001")).await.unwrap();
    let b = cases.submit_case(&victim(), submission("FIR/3002")).await.unwrap();

    assert_eq!(a.case_id, format!("DBT-{year}-SOUTHDELHI-001"));
    assert_eq!(b.case_id, format!("DBT-{year}-SOUTHDELHI-002"));
}

#[tokio::test]
async fn victims_cannot_perform_reviewer_operations() {
    let (_, cases, _, _) = services();
    let filer = victim();
    let case = cases.submit_case(&filer, submission("FIR/4001")).await.unwrap();

    let err = cases.set_status(&filer, case.id, "approved").await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = cases
        .save_disbursement(&filer, case.id, save("TXN", Some(1000)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = cases.list_cases(&filer, None, false).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // But the filer can always read their own case
    let own = cases.get_case(&filer, case.id).await.unwrap();
    assert_eq!(own.id, case.id);

    // And a different victim cannot
    let err = cases.get_case(&victim(), case.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn invalid_status_string_lists_the_valid_values() {
    let (_, cases, _, _) = services();
    let reviewer = officer();
    let case = cases
        .submit_case(&victim(), submission("FIR/5001"))
        .await
        .unwrap();

    let err = cases.set_status(&reviewer, case.id, "shipped").await.unwrap_err();
    match err {
        AppError::Validation(msg) => {
            assert!(msg.starts_with("Invalid status."));
            assert!(msg.contains("under_review"));
        }
        other => panic!("expected Validation, got {other:?}"),
    }
}

#[tokio::test]
async fn query_channel_round_trip() {
    let (_, cases, _, _) = services();
    let reviewer = officer();
    let case = cases
        .submit_case(&victim(), submission("FIR/6001"))
        .await
        .unwrap();

    let (case, idx) = cases
        .raise_query(
            &reviewer,
            case.id,
            QueryType::MissingDocument,
            "Please upload the caste certificate",
            true,
        )
        .await
        .unwrap();
    assert_eq!(case.queries[idx].status, QueryStatus::ActionRequired);

    let case = cases
        .respond_to_query(case.id, idx, "Uploaded just now")
        .await
        .unwrap();
    assert_eq!(case.queries[idx].status, QueryStatus::WaitingReview);

    let case = cases.resolve_query(&reviewer, case.id, idx).await.unwrap();
    assert_eq!(case.queries[idx].status, QueryStatus::Resolved);

    // The public tracking view exposes the thread
    let view = cases.track(&case.case_id).await.unwrap();
    assert_eq!(view.queries.len(), 1);
}

#[tokio::test]
async fn mismatched_verification_is_rejected_without_leaking_the_reference() {
    let (_, cases, _, _) = services();
    let reviewer = officer();
    let case = cases
        .submit_case(&victim(), submission("FIR/7001"))
        .await
        .unwrap();

    cases
        .save_disbursement(&reviewer, case.id, save("SECRET-REF", Some(1000)))
        .await
        .unwrap();

    let err = cases
        .verify_disbursement(case.id, 0, "WRONG")
        .await
        .unwrap_err();
    match err {
        AppError::TransactionMismatch(msg) => assert!(!msg.contains("SECRET-REF")),
        other => panic!("expected TransactionMismatch, got {other:?}"),
    }

    let view = cases.track(&case.case_id).await.unwrap();
    assert!(!view.disbursements[0].victim_verified);
}

#[tokio::test]
async fn tickets_get_sequential_ids_and_move_through_the_ladder() {
    let (_, cases, tickets, _) = services();
    let filer = victim();
    let reviewer = officer();
    let year = Utc::now().year();

    let case = cases.submit_case(&filer, submission("FIR/8001")).await.unwrap();

    let err = tickets
        .create(
            &filer,
            NewTicket {
                case_id: Some("DBT-2020-NOWHERE-001".to_string()),
                category: Some(TicketCategory::Delay),
                subject: Some("No progress".to_string()),
                description: Some("Months without an update".to_string()),
                attachment: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let ticket = tickets
        .create(
            &filer,
            NewTicket {
                case_id: Some(case.case_id.clone()),
                category: Some(TicketCategory::Delay),
                subject: Some("  No progress on my case  ".to_string()),
                description: Some("No update since submission".to_string()),
                attachment: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(ticket.ticket_id, format!("GRV-{year}-0001"));
    assert_eq!(ticket.subject, "No progress on my case");
    assert_eq!(ticket.status, TicketStatus::Open);

    // First officer response auto-assigns and moves the ticket to review
    let ticket = tickets
        .respond(&reviewer, ticket.id, "Your case is being verified")
        .await
        .unwrap();
    assert_eq!(ticket.status, TicketStatus::UnderReview);
    assert_eq!(ticket.assigned_officer, Some(reviewer.id));
    assert_eq!(ticket.responses.len(), 1);

    let ticket = tickets
        .set_status(&reviewer, ticket.id, "resolved")
        .await
        .unwrap();
    assert_eq!(ticket.status, TicketStatus::Resolved);
    assert!(ticket.resolved_at.is_some());

    // Reopening clears the resolution stamp
    let ticket = tickets.set_status(&reviewer, ticket.id, "open").await.unwrap();
    assert!(ticket.resolved_at.is_none());

    let tracked = tickets.track(&ticket.ticket_id).await.unwrap();
    assert_eq!(tracked.id, ticket.id);
}

#[tokio::test]
async fn document_upload_round_trip() {
    let (store, cases, _, documents) = services();
    let filer = victim();

    let case = cases.submit_case(&filer, submission("FIR/9001")).await.unwrap();

    use base64::Engine;
    let content = base64::engine::general_purpose::STANDARD.encode(b"%PDF-1.4 evidence");

    let doc = documents
        .upload(
            &filer,
            case.id,
            DocumentUpload {
                document_type: Some("fir_copy".to_string()),
                file_name: Some("fir.pdf".to_string()),
                mime_type: Some("application/pdf".to_string()),
                content: Some(content),
            },
        )
        .await
        .unwrap();
    assert!(doc.blob_ref.starts_with("memory://"));

    let listed = documents.list(&filer, case.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].file_name, "fir.pdf");

    // Another victim cannot see the documents
    let err = documents.list(&victim(), case.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // Metadata landed in the store as well
    let docs = store.documents_for_case(case.id).await.unwrap();
    assert_eq!(docs.len(), 1);
}

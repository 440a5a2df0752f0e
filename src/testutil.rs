//! Shared fixtures for unit tests

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::model::{Case, CaseStatus};

/// A freshly submitted case with every required field populated
pub fn sample_case() -> Case {
    let now = Utc::now();
    Case {
        id: Uuid::new_v4(),
        case_id: "DBT-2024-SOUTHDELHI-001".to_string(),
        filer_id: Uuid::new_v4(),
        aadhaar_number: "123456789012".to_string(),
        mobile_number: "9876543210".to_string(),
        email: Some("victim@example.com".to_string()),
        fir_case_number: "FIR/2024/0042".to_string(),
        police_station: "Hauz Khas".to_string(),
        district: "South Delhi".to_string(),
        state: "Delhi".to_string(),
        date_of_incident: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        date_of_fir_registration: NaiveDate::from_ymd_opt(2024, 3, 16),
        type_of_atrocity: Some("Physical assault".to_string()),
        caste_category: Some("SC".to_string()),
        caste_certificate_number: Some("CC-2020-1183".to_string()),
        village: Some("Adchini".to_string()),
        pincode: Some("110017".to_string()),
        witness_name: None,
        witness_contact: None,
        delay_reason: None,
        incident_description: Some("Assault following a land dispute".to_string()),
        relief_amount_requested: Some(Decimal::from(100_000)),
        account_holder_name: "Ramesh Kumar".to_string(),
        account_number: "001122334455".to_string(),
        ifsc_code: "SBIN0001234".to_string(),
        bank_name: Some("State Bank of India".to_string()),
        status: CaseStatus::Pending,
        assigned_officer: None,
        approved_amount: None,
        disbursements: Vec::new(),
        queries: Vec::new(),
        version: 0,
        submitted_at: now,
        updated_at: now,
    }
}

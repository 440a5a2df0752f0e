//! Phased disbursement ledger
//!
//! Enforces the sequential 25/25/50 release schedule and the victim
//! verification gate between phases. Verification is authenticated by
//! knowledge of the bank transaction reference alone: the victim who
//! received the bank SMS is the only party who can supply a matching value.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::model::{Case, CaseStatus, Disbursement};

/// Fixed release schedule by phase index
pub const PHASE_PERCENTAGES: [u32; 3] = [25, 25, 50];

/// Result of recording a disbursement phase
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    /// Zero-based phase index that was written (or found already recorded)
    pub phase_index: usize,
    pub percentage: u32,
    pub disbursement_count: usize,
    pub status: CaseStatus,
    /// True when the call matched an identical unverified entry and changed
    /// nothing (retried client request)
    pub idempotent: bool,
}

/// Result of a victim verification attempt
#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub all_verified: bool,
    pub status: CaseStatus,
}

/// Transaction references match when equal after trimming surrounding
/// whitespace, ignoring ASCII case. Exact otherwise; no fuzzy matching.
fn references_match(stored: &str, entered: &str) -> bool {
    stored.trim().eq_ignore_ascii_case(entered.trim())
}

/// Record the next (or a specific) disbursement phase.
///
/// Phase *i* (i > 0) requires phase *i-1* to exist and be victim-verified.
/// Re-saving an unverified phase with the same reference is an idempotent
/// no-op; a different reference requires `replace = true`. Verified entries
/// are immutable. When the third entry lands, the case becomes `Disbursed`.
pub fn save_disbursement(
    case: &mut Case,
    phase: Option<usize>,
    transaction_id: &str,
    approved_amount: Option<Decimal>,
    replace: bool,
    disbursed_by: Uuid,
    now: DateTime<Utc>,
) -> AppResult<SaveOutcome> {
    if transaction_id.trim().is_empty() {
        return Err(AppError::validation("Transaction ID is required"));
    }

    let phase_index = phase.unwrap_or(case.disbursements.len());

    if phase_index >= PHASE_PERCENTAGES.len() {
        return Err(AppError::validation(
            "All 3 disbursement phases have already been added",
        ));
    }

    // Sequential gate: the previous phase must exist and be verified. A gap
    // (phase beyond the ledger length) fails the same check.
    if phase_index > 0 {
        let prev_verified = case
            .disbursements
            .get(phase_index - 1)
            .map(|d| d.victim_verified)
            .unwrap_or(false);
        if !prev_verified {
            return Err(AppError::validation(format!(
                "Phase {} must be verified by victim before adding Phase {}",
                phase_index,
                phase_index + 1
            )));
        }
    }

    if let Some(existing) = case.disbursements.get(phase_index) {
        if existing.victim_verified {
            return Err(AppError::conflict(
                format!(
                    "Phase {} has already been verified and can no longer be changed",
                    phase_index + 1
                ),
                None,
            ));
        }
        if references_match(&existing.transaction_id, transaction_id) {
            // Retried request, nothing to change
            return Ok(SaveOutcome {
                phase_index,
                percentage: existing.percentage,
                disbursement_count: case.disbursements.len(),
                status: case.status,
                idempotent: true,
            });
        }
        if !replace {
            return Err(AppError::conflict(
                format!(
                    "Phase {} is already recorded with a different transaction reference; \
                     set replace to overwrite it",
                    phase_index + 1
                ),
                None,
            ));
        }
    }

    if let Some(amount) = approved_amount {
        case.approved_amount = Some(amount);
    }

    let base = approved_amount
        .or(case.approved_amount)
        .unwrap_or(Decimal::ZERO);
    let percentage = PHASE_PERCENTAGES[phase_index];
    let entry = Disbursement {
        amount: base * Decimal::from(percentage) / Decimal::ONE_HUNDRED,
        percentage,
        transaction_id: transaction_id.to_string(),
        disbursed_at: now,
        disbursed_by,
        victim_verified: false,
        victim_verified_at: None,
        victim_entered_txn_id: None,
    };

    if phase_index < case.disbursements.len() {
        case.disbursements[phase_index] = entry;
    } else {
        case.disbursements.push(entry);
    }

    // Status stays as-is until all three phases are saved, then flips to
    // disbursed; closure happens only on full verification.
    if case.disbursements.len() == PHASE_PERCENTAGES.len() {
        case.status = CaseStatus::Disbursed;
    }
    case.touch(now);

    Ok(SaveOutcome {
        phase_index,
        percentage,
        disbursement_count: case.disbursements.len(),
        status: case.status,
        idempotent: false,
    })
}

/// Victim-side verification of a recorded phase.
///
/// On a match the entry is marked verified with the raw entered string kept
/// for audit; when all three phases exist and are verified the case closes.
/// On a mismatch nothing is mutated and the error does not reveal the
/// stored reference.
pub fn verify_disbursement(
    case: &mut Case,
    index: usize,
    entered_txn_id: &str,
    now: DateTime<Utc>,
) -> AppResult<VerifyOutcome> {
    if entered_txn_id.trim().is_empty() {
        return Err(AppError::validation("Transaction ID is required"));
    }

    let len = case.disbursements.len();
    let entry = case
        .disbursements
        .get_mut(index)
        .ok_or_else(|| AppError::not_found("Disbursement not found"))?;

    if !entry.victim_verified {
        if !references_match(&entry.transaction_id, entered_txn_id) {
            return Err(AppError::TransactionMismatch(
                "Transaction ID does not match. Please check the ID from your bank SMS \
                 and try again."
                    .to_string(),
            ));
        }

        entry.victim_verified = true;
        entry.victim_verified_at = Some(now);
        entry.victim_entered_txn_id = Some(entered_txn_id.to_string());
    }

    let all_verified =
        len == PHASE_PERCENTAGES.len() && case.disbursements.iter().all(|d| d.victim_verified);
    if all_verified {
        case.status = CaseStatus::Closed;
    }
    case.touch(now);

    Ok(VerifyOutcome {
        all_verified,
        status: case.status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::sample_case;

    fn officer() -> Uuid {
        Uuid::new_v4()
    }

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    #[test]
    fn schedule_amounts_follow_25_25_50() {
        let mut case = sample_case();
        let by = officer();
        let now = Utc::now();

        save_disbursement(&mut case, None, "TXN1", Some(dec(10_000)), false, by, now).unwrap();
        verify_disbursement(&mut case, 0, "TXN1", now).unwrap();
        save_disbursement(&mut case, None, "TXN2", None, false, by, now).unwrap();
        verify_disbursement(&mut case, 1, "TXN2", now).unwrap();
        save_disbursement(&mut case, None, "TXN3", None, false, by, now).unwrap();

        let amounts: Vec<Decimal> = case.disbursements.iter().map(|d| d.amount).collect();
        assert_eq!(amounts, vec![dec(2_500), dec(2_500), dec(5_000)]);
        let percentages: Vec<u32> = case.disbursements.iter().map(|d| d.percentage).collect();
        assert_eq!(percentages, vec![25, 25, 50]);
    }

    #[test]
    fn phase_two_requires_phase_one_verified() {
        let mut case = sample_case();
        let now = Utc::now();

        save_disbursement(&mut case, None, "TXN1", Some(dec(1000)), false, officer(), now)
            .unwrap();

        let err =
            save_disbursement(&mut case, None, "TXN2", None, false, officer(), now).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg)
            if msg.contains("Phase 1 must be verified by victim")));
    }

    #[test]
    fn fourth_phase_is_rejected() {
        let mut case = sample_case();
        let by = officer();
        let now = Utc::now();

        for (i, txn) in ["A", "B", "C"].iter().enumerate() {
            save_disbursement(&mut case, None, txn, Some(dec(100)), false, by, now).unwrap();
            verify_disbursement(&mut case, i, txn, now).unwrap();
        }

        let err = save_disbursement(&mut case, None, "D", None, false, by, now).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("already been added")));
    }

    #[test]
    fn verification_is_trim_and_case_insensitive_both_directions() {
        let mut case = sample_case();
        let now = Utc::now();

        save_disbursement(&mut case, None, "txn123", Some(dec(100)), false, officer(), now)
            .unwrap();
        let outcome = verify_disbursement(&mut case, 0, " TXN123 ", now).unwrap();
        assert!(case.disbursements[0].victim_verified);
        assert!(!outcome.all_verified);
        // Raw entry kept for audit, unnormalized
        assert_eq!(
            case.disbursements[0].victim_entered_txn_id.as_deref(),
            Some(" TXN123 ")
        );

        let mut case = sample_case();
        save_disbursement(&mut case, None, " TXN123 ", Some(dec(100)), false, officer(), now)
            .unwrap();
        verify_disbursement(&mut case, 0, "txn123", now).unwrap();
        assert!(case.disbursements[0].victim_verified);
    }

    #[test]
    fn mismatch_rejects_without_mutation() {
        let mut case = sample_case();
        let now = Utc::now();

        save_disbursement(&mut case, None, "ABC1", Some(dec(100)), false, officer(), now)
            .unwrap();
        let before = case.disbursements[0].clone();

        let err = verify_disbursement(&mut case, 0, "WRONG", now).unwrap_err();
        assert!(matches!(err, AppError::TransactionMismatch(_)));
        assert!(!case.disbursements[0].victim_verified);
        assert_eq!(
            case.disbursements[0].victim_verified_at,
            before.victim_verified_at
        );
    }

    #[test]
    fn out_of_range_verification_is_not_found() {
        let mut case = sample_case();
        let err = verify_disbursement(&mut case, 0, "TXN", Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn status_becomes_disbursed_on_third_save_and_closed_on_full_verification() {
        let mut case = sample_case();
        let by = officer();
        let now = Utc::now();

        save_disbursement(&mut case, None, "ABC1", Some(dec(10_000)), false, by, now).unwrap();
        assert_ne!(case.status, CaseStatus::Disbursed);
        verify_disbursement(&mut case, 0, "abc1", now).unwrap();

        save_disbursement(&mut case, None, "DEF2", None, false, by, now).unwrap();
        assert_ne!(case.status, CaseStatus::Disbursed);
        verify_disbursement(&mut case, 1, "def2", now).unwrap();

        let outcome = save_disbursement(&mut case, None, "GHI3", None, false, by, now).unwrap();
        assert_eq!(outcome.status, CaseStatus::Disbursed);
        assert_eq!(case.status, CaseStatus::Disbursed);

        let outcome = verify_disbursement(&mut case, 2, "ghi3", now).unwrap();
        assert!(outcome.all_verified);
        assert_eq!(case.status, CaseStatus::Closed);
    }

    #[test]
    fn resave_with_same_reference_is_idempotent() {
        let mut case = sample_case();
        let by = officer();
        let now = Utc::now();

        save_disbursement(&mut case, None, "TXN1", Some(dec(1000)), false, by, now).unwrap();
        let outcome =
            save_disbursement(&mut case, Some(0), " txn1 ", None, false, by, now).unwrap();
        assert!(outcome.idempotent);
        assert_eq!(case.disbursements.len(), 1);
        assert_eq!(case.disbursements[0].transaction_id, "TXN1");
    }

    #[test]
    fn resave_with_different_reference_requires_replace() {
        let mut case = sample_case();
        let by = officer();
        let now = Utc::now();

        save_disbursement(&mut case, None, "TXN1", Some(dec(1000)), false, by, now).unwrap();

        let err =
            save_disbursement(&mut case, Some(0), "OTHER", None, false, by, now).unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));

        save_disbursement(&mut case, Some(0), "OTHER", None, true, by, now).unwrap();
        assert_eq!(case.disbursements[0].transaction_id, "OTHER");
    }

    #[test]
    fn verified_phase_is_immutable() {
        let mut case = sample_case();
        let by = officer();
        let now = Utc::now();

        save_disbursement(&mut case, None, "TXN1", Some(dec(1000)), false, by, now).unwrap();
        verify_disbursement(&mut case, 0, "TXN1", now).unwrap();

        let err = save_disbursement(&mut case, Some(0), "NEW", None, true, by, now).unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
    }

    #[test]
    fn amount_defaults_to_zero_without_approved_amount() {
        let mut case = sample_case();
        save_disbursement(&mut case, None, "TXN1", None, false, officer(), Utc::now()).unwrap();
        assert_eq!(case.disbursements[0].amount, Decimal::ZERO);
    }
}

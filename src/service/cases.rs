//! Relief-case orchestration

use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::domain::case_id::{case_id_prefix, next_case_id};
use crate::domain::ledger::{save_disbursement, verify_disbursement, SaveOutcome, VerifyOutcome};
use crate::domain::status::{assign_officer, natural_next_states, set_status};
use crate::domain::{channel, ledger};
use crate::error::{AppError, AppResult};
use crate::model::{Case, CaseQuery, CaseStatus, Disbursement, QueryType};
use crate::notify::{dispatch, Notifier};
use crate::store::{CaseFilter, CaseStore, StoreError};

use super::MAX_VERSION_RETRIES;

/// Submission payload; everything captured here is immutable afterwards
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NewCase {
    pub aadhaar_number: Option<String>,
    pub mobile_number: Option<String>,
    pub email: Option<String>,
    pub fir_case_number: Option<String>,
    pub police_station: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub date_of_incident: Option<NaiveDate>,
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
    pub account_holder_name: Option<String>,
    pub account_number: Option<String>,
    pub ifsc_code: Option<String>,
    pub bank_name: Option<String>,
}

/// Recording payload for one disbursement phase
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SaveDisbursementRequest {
    /// Zero-based phase index; defaults to the next phase
    pub phase: Option<usize>,
    pub transaction_id: Option<String>,
    pub approved_amount: Option<Decimal>,
    /// Required to overwrite an unverified phase with a new reference
    #[serde(default)]
    pub replace: bool,
}

/// Public tracking snapshot; omits identity and bank details
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TrackView {
    pub case_id: String,
    pub status: CaseStatus,
    pub district: String,
    pub state: String,
    pub assigned: bool,
    pub approved_amount: Option<Decimal>,
    pub disbursements: Vec<Disbursement>,
    pub queries: Vec<CaseQuery>,
    pub natural_next_states: Vec<CaseStatus>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrackView {
    fn of(case: &Case) -> Self {
        TrackView {
            case_id: case.case_id.clone(),
            status: case.status,
            district: case.district.clone(),
            state: case.state.clone(),
            assigned: case.assigned_officer.is_some(),
            approved_amount: case.approved_amount,
            disbursements: case.disbursements.clone(),
            queries: case.queries.clone(),
            natural_next_states: natural_next_states(case.status).to_vec(),
            submitted_at: case.submitted_at,
            updated_at: case.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct CaseService {
    store: Arc<dyn CaseStore>,
    notifier: Arc<dyn Notifier>,
}

fn required<'a>(value: &'a Option<String>, label: &str) -> AppResult<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::validation(format!("{label} is required"))),
    }
}

fn require_reviewer(user: &AuthUser) -> AppResult<()> {
    if user.is_reviewer() {
        Ok(())
    } else {
        Err(AppError::forbidden("Only reviewing officers may do this"))
    }
}

impl CaseService {
    pub fn new(store: Arc<dyn CaseStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Read-modify-write cycle with a bounded retry on version conflicts.
    /// The closure must be safe to re-run against a freshly loaded case.
    async fn with_case<T, F>(&self, id: Uuid, op: F) -> AppResult<(Case, T)>
    where
        F: Fn(&mut Case) -> AppResult<T>,
    {
        let mut attempt = 0;
        loop {
            let mut case = self
                .store
                .case_by_id(id)
                .await?
                .ok_or_else(|| AppError::not_found("Case not found"))?;
            let expected = case.version;
            let outcome = op(&mut case)?;

            match self.store.save_case(&case, expected).await {
                Ok(()) => {
                    case.version = expected + 1;
                    return Ok((case, outcome));
                }
                Err(StoreError::VersionConflict) => {
                    attempt += 1;
                    if attempt >= MAX_VERSION_RETRIES {
                        return Err(StoreError::VersionConflict.into());
                    }
                    tracing::warn!(case = %id, attempt, "version conflict, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub async fn submit_case(&self, user: &AuthUser, input: NewCase) -> AppResult<Case> {
        let aadhaar = required(&input.aadhaar_number, "Aadhaar number")?.to_string();
        let mobile = required(&input.mobile_number, "Mobile number")?.to_string();
        let fir = required(&input.fir_case_number, "FIR case number")?.to_string();
        let police_station = required(&input.police_station, "Police station")?.to_string();
        let district = required(&input.district, "District")?.to_string();
        let state = required(&input.state, "State")?.to_string();
        let date_of_incident = input
            .date_of_incident
            .ok_or_else(|| AppError::validation("Date of incident is required"))?;
        let account_holder = required(&input.account_holder_name, "Account holder name")?
            .to_string();
        let account_number = required(&input.account_number, "Account number")?.to_string();
        let ifsc = required(&input.ifsc_code, "IFSC code")?.to_string();

        if let Some(existing) = self.store.case_by_fir_number(&fir).await? {
            return Err(AppError::conflict(
                "A case with this FIR number has already been filed",
                Some(existing.case_id),
            ));
        }

        let now = Utc::now();
        let prefix = case_id_prefix(&district, now.year());

        // Scan-then-insert: the unique index on case_id is the backstop for
        // a concurrent submission in the same district.
        let mut last_err = None;
        for _ in 0..MAX_VERSION_RETRIES {
            let latest = self.store.latest_case_id_with_prefix(&prefix).await?;
            let case_id = next_case_id(&prefix, latest.as_deref());

            let case = Case {
                id: Uuid::new_v4(),
                case_id,
                filer_id: user.id,
                aadhaar_number: aadhaar.clone(),
                mobile_number: mobile.clone(),
                email: input.email.clone(),
                fir_case_number: fir.clone(),
                police_station: police_station.clone(),
                district: district.clone(),
                state: state.clone(),
                date_of_incident,
                date_of_fir_registration: input.date_of_fir_registration,
                type_of_atrocity: input.type_of_atrocity.clone(),
                caste_category: input.caste_category.clone(),
                caste_certificate_number: input.caste_certificate_number.clone(),
                village: input.village.clone(),
                pincode: input.pincode.clone(),
                witness_name: input.witness_name.clone(),
                witness_contact: input.witness_contact.clone(),
                delay_reason: input.delay_reason.clone(),
                incident_description: input.incident_description.clone(),
                relief_amount_requested: input.relief_amount_requested,
                account_holder_name: account_holder.clone(),
                account_number: account_number.clone(),
                ifsc_code: ifsc.clone(),
                bank_name: input.bank_name.clone(),
                status: CaseStatus::Pending,
                assigned_officer: None,
                approved_amount: None,
                disbursements: Vec::new(),
                queries: Vec::new(),
                version: 0,
                submitted_at: now,
                updated_at: now,
            };

            match self.store.insert_case(&case).await {
                Ok(()) => {
                    tracing::info!(case_id = %case.case_id, "case submitted");
                    if let Some(email) = &case.email {
                        dispatch(
                            Arc::clone(&self.notifier),
                            email.clone(),
                            format!("Relief case {} submitted", case.case_id),
                            format!(
                                "Your relief case has been registered with ID {}. \
                                 Use it to track progress at any time.",
                                case.case_id
                            ),
                        );
                    }
                    return Ok(case);
                }
                // Lost the sequence race: rescan under the same prefix
                Err(StoreError::Duplicate { field, .. }) if field == "case ID" => {
                    last_err = Some(StoreError::Duplicate {
                        field,
                        existing_case_id: None,
                    });
                }
                Err(StoreError::Duplicate { field, .. }) if field == "FIR number" => {
                    let existing = self
                        .store
                        .case_by_fir_number(&fir)
                        .await?
                        .map(|c| c.case_id);
                    return Err(AppError::conflict(
                        "A case with this FIR number has already been filed",
                        existing,
                    ));
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(last_err
            .map(AppError::from)
            .unwrap_or_else(|| AppError::Internal(anyhow::anyhow!("case id generation failed"))))
    }

    pub async fn get_case(&self, user: &AuthUser, id: Uuid) -> AppResult<Case> {
        let case = self
            .store
            .case_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Case not found"))?;
        if !user.is_reviewer() && case.filer_id != user.id {
            return Err(AppError::forbidden("You do not have access to this case"));
        }
        Ok(case)
    }

    /// Public progress lookup by the human-facing case id
    pub async fn track(&self, case_id: &str) -> AppResult<TrackView> {
        let case = self
            .store
            .case_by_case_id(case_id.trim())
            .await?
            .ok_or_else(|| AppError::not_found("Case not found"))?;
        Ok(TrackView::of(&case))
    }

    pub async fn list_cases(
        &self,
        user: &AuthUser,
        status: Option<&str>,
        assigned_to_me: bool,
    ) -> AppResult<Vec<Case>> {
        require_reviewer(user)?;
        let status = status
            .map(|s| s.parse::<CaseStatus>())
            .transpose()
            .map_err(AppError::Validation)?;
        let filter = CaseFilter {
            status,
            assigned_officer: assigned_to_me.then_some(user.id),
        };
        Ok(self.store.list_cases(&filter).await?)
    }

    pub async fn my_cases(&self, user: &AuthUser) -> AppResult<Vec<Case>> {
        Ok(self.store.cases_by_filer(user.id).await?)
    }

    pub async fn set_status(&self, user: &AuthUser, id: Uuid, status: &str) -> AppResult<Case> {
        require_reviewer(user)?;
        let target: CaseStatus = status.parse().map_err(AppError::Validation)?;
        let (case, _) = self
            .with_case(id, |case| {
                set_status(case, target, Utc::now());
                Ok(())
            })
            .await?;
        tracing::info!(case_id = %case.case_id, status = %case.status, "status updated");
        self.notify_filer(
            &case,
            format!("Case {} status updated", case.case_id),
            format!("Your case is now marked: {}.", case.status),
        );
        Ok(case)
    }

    pub async fn assign(&self, user: &AuthUser, id: Uuid, officer: Uuid) -> AppResult<Case> {
        require_reviewer(user)?;
        let (case, _) = self
            .with_case(id, |case| {
                assign_officer(case, officer, Utc::now());
                Ok(())
            })
            .await?;
        tracing::info!(case_id = %case.case_id, officer = %officer, "officer assigned");
        Ok(case)
    }

    pub async fn raise_query(
        &self,
        user: &AuthUser,
        id: Uuid,
        query_type: QueryType,
        message: &str,
        high_priority: bool,
    ) -> AppResult<(Case, usize)> {
        require_reviewer(user)?;
        let asked_by = user.id;
        let (case, index) = self
            .with_case(id, |case| {
                channel::raise_query(
                    case,
                    query_type,
                    message,
                    high_priority,
                    asked_by,
                    Utc::now(),
                )
            })
            .await?;
        self.notify_filer(
            &case,
            format!("Action required on case {}", case.case_id),
            format!(
                "An officer has raised a query on your case: {}",
                case.queries[index].message
            ),
        );
        Ok((case, index))
    }

    /// Public: the filer answers a query, identified by knowledge of the
    /// case record
    pub async fn respond_to_query(
        &self,
        id: Uuid,
        index: usize,
        response: &str,
    ) -> AppResult<Case> {
        let (case, _) = self
            .with_case(id, |case| {
                channel::respond_to_query(case, index, response, Utc::now())
            })
            .await?;
        Ok(case)
    }

    pub async fn resolve_query(&self, user: &AuthUser, id: Uuid, index: usize) -> AppResult<Case> {
        require_reviewer(user)?;
        let (case, _) = self
            .with_case(id, |case| channel::resolve_query(case, index, Utc::now()))
            .await?;
        Ok(case)
    }

    pub async fn save_disbursement(
        &self,
        user: &AuthUser,
        id: Uuid,
        request: SaveDisbursementRequest,
    ) -> AppResult<(Case, SaveOutcome, String)> {
        require_reviewer(user)?;
        let transaction_id = required(&request.transaction_id, "Transaction ID")?.to_string();
        let disbursed_by = user.id;
        let (case, outcome) = self
            .with_case(id, |case| {
                save_disbursement(
                    case,
                    request.phase,
                    &transaction_id,
                    request.approved_amount,
                    request.replace,
                    disbursed_by,
                    Utc::now(),
                )
            })
            .await?;

        let message = format!(
            "Phase {} ({}%) disbursement saved successfully",
            outcome.phase_index + 1,
            outcome.percentage
        );
        tracing::info!(
            case_id = %case.case_id,
            phase = outcome.phase_index + 1,
            idempotent = outcome.idempotent,
            "disbursement recorded"
        );
        if !outcome.idempotent {
            self.notify_filer(
                &case,
                format!("Funds released on case {}", case.case_id),
                format!(
                    "Phase {} ({}% of the approved amount) has been transferred to your \
                     bank account. Verify the transaction ID from your bank SMS on the portal.",
                    outcome.phase_index + 1,
                    outcome.percentage
                ),
            );
        }
        Ok((case, outcome, message))
    }

    /// Public: the victim confirms receipt by entering the bank reference
    pub async fn verify_disbursement(
        &self,
        id: Uuid,
        index: usize,
        entered_txn_id: &str,
    ) -> AppResult<(Case, VerifyOutcome, String)> {
        let entered = entered_txn_id.to_string();
        let (case, outcome) = self
            .with_case(id, |case| {
                verify_disbursement(case, index, &entered, Utc::now())
            })
            .await?;

        let message = if outcome.all_verified {
            "All transactions verified. Case closed.".to_string()
        } else {
            format!(
                "Phase {} verified successfully ({} of {} phases verified)",
                index + 1,
                case.disbursements.iter().filter(|d| d.victim_verified).count(),
                ledger::PHASE_PERCENTAGES.len()
            )
        };
        tracing::info!(
            case_id = %case.case_id,
            phase = index + 1,
            all_verified = outcome.all_verified,
            "disbursement verified"
        );
        Ok((case, outcome, message))
    }

    fn notify_filer(&self, case: &Case, subject: String, body: String) {
        if let Some(email) = &case.email {
            dispatch(Arc::clone(&self.notifier), email.clone(), subject, body);
        }
    }
}

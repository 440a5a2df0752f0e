//! Grievance-ticket orchestration
//!
//! Tickets are complaints raised against an existing relief case. They are
//! simpler than cases: no versioned saves, a global atomic sequence for the
//! human-facing id, and a short status ladder.

use std::sync::Arc;

use chrono::{Datelike, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::domain::case_id::format_ticket_id;
use crate::error::{AppError, AppResult};
use crate::model::{Ticket, TicketCategory, TicketResponse, TicketStatus};
use crate::notify::{dispatch, Notifier};
use crate::store::{CaseStore, TicketFilter};

const MAX_SUBJECT_LEN: usize = 200;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NewTicket {
    pub case_id: Option<String>,
    pub category: Option<TicketCategory>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub attachment: Option<String>,
}

#[derive(Clone)]
pub struct TicketService {
    store: Arc<dyn CaseStore>,
    notifier: Arc<dyn Notifier>,
}

fn require_reviewer(user: &AuthUser) -> AppResult<()> {
    if user.is_reviewer() {
        Ok(())
    } else {
        Err(AppError::forbidden("Only reviewing officers may do this"))
    }
}

impl TicketService {
    pub fn new(store: Arc<dyn CaseStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    pub async fn create(&self, user: &AuthUser, input: NewTicket) -> AppResult<Ticket> {
        let case_id = input
            .case_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::validation("Case ID is required"))?;
        let category = input
            .category
            .ok_or_else(|| AppError::validation("Category is required"))?;
        let subject = input
            .subject
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::validation("Subject is required"))?;
        if subject.len() > MAX_SUBJECT_LEN {
            return Err(AppError::validation(format!(
                "Subject must be at most {MAX_SUBJECT_LEN} characters"
            )));
        }
        let description = input
            .description
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::validation("Description is required"))?;

        let case = self
            .store
            .case_by_case_id(case_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(
                    "Invalid Case ID. Please check the case ID on your acknowledgement.",
                )
            })?;

        let now = Utc::now();
        let seq = self.store.next_ticket_sequence().await?;
        let ticket = Ticket {
            id: Uuid::new_v4(),
            ticket_id: format_ticket_id(now.year(), seq),
            case_id: case.case_id.clone(),
            filer_id: user.id,
            category,
            subject: subject.to_string(),
            description: description.to_string(),
            attachment: input.attachment,
            status: TicketStatus::Open,
            responses: Vec::new(),
            assigned_officer: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_ticket(&ticket).await?;

        tracing::info!(ticket_id = %ticket.ticket_id, case_id = %ticket.case_id, "ticket created");
        if let Some(email) = user.email.as_deref().or(case.email.as_deref()) {
            dispatch(
                Arc::clone(&self.notifier),
                email.to_string(),
                format!("Grievance ticket {} registered", ticket.ticket_id),
                format!(
                    "Your grievance against case {} has been registered with ticket ID {}.",
                    ticket.case_id, ticket.ticket_id
                ),
            );
        }
        Ok(ticket)
    }

    /// Public lookup by the human-facing ticket id
    pub async fn track(&self, ticket_id: &str) -> AppResult<Ticket> {
        self.store
            .ticket_by_ticket_id(ticket_id.trim())
            .await?
            .ok_or_else(|| AppError::not_found("Ticket not found"))
    }

    pub async fn get(&self, user: &AuthUser, id: Uuid) -> AppResult<Ticket> {
        let ticket = self
            .store
            .ticket_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Ticket not found"))?;
        if !user.is_reviewer() && ticket.filer_id != user.id {
            return Err(AppError::forbidden("You do not have access to this ticket"));
        }
        Ok(ticket)
    }

    pub async fn mine(&self, user: &AuthUser) -> AppResult<Vec<Ticket>> {
        Ok(self.store.tickets_by_filer(user.id).await?)
    }

    pub async fn list(
        &self,
        user: &AuthUser,
        status: Option<&str>,
        category: Option<&str>,
        case_id: Option<String>,
    ) -> AppResult<Vec<Ticket>> {
        require_reviewer(user)?;
        let filter = TicketFilter {
            status: status
                .map(|s| s.parse::<TicketStatus>())
                .transpose()
                .map_err(AppError::Validation)?,
            category: category
                .map(|c| c.parse::<TicketCategory>())
                .transpose()
                .map_err(AppError::Validation)?,
            case_id,
        };
        Ok(self.store.list_tickets(&filter).await?)
    }

    /// Officer reply; an open ticket moves to under_review and the
    /// responding officer becomes the assignee if none is set
    pub async fn respond(&self, user: &AuthUser, id: Uuid, message: &str) -> AppResult<Ticket> {
        require_reviewer(user)?;
        if message.trim().is_empty() {
            return Err(AppError::validation("Response message is required"));
        }

        let mut ticket = self
            .store
            .ticket_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Ticket not found"))?;

        let now = Utc::now();
        ticket.responses.push(TicketResponse {
            message: message.trim().to_string(),
            responded_by: user.id,
            responded_at: now,
        });
        if ticket.assigned_officer.is_none() {
            ticket.assigned_officer = Some(user.id);
        }
        if ticket.status == TicketStatus::Open {
            ticket.status = TicketStatus::UnderReview;
        }
        ticket.updated_at = now;
        self.store.save_ticket(&ticket).await?;

        tracing::info!(ticket_id = %ticket.ticket_id, "ticket response added");
        Ok(ticket)
    }

    pub async fn set_status(&self, user: &AuthUser, id: Uuid, status: &str) -> AppResult<Ticket> {
        require_reviewer(user)?;
        let target: TicketStatus = status.parse().map_err(AppError::Validation)?;

        let mut ticket = self
            .store
            .ticket_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Ticket not found"))?;

        let now = Utc::now();
        ticket.status = target;
        ticket.resolved_at = match target {
            TicketStatus::Resolved | TicketStatus::Closed => ticket.resolved_at.or(Some(now)),
            _ => None,
        };
        ticket.updated_at = now;
        self.store.save_ticket(&ticket).await?;

        tracing::info!(ticket_id = %ticket.ticket_id, status = %target.as_str(), "ticket status updated");
        Ok(ticket)
    }
}

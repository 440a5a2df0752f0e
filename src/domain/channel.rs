//! Officer/victim query channel
//!
//! An ordered, index-addressed message thread on the case. Officers raise
//! queries, the filer responds, officers resolve. Responding and resolving
//! are permissive about the prior status; only index bounds and non-empty
//! text are enforced.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::model::{Case, CaseQuery, QueryStatus, QueryType};

/// Append a new query in `action_required` state; returns its index
pub fn raise_query(
    case: &mut Case,
    query_type: QueryType,
    message: &str,
    high_priority: bool,
    asked_by: Uuid,
    now: DateTime<Utc>,
) -> AppResult<usize> {
    if message.trim().is_empty() {
        return Err(AppError::validation("Query message is required"));
    }

    case.queries.push(CaseQuery {
        query_type,
        message: message.trim().to_string(),
        high_priority,
        status: QueryStatus::ActionRequired,
        asked_by,
        asked_at: now,
        response: None,
        responded_at: None,
    });
    case.touch(now);

    Ok(case.queries.len() - 1)
}

/// Record the filer's response and move the query to `waiting_review`
pub fn respond_to_query(
    case: &mut Case,
    index: usize,
    response: &str,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if response.trim().is_empty() {
        return Err(AppError::validation("Response is required"));
    }

    let query = case
        .queries
        .get_mut(index)
        .ok_or_else(|| AppError::not_found("Query not found"))?;

    query.response = Some(response.trim().to_string());
    query.responded_at = Some(now);
    query.status = QueryStatus::WaitingReview;
    case.touch(now);

    Ok(())
}

/// Close a query after inspecting the response. Accepted from any prior
/// status.
pub fn resolve_query(case: &mut Case, index: usize, now: DateTime<Utc>) -> AppResult<()> {
    let query = case
        .queries
        .get_mut(index)
        .ok_or_else(|| AppError::not_found("Query not found"))?;

    query.status = QueryStatus::Resolved;
    case.touch(now);

    Ok(())
}

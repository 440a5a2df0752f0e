//! In-memory `CaseStore` used by the lifecycle integration tests
//!
//! Mirrors the Postgres semantics that matter to callers: case-id and FIR
//! uniqueness, versioned saves, and the atomic ticket counter.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CaseFilter, CaseStore, StoreError, TicketFilter};
use crate::domain::case_id::sequence_of;
use crate::model::{Case, CaseDocument, Ticket};

#[derive(Default)]
struct Inner {
    cases: HashMap<Uuid, Case>,
    tickets: HashMap<Uuid, Ticket>,
    documents: Vec<CaseDocument>,
    ticket_seq: i64,
}

/// Single-process store with the same observable behavior as `PgCaseStore`
#[derive(Default)]
pub struct MemoryCaseStore {
    inner: RwLock<Inner>,
}

impl MemoryCaseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CaseStore for MemoryCaseStore {
    async fn insert_case(&self, case: &Case) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;

        if inner.cases.values().any(|c| c.case_id == case.case_id) {
            return Err(StoreError::Duplicate {
                field: "case ID".to_string(),
                existing_case_id: None,
            });
        }
        if let Some(existing) = inner
            .cases
            .values()
            .find(|c| c.fir_case_number == case.fir_case_number)
        {
            return Err(StoreError::Duplicate {
                field: "FIR number".to_string(),
                existing_case_id: Some(existing.case_id.clone()),
            });
        }

        inner.cases.insert(case.id, case.clone());
        Ok(())
    }

    async fn case_by_id(&self, id: Uuid) -> Result<Option<Case>, StoreError> {
        Ok(self.inner.read().await.cases.get(&id).cloned())
    }

    async fn case_by_case_id(&self, case_id: &str) -> Result<Option<Case>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .cases
            .values()
            .find(|c| c.case_id == case_id)
            .cloned())
    }

    async fn case_by_fir_number(
        &self,
        fir_case_number: &str,
    ) -> Result<Option<Case>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .cases
            .values()
            .find(|c| c.fir_case_number == fir_case_number)
            .cloned())
    }

    async fn save_case(&self, case: &Case, expected_version: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let stored = inner.cases.get_mut(&case.id).ok_or(StoreError::NotFound)?;
        if stored.version != expected_version {
            return Err(StoreError::VersionConflict);
        }
        let mut updated = case.clone();
        updated.version = expected_version + 1;
        *stored = updated;
        Ok(())
    }

    async fn list_cases(&self, filter: &CaseFilter) -> Result<Vec<Case>, StoreError> {
        let inner = self.inner.read().await;
        let mut cases: Vec<Case> = inner
            .cases
            .values()
            .filter(|c| filter.status.map_or(true, |s| c.status == s))
            .filter(|c| {
                filter
                    .assigned_officer
                    .map_or(true, |o| c.assigned_officer == Some(o))
            })
            .cloned()
            .collect();
        cases.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(cases)
    }

    async fn cases_by_filer(&self, filer_id: Uuid) -> Result<Vec<Case>, StoreError> {
        let inner = self.inner.read().await;
        let mut cases: Vec<Case> = inner
            .cases
            .values()
            .filter(|c| c.filer_id == filer_id)
            .cloned()
            .collect();
        cases.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(cases)
    }

    async fn latest_case_id_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<String>, StoreError> {
        let inner = self.inner.read().await;
        let latest = inner
            .cases
            .values()
            .map(|c| c.case_id.as_str())
            .filter(|id| id.starts_with(prefix) && id[prefix.len()..].starts_with('-'))
            .max_by_key(|id| sequence_of(id).unwrap_or(0))
            .map(str::to_string);
        Ok(latest)
    }

    async fn next_ticket_sequence(&self) -> Result<i64, StoreError> {
        let mut inner = self.inner.write().await;
        inner.ticket_seq += 1;
        Ok(inner.ticket_seq)
    }

    async fn insert_ticket(&self, ticket: &Ticket) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner
            .tickets
            .values()
            .any(|t| t.ticket_id == ticket.ticket_id)
        {
            return Err(StoreError::Duplicate {
                field: "ticket ID".to_string(),
                existing_case_id: None,
            });
        }
        inner.tickets.insert(ticket.id, ticket.clone());
        Ok(())
    }

    async fn ticket_by_id(&self, id: Uuid) -> Result<Option<Ticket>, StoreError> {
        Ok(self.inner.read().await.tickets.get(&id).cloned())
    }

    async fn ticket_by_ticket_id(&self, ticket_id: &str) -> Result<Option<Ticket>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .tickets
            .values()
            .find(|t| t.ticket_id == ticket_id)
            .cloned())
    }

    async fn save_ticket(&self, ticket: &Ticket) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .tickets
            .get_mut(&ticket.id)
            .ok_or(StoreError::NotFound)?;
        *stored = ticket.clone();
        Ok(())
    }

    async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, StoreError> {
        let inner = self.inner.read().await;
        let needle = filter.case_id.as_deref().map(str::to_lowercase);
        let mut tickets: Vec<Ticket> = inner
            .tickets
            .values()
            .filter(|t| filter.status.map_or(true, |s| t.status == s))
            .filter(|t| filter.category.map_or(true, |c| t.category == c))
            .filter(|t| {
                needle
                    .as_deref()
                    .map_or(true, |n| t.case_id.to_lowercase().contains(n))
            })
            .cloned()
            .collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tickets)
    }

    async fn tickets_by_filer(&self, filer_id: Uuid) -> Result<Vec<Ticket>, StoreError> {
        let inner = self.inner.read().await;
        let mut tickets: Vec<Ticket> = inner
            .tickets
            .values()
            .filter(|t| t.filer_id == filer_id)
            .cloned()
            .collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tickets)
    }

    async fn insert_document(&self, doc: &CaseDocument) -> Result<(), StoreError> {
        self.inner.write().await.documents.push(doc.clone());
        Ok(())
    }

    async fn documents_for_case(&self, case_pk: Uuid) -> Result<Vec<CaseDocument>, StoreError> {
        let inner = self.inner.read().await;
        let mut docs: Vec<CaseDocument> = inner
            .documents
            .iter()
            .filter(|d| d.case_pk == case_pk)
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::sample_case;

    #[tokio::test]
    async fn duplicate_fir_reports_existing_case_id() {
        let store = MemoryCaseStore::new();
        let first = sample_case();
        store.insert_case(&first).await.unwrap();

        let mut second = sample_case();
        second.id = Uuid::new_v4();
        second.case_id = "DBT-2024-SOUTHDELHI-002".to_string();

        let err = store.insert_case(&second).await.unwrap_err();
        match err {
            StoreError::Duplicate {
                field,
                existing_case_id,
            } => {
                assert_eq!(field, "FIR number");
                assert_eq!(existing_case_id.as_deref(), Some(first.case_id.as_str()));
            }
            other => panic!("expected Duplicate, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stale_version_is_rejected() {
        let store = MemoryCaseStore::new();
        let case = sample_case();
        store.insert_case(&case).await.unwrap();

        store.save_case(&case, 0).await.unwrap();

        // A writer still holding version 0 loses
        let err = store.save_case(&case, 0).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict));

        let stored = store.case_by_id(case.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn latest_case_id_tracks_highest_sequence() {
        let store = MemoryCaseStore::new();
        for (i, seq) in [3u32, 1, 2].iter().enumerate() {
            let mut case = sample_case();
            case.id = Uuid::new_v4();
            case.case_id = format!("DBT-2024-SOUTHDELHI-{seq:03}");
            case.fir_case_number = format!("FIR-{i}");
            store.insert_case(&case).await.unwrap();
        }

        let latest = store
            .latest_case_id_with_prefix("DBT-2024-SOUTHDELHI")
            .await
            .unwrap();
        assert_eq!(latest.as_deref(), Some("DBT-2024-SOUTHDELHI-003"));

        let none = store
            .latest_case_id_with_prefix("DBT-2024-MUMBAI")
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn ticket_sequence_is_monotonic() {
        let store = MemoryCaseStore::new();
        assert_eq!(store.next_ticket_sequence().await.unwrap(), 1);
        assert_eq!(store.next_ticket_sequence().await.unwrap(), 2);
    }
}

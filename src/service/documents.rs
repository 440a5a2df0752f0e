//! Supporting-document uploads
//!
//! Evidence arrives as base64 JSON (no multipart); bytes go to the blob
//! store keyed under the case id, metadata goes to the case store. A blob
//! store failure is a dependency error, never an internal one.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::blob_store::BlobStore;
use crate::error::{AppError, AppResult};
use crate::model::CaseDocument;
use crate::store::CaseStore;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DocumentUpload {
    pub document_type: Option<String>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    /// Base64-encoded file content
    pub content: Option<String>,
}

#[derive(Clone)]
pub struct DocumentService {
    store: Arc<dyn CaseStore>,
    blobs: Arc<dyn BlobStore>,
}

impl DocumentService {
    pub fn new(store: Arc<dyn CaseStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }

    pub async fn upload(
        &self,
        user: &AuthUser,
        case_pk: Uuid,
        input: DocumentUpload,
    ) -> AppResult<CaseDocument> {
        let document_type = input
            .document_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::validation("Document type is required"))?;
        let file_name = input
            .file_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::validation("File name is required"))?;
        let mime_type = input
            .mime_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("application/octet-stream");
        let content = input
            .content
            .as_deref()
            .ok_or_else(|| AppError::validation("File content is required"))?;
        let bytes = BASE64
            .decode(content)
            .map_err(|_| AppError::validation("File content must be base64 encoded"))?;
        if bytes.is_empty() {
            return Err(AppError::validation("File content is empty"));
        }

        let case = self
            .store
            .case_by_id(case_pk)
            .await?
            .ok_or_else(|| AppError::not_found("Case not found"))?;
        if case.filer_id != user.id && !user.is_reviewer() {
            return Err(AppError::forbidden("You do not have access to this case"));
        }

        let doc_id = Uuid::new_v4();
        let key = format!("{}/{}_{}", case.case_id, doc_id, file_name);
        let blob_ref = self
            .blobs
            .store(&key, &bytes)
            .await
            .map_err(|e| AppError::Dependency(format!("document storage failed: {e}")))?;

        let doc = CaseDocument {
            id: doc_id,
            case_pk: case.id,
            document_type: document_type.to_string(),
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            blob_ref,
            uploaded_by: user.id,
            uploaded_at: Utc::now(),
        };
        self.store.insert_document(&doc).await?;

        tracing::info!(case_id = %case.case_id, file = %doc.file_name, "document uploaded");
        Ok(doc)
    }

    pub async fn list(&self, user: &AuthUser, case_pk: Uuid) -> AppResult<Vec<CaseDocument>> {
        let case = self
            .store
            .case_by_id(case_pk)
            .await?
            .ok_or_else(|| AppError::not_found("Case not found"))?;
        if case.filer_id != user.id && !user.is_reviewer() {
            return Err(AppError::forbidden("You do not have access to this case"));
        }
        Ok(self.store.documents_for_case(case.id).await?)
    }
}

//! Apex REST client for the tank bulk-load resource.
//!
//! The org exposes one resource that answers two calls:
//!
//! - `GET  /services/apexrest/{resource}` lists the tank types
//! - `POST /services/apexrest/{resource}` creates all tanks of a batch in
//!   one transaction
//!
//! # Security
//!
//! Request bodies contain customer data and are never logged; only method,
//! path, status and row counts are.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::AppError;
use crate::ingest::SubmissionBatch;
use crate::salesforce::client::SalesforceClient;

/// Apex class exposing the bulk-load resource.
pub const DEFAULT_APEX_RESOURCE: &str = "CargaMasivaTanquesCSV";

// ─────────────────────────────────────────────────────────────────────────────
// Public Types
// ─────────────────────────────────────────────────────────────────────────────

/// A tank type the user can assign to the uploaded tanks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
}

/// What the server said about an accepted batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BatchReceipt {
    /// Number of records the org reports as created, when it reports one.
    #[serde(default)]
    pub created: Option<u64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal Wire Types
// ─────────────────────────────────────────────────────────────────────────────

/// Standard Salesforce REST error entry.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSalesforceError {
    message: String,
    #[serde(default)]
    error_code: Option<String>,
}

/// Error payload shapes the resource may answer with.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireErrorPayload {
    /// `[{"errorCode": "...", "message": "..."}]`
    List(Vec<WireSalesforceError>),
    /// `{"body": {"message": "..."}}`
    Wrapped { body: WireSalesforceError },
    /// `{"message": "..."}`
    Single(WireSalesforceError),
}

/// Extracts the first human-readable message from an error body.
pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let payload: WireErrorPayload = serde_json::from_str(body).ok()?;
    let error = match payload {
        WireErrorPayload::List(errors) => errors.into_iter().next()?,
        WireErrorPayload::Wrapped { body } => body,
        WireErrorPayload::Single(error) => error,
    };

    if let Some(code) = &error.error_code {
        warn!("[APEX] Salesforce error code {}", code);
    }

    let message = error.message.trim();
    (!message.is_empty()).then(|| message.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// ApexUploadClient
// ─────────────────────────────────────────────────────────────────────────────

/// Client for the tank bulk-load Apex resource.
#[derive(Clone)]
pub struct ApexUploadClient {
    client: SalesforceClient,
    resource_path: String,
}

impl ApexUploadClient {
    /// Creates a client for `/services/apexrest/{resource}`.
    pub fn new(client: SalesforceClient, resource: &str) -> Self {
        Self {
            client,
            resource_path: format!("/services/apexrest/{}", resource.trim_matches('/')),
        }
    }

    /// Fetches the available tank types.
    ///
    /// # Errors
    ///
    /// - `AppError::CategoryLookupFailed` - non-2xx answer or unreadable body
    /// - `AppError::SessionExpired` / `AppError::ConnectionFailed` - transport
    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let response = self
            .client
            .request_authed(Method::GET, &self.resource_path, None)
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = extract_error_message(&body).unwrap_or_else(|| {
                format!(
                    "HTTP {} - {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown error")
                )
            });
            return Err(AppError::CategoryLookupFailed(message));
        }

        let categories: Vec<Category> = response.json().await.map_err(|e| {
            AppError::CategoryLookupFailed(format!("Failed to parse tank types: {}", e))
        })?;

        info!("[APEX] Loaded {} tank types", categories.len());
        Ok(categories)
    }

    /// Creates every tank of the batch in a single call.
    ///
    /// The write is not idempotent; callers must not retry it blindly.
    ///
    /// # Errors
    ///
    /// - `AppError::SubmissionFailed` - the org rejected the batch; carries the
    ///   payload message when one is present
    /// - `AppError::SessionExpired` / `AppError::ConnectionFailed` - transport
    pub async fn create_records_batch(
        &self,
        batch: &SubmissionBatch,
    ) -> Result<BatchReceipt, AppError> {
        let body = serde_json::to_vec(batch)
            .map_err(|e| AppError::Internal(format!("Failed to serialize batch: {}", e)))?;

        info!("[APEX] Submitting batch of {} tanks", batch.len());

        let response = self
            .client
            .request_authed(Method::POST, &self.resource_path, Some(body))
            .await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            warn!("[APEX] Batch rejected with HTTP {}", status.as_u16());
            return Err(AppError::SubmissionFailed(extract_error_message(&text)));
        }

        // Void Apex methods answer with an empty body.
        let receipt = serde_json::from_str::<BatchReceipt>(&text).unwrap_or_default();
        Ok(receipt)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! Invoice model.

use crate::models::month::BillingMonth;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A persisted invoice. Read-only after creation; superseding means issuing a
/// new invoice, never editing this row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub invoice_id: Uuid,
    /// Unique, generated, immutable. Never reused even across deletions.
    pub invoice_number: String,
    pub client_id: Uuid,
    /// Rendered label of the covered months, e.g. "January 2025, February 2025".
    pub months_label: String,
    pub created_date: NaiveDate,
    /// Location of the rendered document in the artifact store.
    pub artifact_path: String,
    pub created_utc: DateTime<Utc>,
}

/// Record handed to the repository once the document has been rendered and
/// stored. Insertion either fully succeeds or leaves no trace.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub invoice_number: String,
    pub client_id: Uuid,
    pub months_label: String,
    pub created_date: NaiveDate,
    pub artifact_path: String,
}

/// Create request as it arrives over the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateInvoiceRequest {
    pub client_id: Uuid,
    pub months: Vec<BillingMonth>,
}

/// Preview request: same shape, nothing is persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct PreviewRequest {
    pub client_id: Uuid,
    pub months: Vec<BillingMonth>,
}

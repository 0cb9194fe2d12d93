//! Client account model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A billed client. Managed elsewhere in the backend; this service reads it
/// for existence checks and the invoice bill-to block.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub client_id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub active: bool,
    pub created_utc: DateTime<Utc>,
}

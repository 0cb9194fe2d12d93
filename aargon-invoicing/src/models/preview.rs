//! Ephemeral preview output of the billing period calculator. Never persisted;
//! exists only for the duration of a preview or create request.

use crate::models::month::BillingMonth;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One service assignment's prorated charge within a single month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceLineItem {
    pub assignment_id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub description: Option<String>,
    pub link_capacity: Option<String>,
    pub rate: Option<Decimal>,
    pub billing_start_date: NaiveDate,
    pub service_stop_date: Option<NaiveDate>,
    pub status: String,
    /// Days the assignment was active within the month.
    pub prorated_days: i64,
    /// rate x prorated_days / days_in_month, rounded half-up to 2 dp.
    pub prorated_amount: Decimal,
}

/// All line items for one client and one calendar month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthPreview {
    pub month: BillingMonth,
    pub label: String,
    pub line_items: Vec<ServiceLineItem>,
    pub month_total: Decimal,
}

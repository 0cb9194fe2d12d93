//! Service assignment model.

use aargon_core::error::AppError;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Assignment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Active,
    Inactive,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Active => "active",
            AssignmentStatus::Inactive => "inactive",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "inactive" => AssignmentStatus::Inactive,
            _ => AssignmentStatus::Active,
        }
    }
}

/// A service assigned to a client, with its own billing window independent of
/// the service catalog entry. Never hard-deleted: deactivation stamps
/// `service_stop_date` and the row stays for invoicing history.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServiceAssignment {
    pub assignment_id: Uuid,
    pub client_id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub description: Option<String>,
    /// Descriptive attribute (e.g. "100 Mbps"); not used in billing math.
    pub link_capacity: Option<String>,
    /// Amount per full month. Absent means informational, billed at zero.
    pub rate: Option<Decimal>,
    /// First billing month, normalized to the first of the month.
    pub service_start_month: NaiveDate,
    /// Exact date billing began; drives first-month proration.
    pub billing_start_date: NaiveDate,
    /// Exact date billing ended, when the assignment has been stopped.
    pub service_stop_date: Option<NaiveDate>,
    pub status: String,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl ServiceAssignment {
    pub fn status(&self) -> AssignmentStatus {
        AssignmentStatus::from_string(&self.status)
    }
}

/// Input for assigning a service to a client.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAssignment {
    pub client_id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub description: Option<String>,
    pub link_capacity: Option<String>,
    pub rate: Option<Decimal>,
    pub billing_start_date: NaiveDate,
    pub service_stop_date: Option<NaiveDate>,
}

impl CreateAssignment {
    /// Reject inconsistent windows before anything touches storage.
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(stop) = self.service_stop_date {
            if stop < self.billing_start_date {
                return Err(AppError::validation(
                    "service_stop_date",
                    format!(
                        "stop date {} precedes billing start {}",
                        stop, self.billing_start_date
                    ),
                ));
            }
        }
        if let Some(rate) = self.rate {
            if rate < Decimal::ZERO {
                return Err(AppError::validation(
                    "rate",
                    format!("rate must not be negative, got {}", rate),
                ));
            }
        }
        Ok(())
    }

    /// The assignment's first billing month: its start date snapped to the
    /// first of the month (day-of-month is ignored for the start month).
    pub fn service_start_month(&self) -> NaiveDate {
        self.billing_start_date
            .with_day(1)
            .unwrap_or(self.billing_start_date)
    }
}

/// Rate/description edits on an existing assignment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAssignment {
    pub rate: Option<Decimal>,
    pub description: Option<String>,
}

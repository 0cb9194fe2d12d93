//! Repository traits over the relational store.
//!
//! The lifecycle manager and HTTP handlers only see these traits; production
//! binds them to the Postgres `Database`, tests to the in-memory store.

use aargon_core::error::AppError;
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{
    Client, CreateAssignment, Invoice, NewInvoice, ServiceAssignment, UpdateAssignment,
};

#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    async fn get_client(&self, client_id: Uuid) -> Result<Option<Client>, AppError>;

    /// Assignments for `client_id` whose active window intersects
    /// `[from, to]`. Read-only; the calculator never mutates assignments.
    async fn find_assignments_overlapping(
        &self,
        client_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ServiceAssignment>, AppError>;

    async fn create_assignment(
        &self,
        input: &CreateAssignment,
    ) -> Result<ServiceAssignment, AppError>;

    async fn get_assignment(
        &self,
        assignment_id: Uuid,
    ) -> Result<Option<ServiceAssignment>, AppError>;

    async fn list_assignments(&self, client_id: Uuid)
        -> Result<Vec<ServiceAssignment>, AppError>;

    /// Rate/description edits; everything else on an assignment is frozen.
    async fn update_assignment(
        &self,
        assignment_id: Uuid,
        input: &UpdateAssignment,
    ) -> Result<Option<ServiceAssignment>, AppError>;

    /// Toggle active/inactive. Deactivation stamps `service_stop_date` with
    /// `stop_date` (or today when absent); reactivation clears it. The update
    /// is atomic per row so concurrent previews never observe a half-updated
    /// window.
    async fn set_assignment_status(
        &self,
        assignment_id: Uuid,
        active: bool,
        stop_date: Option<NaiveDate>,
    ) -> Result<Option<ServiceAssignment>, AppError>;
}

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Insert a fully prepared record. Duplicate invoice numbers surface as
    /// `Conflict` so the caller can retry with a fresh number.
    async fn insert_invoice(&self, record: &NewInvoice) -> Result<Invoice, AppError>;

    async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError>;

    /// All invoices, most recent creation first.
    async fn list_invoices(&self) -> Result<Vec<Invoice>, AppError>;
}

//! In-memory repository, used by tests and local development.
//!
//! Mirrors the Postgres behaviour the lifecycle manager depends on, most
//! importantly the unique constraint on `invoice_number` surfacing as
//! `Conflict`.

use aargon_core::error::AppError;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::{
    AssignmentStatus, Client, CreateAssignment, Invoice, NewInvoice, ServiceAssignment,
    UpdateAssignment,
};
use crate::services::repository::{AssignmentRepository, InvoiceRepository};

#[derive(Default)]
struct State {
    clients: HashMap<Uuid, Client>,
    assignments: HashMap<Uuid, ServiceAssignment>,
    invoices: HashMap<Uuid, Invoice>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a client directly; client onboarding lives in another service.
    pub fn insert_client(&self, name: impl Into<String>, address: Option<String>) -> Client {
        let client = Client {
            client_id: Uuid::new_v4(),
            name: name.into(),
            address,
            active: true,
            created_utc: Utc::now(),
        };
        self.lock().clients.insert(client.client_id, client.clone());
        client
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned lock means a panic mid-mutation; propagating the panic
        // is the only sound option here.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl AssignmentRepository for InMemoryStore {
    async fn get_client(&self, client_id: Uuid) -> Result<Option<Client>, AppError> {
        Ok(self.lock().clients.get(&client_id).cloned())
    }

    async fn find_assignments_overlapping(
        &self,
        client_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ServiceAssignment>, AppError> {
        let state = self.lock();
        let mut rows: Vec<ServiceAssignment> = state
            .assignments
            .values()
            .filter(|a| a.client_id == client_id)
            .filter(|a| a.billing_start_date <= to)
            .filter(|a| a.service_stop_date.map_or(true, |stop| stop >= from))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.service_name.cmp(&b.service_name));
        Ok(rows)
    }

    async fn create_assignment(
        &self,
        input: &CreateAssignment,
    ) -> Result<ServiceAssignment, AppError> {
        let now = Utc::now();
        let status = if input.service_stop_date.is_some() {
            AssignmentStatus::Inactive
        } else {
            AssignmentStatus::Active
        };
        let assignment = ServiceAssignment {
            assignment_id: Uuid::new_v4(),
            client_id: input.client_id,
            service_id: input.service_id,
            service_name: input.service_name.clone(),
            description: input.description.clone(),
            link_capacity: input.link_capacity.clone(),
            rate: input.rate,
            service_start_month: input.service_start_month(),
            billing_start_date: input.billing_start_date,
            service_stop_date: input.service_stop_date,
            status: status.as_str().to_string(),
            created_utc: now,
            updated_utc: now,
        };
        self.lock()
            .assignments
            .insert(assignment.assignment_id, assignment.clone());
        Ok(assignment)
    }

    async fn get_assignment(
        &self,
        assignment_id: Uuid,
    ) -> Result<Option<ServiceAssignment>, AppError> {
        Ok(self.lock().assignments.get(&assignment_id).cloned())
    }

    async fn list_assignments(
        &self,
        client_id: Uuid,
    ) -> Result<Vec<ServiceAssignment>, AppError> {
        let state = self.lock();
        let mut rows: Vec<ServiceAssignment> = state
            .assignments
            .values()
            .filter(|a| a.client_id == client_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_utc.cmp(&b.created_utc));
        Ok(rows)
    }

    async fn update_assignment(
        &self,
        assignment_id: Uuid,
        input: &UpdateAssignment,
    ) -> Result<Option<ServiceAssignment>, AppError> {
        let mut state = self.lock();
        let Some(assignment) = state.assignments.get_mut(&assignment_id) else {
            return Ok(None);
        };
        if let Some(rate) = input.rate {
            assignment.rate = Some(rate);
        }
        if let Some(description) = &input.description {
            assignment.description = Some(description.clone());
        }
        assignment.updated_utc = Utc::now();
        Ok(Some(assignment.clone()))
    }

    async fn set_assignment_status(
        &self,
        assignment_id: Uuid,
        active: bool,
        stop_date: Option<NaiveDate>,
    ) -> Result<Option<ServiceAssignment>, AppError> {
        let mut state = self.lock();
        let Some(assignment) = state.assignments.get_mut(&assignment_id) else {
            return Ok(None);
        };
        if active {
            assignment.status = AssignmentStatus::Active.as_str().to_string();
            assignment.service_stop_date = None;
        } else {
            assignment.status = AssignmentStatus::Inactive.as_str().to_string();
            assignment.service_stop_date =
                Some(stop_date.unwrap_or_else(|| Utc::now().date_naive()));
        }
        assignment.updated_utc = Utc::now();
        Ok(Some(assignment.clone()))
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryStore {
    async fn insert_invoice(&self, record: &NewInvoice) -> Result<Invoice, AppError> {
        let mut state = self.lock();
        if state
            .invoices
            .values()
            .any(|i| i.invoice_number == record.invoice_number)
        {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "invoice number {} already exists",
                record.invoice_number
            )));
        }
        let invoice = Invoice {
            invoice_id: Uuid::new_v4(),
            invoice_number: record.invoice_number.clone(),
            client_id: record.client_id,
            months_label: record.months_label.clone(),
            created_date: record.created_date,
            artifact_path: record.artifact_path.clone(),
            created_utc: Utc::now(),
        };
        state.invoices.insert(invoice.invoice_id, invoice.clone());
        Ok(invoice)
    }

    async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        Ok(self.lock().invoices.get(&invoice_id).cloned())
    }

    async fn list_invoices(&self) -> Result<Vec<Invoice>, AppError> {
        let state = self.lock();
        let mut rows: Vec<Invoice> = state.invoices.values().cloned().collect();
        rows.sort_by(|a, b| {
            b.created_date
                .cmp(&a.created_date)
                .then(b.created_utc.cmp(&a.created_utc))
        });
        Ok(rows)
    }
}

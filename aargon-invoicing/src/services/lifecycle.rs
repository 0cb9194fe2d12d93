//! Invoice lifecycle manager.
//!
//! Orchestrates preview, creation, listing and download over the repositories,
//! the renderer and the artifact store. Creation is the only mutating path:
//! render first, then store the artifact, then insert the metadata row, with
//! compensating artifact cleanup when the insert fails so a failed create
//! leaves no invoice row behind.

use aargon_core::error::AppError;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::models::{
    months_label, BillingMonth, CreateInvoiceRequest, Invoice, MonthPreview, NewInvoice,
};
use crate::services::artifact::ArtifactStore;
use crate::services::billing_period;
use crate::services::invoice_number::InvoiceNumberSource;
use crate::services::metrics::{ERRORS_TOTAL, INVOICES_TOTAL, RENDER_DURATION};
use crate::services::renderer::{InvoiceHeader, InvoiceRenderer};
use crate::services::repository::{AssignmentRepository, InvoiceRepository};

/// Attempts at a fresh invoice number before giving up. With random suffixes a
/// second collision in a row already points at a misbehaving number source.
const NUMBER_RETRY_BUDGET: u32 = 3;

pub struct InvoiceService {
    assignments: Arc<dyn AssignmentRepository>,
    invoices: Arc<dyn InvoiceRepository>,
    artifacts: Arc<dyn ArtifactStore>,
    numbers: Arc<dyn InvoiceNumberSource>,
    renderer: InvoiceRenderer,
    op_timeout: Duration,
}

impl InvoiceService {
    pub fn new(
        assignments: Arc<dyn AssignmentRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        artifacts: Arc<dyn ArtifactStore>,
        numbers: Arc<dyn InvoiceNumberSource>,
        renderer: InvoiceRenderer,
        op_timeout: Duration,
    ) -> Self {
        Self {
            assignments,
            invoices,
            artifacts,
            numbers,
            renderer,
            op_timeout,
        }
    }

    /// Bound a storage or artifact call; a hung dependency becomes `Timeout`
    /// instead of a stuck request.
    async fn bounded<T>(
        &self,
        what: &str,
        fut: impl Future<Output = Result<T, AppError>>,
    ) -> Result<T, AppError> {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(anyhow::anyhow!(
                "{} exceeded {:?}",
                what,
                self.op_timeout
            ))),
        }
    }

    /// Compute prorated previews for the requested months. Read-only: nothing
    /// is persisted, no invoice number is consumed.
    #[instrument(skip(self), fields(client_id = %client_id))]
    pub async fn preview(
        &self,
        client_id: Uuid,
        months: &[BillingMonth],
    ) -> Result<Vec<MonthPreview>, AppError> {
        let previews = self.compute_previews(client_id, months).await?;
        INVOICES_TOTAL.with_label_values(&["preview"]).inc();
        Ok(previews)
    }

    async fn compute_previews(
        &self,
        client_id: Uuid,
        months: &[BillingMonth],
    ) -> Result<Vec<MonthPreview>, AppError> {
        self.require_client(client_id).await?;

        let months = normalize_months(months);
        if months.is_empty() {
            return Ok(Vec::new());
        }

        // One fetch spanning all requested months; proration per month is
        // pure computation over the same rows.
        let from = months[0].first_day();
        let to = months[months.len() - 1].last_day();
        let assignments = self
            .bounded(
                "assignment query",
                self.assignments
                    .find_assignments_overlapping(client_id, from, to),
            )
            .await?;

        Ok(months
            .iter()
            .map(|&m| billing_period::month_preview(&assignments, m))
            .collect())
    }

    /// Create an invoice: render the document, store the artifact, then insert
    /// the metadata row. The row is written last, so a visible invoice always
    /// has a downloadable document.
    #[instrument(skip(self, request), fields(client_id = %request.client_id))]
    pub async fn create(&self, request: &CreateInvoiceRequest) -> Result<Invoice, AppError> {
        if request.months.is_empty() {
            return Err(AppError::validation(
                "months",
                "at least one billing month is required".to_string(),
            ));
        }

        let client = self.require_client(request.client_id).await?;
        let months = normalize_months(&request.months);
        let label = months_label(&months);
        let previews = self.compute_previews(request.client_id, &months).await?;
        let created_date = Utc::now().date_naive();

        for attempt in 1..=NUMBER_RETRY_BUDGET {
            let invoice_number = self.numbers.next(created_date);

            let header = InvoiceHeader {
                invoice_number: invoice_number.clone(),
                invoice_date: created_date,
                client_name: client.name.clone(),
                client_address: client.address.clone(),
                months_label: label.clone(),
            };
            let render_started = Instant::now();
            let bytes = match self.renderer.render(&header, &previews) {
                Ok(bytes) => {
                    RENDER_DURATION
                        .with_label_values(&["ok"])
                        .observe(render_started.elapsed().as_secs_f64());
                    bytes
                }
                Err(e) => {
                    RENDER_DURATION
                        .with_label_values(&["error"])
                        .observe(render_started.elapsed().as_secs_f64());
                    ERRORS_TOTAL.with_label_values(&["render_failure"]).inc();
                    return Err(e);
                }
            };

            let artifact_name = format!("{}.pdf", invoice_number);
            let artifact_path = match self
                .bounded(
                    "artifact write",
                    self.artifacts.write(&artifact_name, &bytes),
                )
                .await
            {
                Ok(path) => path,
                Err(AppError::Conflict(e)) => {
                    // The final name is already committed, so an invoice with
                    // this number already owns its document. Retry with a
                    // fresh number; the existing artifact stays untouched.
                    warn!(
                        invoice_number = %invoice_number,
                        attempt = attempt,
                        "Artifact name collision, retrying: {}",
                        e
                    );
                    continue;
                }
                Err(e @ AppError::Timeout(_)) => {
                    // The timed-out write may still commit behind our back;
                    // best-effort cleanup by name.
                    self.remove_or_log_orphan(&artifact_name, &invoice_number)
                        .await;
                    return Err(e);
                }
                Err(e) => return Err(e),
            };

            let record = NewInvoice {
                invoice_number: invoice_number.clone(),
                client_id: request.client_id,
                months_label: label.clone(),
                created_date,
                artifact_path: artifact_path.clone(),
            };
            match self
                .bounded("invoice insert", self.invoices.insert_invoice(&record))
                .await
            {
                Ok(invoice) => {
                    INVOICES_TOTAL.with_label_values(&["created"]).inc();
                    info!(
                        invoice_id = %invoice.invoice_id,
                        invoice_number = %invoice.invoice_number,
                        "Invoice created"
                    );
                    return Ok(invoice);
                }
                Err(AppError::Conflict(e)) => {
                    // Another create won the number at the row level. The
                    // artifact under this name is ours (the no-replace write
                    // succeeded), so dropping it is safe; retry fresh.
                    warn!(
                        invoice_number = %invoice_number,
                        attempt = attempt,
                        "Invoice number collision, retrying: {}",
                        e
                    );
                    self.remove_or_log_orphan(&artifact_path, &invoice_number)
                        .await;
                }
                Err(e) => {
                    self.remove_or_log_orphan(&artifact_path, &invoice_number)
                        .await;
                    return Err(e);
                }
            }
        }

        error!(
            client_id = %request.client_id,
            attempts = NUMBER_RETRY_BUDGET,
            "Exhausted invoice number attempts; number source is misbehaving"
        );
        Err(AppError::Conflict(anyhow::anyhow!(
            "could not allocate a unique invoice number after {} attempts",
            NUMBER_RETRY_BUDGET
        )))
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn get(&self, invoice_id: Uuid) -> Result<Invoice, AppError> {
        self.bounded("invoice lookup", self.invoices.get_invoice(invoice_id))
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("invoice {} not found", invoice_id)))
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Invoice>, AppError> {
        self.bounded("invoice list", self.invoices.list_invoices())
            .await
    }

    /// Fetch an invoice together with its document bytes. A missing row and a
    /// missing artifact are both `NotFound`, with distinct messages so the
    /// second can be spotted as a storage anomaly.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn download(&self, invoice_id: Uuid) -> Result<(Invoice, Vec<u8>), AppError> {
        let invoice = self.get(invoice_id).await?;
        let bytes = self
            .bounded("artifact read", self.artifacts.read(&invoice.artifact_path))
            .await?;
        INVOICES_TOTAL.with_label_values(&["download"]).inc();
        Ok((invoice, bytes))
    }

    async fn require_client(&self, client_id: Uuid) -> Result<crate::models::Client, AppError> {
        self.bounded("client lookup", self.assignments.get_client(client_id))
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("client {} not found", client_id)))
    }

    async fn remove_or_log_orphan(&self, artifact_path: &str, invoice_number: &str) {
        if let Err(cleanup) = self
            .bounded("artifact cleanup", self.artifacts.remove(artifact_path))
            .await
        {
            // Orphaned artifacts are harmless to correctness (no row points
            // at them) but must be visible for storage reconciliation.
            error!(
                invoice_number = %invoice_number,
                artifact_path = %artifact_path,
                "Failed to remove orphaned invoice artifact: {}",
                cleanup
            );
        }
    }
}

/// Ascending, deduplicated copy of the requested months.
fn normalize_months(months: &[BillingMonth]) -> Vec<BillingMonth> {
    let mut months = months.to_vec();
    months.sort();
    months.dedup();
    months
}

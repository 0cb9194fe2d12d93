//! Invoice handlers.

use axum::{
    extract::{Json, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use aargon_core::auth::{authorize, Action, Principal};
use aargon_core::error::AppError;

use crate::models::{CreateInvoiceRequest, Invoice, MonthPreview, PreviewRequest};
use crate::startup::AppState;

/// Preview response: the prorated months plus their combined total.
#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub months: Vec<MonthPreview>,
    pub total: Decimal,
}

/// Compute a prorated preview without creating anything.
///
/// POST /invoices/preview
pub async fn preview_invoice(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<PreviewRequest>,
) -> Result<Json<PreviewResponse>, AppError> {
    authorize(&principal, Action::PreviewInvoice)?;

    let months = state.invoices.preview(req.client_id, &req.months).await?;
    let total = months.iter().map(|m| m.month_total).sum();
    Ok(Json(PreviewResponse { months, total }))
}

/// Create an invoice and render its document.
///
/// POST /invoices
pub async fn create_invoice(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<Invoice>), AppError> {
    authorize(&principal, Action::CreateInvoice)?;

    let invoice = state.invoices.create(&req).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

/// List invoices, newest first.
///
/// GET /invoices
pub async fn list_invoices(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<Invoice>>, AppError> {
    authorize(&principal, Action::ReadInvoice)?;

    Ok(Json(state.invoices.list().await?))
}

/// Get one invoice's metadata.
///
/// GET /invoices/:invoice_id
pub async fn get_invoice(
    State(state): State<AppState>,
    principal: Principal,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Invoice>, AppError> {
    authorize(&principal, Action::ReadInvoice)?;

    Ok(Json(state.invoices.get(invoice_id).await?))
}

/// Download the rendered document.
///
/// GET /invoices/:invoice_id/download
pub async fn download_invoice(
    State(state): State<AppState>,
    principal: Principal,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&principal, Action::DownloadInvoice)?;

    let (invoice, bytes) = state.invoices.download(invoice_id).await?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.pdf\"", invoice.invoice_number),
            ),
        ],
        bytes,
    ))
}

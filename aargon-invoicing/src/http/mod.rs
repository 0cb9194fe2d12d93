//! HTTP surface: invoice and assignment routes.

pub mod assignments;
pub mod invoices;

use axum::routing::{get, post};
use axum::Router;

use crate::startup::AppState;

/// API routes, mounted by the application alongside health and metrics.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/invoices/preview", post(invoices::preview_invoice))
        .route(
            "/invoices",
            post(invoices::create_invoice).get(invoices::list_invoices),
        )
        .route("/invoices/:invoice_id", get(invoices::get_invoice))
        .route(
            "/invoices/:invoice_id/download",
            get(invoices::download_invoice),
        )
        .route(
            "/assignments/:assignment_id",
            get(assignments::get_assignment).patch(assignments::update_assignment),
        )
        .route(
            "/assignments/:assignment_id/status",
            post(assignments::set_assignment_status),
        )
        .route(
            "/clients/:client_id/assignments",
            post(assignments::create_assignment).get(assignments::list_assignments),
        )
}

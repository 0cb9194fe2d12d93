//! Domain models for the invoicing service.

mod assignment;
mod client;
mod invoice;
mod month;
mod preview;

pub use assignment::{AssignmentStatus, CreateAssignment, ServiceAssignment, UpdateAssignment};
pub use client::Client;
pub use invoice::{CreateInvoiceRequest, Invoice, NewInvoice, PreviewRequest};
pub use month::{months_label, BillingMonth};
pub use preview::{MonthPreview, ServiceLineItem};

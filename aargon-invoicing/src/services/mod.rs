//! Service layer: billing math, document rendering, storage and lifecycle.

pub mod artifact;
pub mod billing_period;
pub mod database;
pub mod invoice_number;
pub mod lifecycle;
pub mod memory;
pub mod metrics;
pub mod renderer;
pub mod repository;

pub use artifact::{ArtifactStore, FsArtifactStore};
pub use database::Database;
pub use invoice_number::{InvoiceNumberGenerator, InvoiceNumberSource};
pub use lifecycle::InvoiceService;
pub use memory::InMemoryStore;
pub use metrics::{get_metrics, init_metrics};
pub use renderer::{InvoiceHeader, InvoiceRenderer};
pub use repository::{AssignmentRepository, InvoiceRepository};

//! aargon-core: Shared infrastructure for the Aargon management backend.
pub mod auth;
pub mod config;
pub mod error;
pub mod observability;

pub use axum;
pub use serde;
pub use serde_json;
pub use tracing;
pub use validator;

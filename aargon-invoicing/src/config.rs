//! Configuration for the invoicing service.

use aargon_core::config::{load, CoreConfig};
use aargon_core::error::AppError;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct InvoicingConfig {
    #[serde(flatten)]
    pub common: CoreConfig,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub invoicing: InvoiceSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InvoiceSettings {
    /// Directory for rendered invoice documents.
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: String,
    /// Prefix for generated invoice numbers.
    #[serde(default = "default_number_prefix")]
    pub number_prefix: String,
    /// Company name printed on every invoice.
    #[serde(default = "default_company_name")]
    pub company_name: String,
    /// Upper bound on any single storage or artifact operation, seconds.
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,
}

impl Default for InvoiceSettings {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
            number_prefix: default_number_prefix(),
            company_name: default_company_name(),
            operation_timeout_secs: default_operation_timeout_secs(),
        }
    }
}

fn default_service_name() -> String {
    "aargon-invoicing".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    2
}

fn default_artifact_dir() -> String {
    "invoices".to_string()
}

fn default_number_prefix() -> String {
    "INV".to_string()
}

fn default_company_name() -> String {
    "Aargon Management".to_string()
}

fn default_operation_timeout_secs() -> u64 {
    10
}

impl InvoicingConfig {
    pub fn from_env() -> Result<Self, AppError> {
        load()
    }
}

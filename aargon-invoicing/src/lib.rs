//! Invoicing service: proration, invoice lifecycle and document rendering.

pub mod config;
pub mod http;
pub mod models;
pub mod services;
pub mod startup;

//! Database service for the invoicing service.

use crate::models::{
    AssignmentStatus, Client, CreateAssignment, Invoice, NewInvoice, ServiceAssignment,
    UpdateAssignment,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::repository::{AssignmentRepository, InvoiceRepository};
use aargon_core::error::AppError;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "aargon-invoicing"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

const ASSIGNMENT_COLUMNS: &str = r#"
    assignment_id, client_id, service_id, service_name, description, link_capacity,
    rate, service_start_month, billing_start_date, service_stop_date, status,
    created_utc, updated_utc
"#;

#[async_trait]
impl AssignmentRepository for Database {
    #[instrument(skip(self), fields(client_id = %client_id))]
    async fn get_client(&self, client_id: Uuid) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(
            r#"
            SELECT client_id, name, address, active, created_utc
            FROM clients
            WHERE client_id = $1
            "#,
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get client: {}", e)))?;

        timer.observe_duration();

        Ok(client)
    }

    #[instrument(skip(self), fields(client_id = %client_id))]
    async fn find_assignments_overlapping(
        &self,
        client_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ServiceAssignment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_assignments_overlapping"])
            .start_timer();

        let query = format!(
            r#"
            SELECT {ASSIGNMENT_COLUMNS}
            FROM service_assignments
            WHERE client_id = $1
              AND billing_start_date <= $2
              AND (service_stop_date IS NULL OR service_stop_date >= $3)
            ORDER BY service_name
            "#
        );
        let assignments = sqlx::query_as::<_, ServiceAssignment>(&query)
            .bind(client_id)
            .bind(to)
            .bind(from)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to list assignments: {}", e))
            })?;

        timer.observe_duration();

        Ok(assignments)
    }

    #[instrument(skip(self, input), fields(client_id = %input.client_id))]
    async fn create_assignment(
        &self,
        input: &CreateAssignment,
    ) -> Result<ServiceAssignment, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_assignment"])
            .start_timer();

        let status = if input.service_stop_date.is_some() {
            AssignmentStatus::Inactive
        } else {
            AssignmentStatus::Active
        };
        let query = format!(
            r#"
            INSERT INTO service_assignments
                (assignment_id, client_id, service_id, service_name, description,
                 link_capacity, rate, service_start_month, billing_start_date,
                 service_stop_date, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {ASSIGNMENT_COLUMNS}
            "#
        );
        let assignment = sqlx::query_as::<_, ServiceAssignment>(&query)
            .bind(Uuid::new_v4())
            .bind(input.client_id)
            .bind(input.service_id)
            .bind(&input.service_name)
            .bind(&input.description)
            .bind(&input.link_capacity)
            .bind(input.rate)
            .bind(input.service_start_month())
            .bind(input.billing_start_date)
            .bind(input.service_stop_date)
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to create assignment: {}", e))
            })?;

        timer.observe_duration();

        info!(assignment_id = %assignment.assignment_id, "Service assignment created");

        Ok(assignment)
    }

    #[instrument(skip(self), fields(assignment_id = %assignment_id))]
    async fn get_assignment(
        &self,
        assignment_id: Uuid,
    ) -> Result<Option<ServiceAssignment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_assignment"])
            .start_timer();

        let query = format!(
            r#"
            SELECT {ASSIGNMENT_COLUMNS}
            FROM service_assignments
            WHERE assignment_id = $1
            "#
        );
        let assignment = sqlx::query_as::<_, ServiceAssignment>(&query)
            .bind(assignment_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to get assignment: {}", e))
            })?;

        timer.observe_duration();

        Ok(assignment)
    }

    #[instrument(skip(self), fields(client_id = %client_id))]
    async fn list_assignments(
        &self,
        client_id: Uuid,
    ) -> Result<Vec<ServiceAssignment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_assignments"])
            .start_timer();

        let query = format!(
            r#"
            SELECT {ASSIGNMENT_COLUMNS}
            FROM service_assignments
            WHERE client_id = $1
            ORDER BY created_utc
            "#
        );
        let assignments = sqlx::query_as::<_, ServiceAssignment>(&query)
            .bind(client_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to list assignments: {}", e))
            })?;

        timer.observe_duration();

        Ok(assignments)
    }

    #[instrument(skip(self, input), fields(assignment_id = %assignment_id))]
    async fn update_assignment(
        &self,
        assignment_id: Uuid,
        input: &UpdateAssignment,
    ) -> Result<Option<ServiceAssignment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_assignment"])
            .start_timer();

        let query = format!(
            r#"
            UPDATE service_assignments
            SET rate = COALESCE($2, rate),
                description = COALESCE($3, description),
                updated_utc = NOW()
            WHERE assignment_id = $1
            RETURNING {ASSIGNMENT_COLUMNS}
            "#
        );
        let assignment = sqlx::query_as::<_, ServiceAssignment>(&query)
            .bind(assignment_id)
            .bind(input.rate)
            .bind(&input.description)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to update assignment: {}", e))
            })?;

        timer.observe_duration();

        Ok(assignment)
    }

    #[instrument(skip(self), fields(assignment_id = %assignment_id, active = active))]
    async fn set_assignment_status(
        &self,
        assignment_id: Uuid,
        active: bool,
        stop_date: Option<NaiveDate>,
    ) -> Result<Option<ServiceAssignment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["set_assignment_status"])
            .start_timer();

        // Reactivation clears the stop date; deactivation stamps it with the
        // caller's date or today. Single statement, so the window flips
        // atomically under concurrent previews.
        let query = format!(
            r#"
            UPDATE service_assignments
            SET status = $2,
                service_stop_date = CASE
                    WHEN $2 = 'active' THEN NULL
                    ELSE COALESCE($3, CURRENT_DATE)
                END,
                updated_utc = NOW()
            WHERE assignment_id = $1
            RETURNING {ASSIGNMENT_COLUMNS}
            "#
        );
        let status = if active {
            AssignmentStatus::Active
        } else {
            AssignmentStatus::Inactive
        };
        let assignment = sqlx::query_as::<_, ServiceAssignment>(&query)
            .bind(assignment_id)
            .bind(status.as_str())
            .bind(stop_date)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to set assignment status: {}", e))
            })?;

        timer.observe_duration();

        if let Some(a) = &assignment {
            info!(assignment_id = %a.assignment_id, status = %a.status, "Assignment status changed");
        }

        Ok(assignment)
    }
}

#[async_trait]
impl InvoiceRepository for Database {
    #[instrument(skip(self, record), fields(invoice_number = %record.invoice_number))]
    async fn insert_invoice(&self, record: &NewInvoice) -> Result<Invoice, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices
                (invoice_id, invoice_number, client_id, months_label, created_date, artifact_path)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING invoice_id, invoice_number, client_id, months_label, created_date,
                      artifact_path, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.invoice_number)
        .bind(record.client_id)
        .bind(&record.months_label)
        .bind(record.created_date)
        .bind(&record.artifact_path)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Invoice number '{}' already exists",
                    record.invoice_number
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to insert invoice: {}", e)),
        })?;

        timer.observe_duration();

        info!(invoice_id = %invoice.invoice_id, invoice_number = %invoice.invoice_number, "Invoice recorded");

        Ok(invoice)
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT invoice_id, invoice_number, client_id, months_label, created_date,
                   artifact_path, created_utc
            FROM invoices
            WHERE invoice_id = $1
            "#,
        )
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?;

        timer.observe_duration();

        Ok(invoice)
    }

    #[instrument(skip(self))]
    async fn list_invoices(&self) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT invoice_id, invoice_number, client_id, months_label, created_date,
                   artifact_path, created_utc
            FROM invoices
            ORDER BY created_date DESC, created_utc DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list invoices: {}", e)))?;

        timer.observe_duration();

        Ok(invoices)
    }
}

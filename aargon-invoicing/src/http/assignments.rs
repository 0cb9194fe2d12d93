//! Service assignment handlers.

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use aargon_core::auth::{authorize, Action, Principal};
use aargon_core::error::AppError;

use crate::models::{CreateAssignment, ServiceAssignment, UpdateAssignment};
use crate::startup::AppState;

/// Status change request. Deactivation may carry an explicit stop date;
/// omitted means today.
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub active: bool,
    pub stop_date: Option<NaiveDate>,
}

/// Assignment creation body; the client comes from the route path.
#[derive(Debug, Deserialize)]
pub struct CreateAssignmentRequest {
    pub service_id: Uuid,
    pub service_name: String,
    pub description: Option<String>,
    pub link_capacity: Option<String>,
    pub rate: Option<Decimal>,
    pub billing_start_date: NaiveDate,
    pub service_stop_date: Option<NaiveDate>,
}

/// Assign a service to a client.
///
/// POST /clients/:client_id/assignments
pub async fn create_assignment(
    State(state): State<AppState>,
    principal: Principal,
    Path(client_id): Path<Uuid>,
    Json(req): Json<CreateAssignmentRequest>,
) -> Result<(StatusCode, Json<ServiceAssignment>), AppError> {
    authorize(&principal, Action::ManageAssignments)?;

    let input = CreateAssignment {
        client_id,
        service_id: req.service_id,
        service_name: req.service_name,
        description: req.description,
        link_capacity: req.link_capacity,
        rate: req.rate,
        billing_start_date: req.billing_start_date,
        service_stop_date: req.service_stop_date,
    };
    input.validate()?;

    state
        .assignments
        .get_client(client_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("client {} not found", client_id)))?;

    let assignment = state.assignments.create_assignment(&input).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

/// Get one assignment.
///
/// GET /assignments/:assignment_id
pub async fn get_assignment(
    State(state): State<AppState>,
    principal: Principal,
    Path(assignment_id): Path<Uuid>,
) -> Result<Json<ServiceAssignment>, AppError> {
    authorize(&principal, Action::ReadAssignments)?;

    let assignment = state
        .assignments
        .get_assignment(assignment_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("assignment {} not found", assignment_id))
        })?;
    Ok(Json(assignment))
}

/// List a client's assignments, active and stopped alike.
///
/// GET /clients/:client_id/assignments
pub async fn list_assignments(
    State(state): State<AppState>,
    principal: Principal,
    Path(client_id): Path<Uuid>,
) -> Result<Json<Vec<ServiceAssignment>>, AppError> {
    authorize(&principal, Action::ReadAssignments)?;

    Ok(Json(state.assignments.list_assignments(client_id).await?))
}

/// Edit rate or description on an existing assignment.
///
/// PATCH /assignments/:assignment_id
pub async fn update_assignment(
    State(state): State<AppState>,
    principal: Principal,
    Path(assignment_id): Path<Uuid>,
    Json(req): Json<UpdateAssignment>,
) -> Result<Json<ServiceAssignment>, AppError> {
    authorize(&principal, Action::ManageAssignments)?;

    if let Some(rate) = req.rate {
        if rate < Decimal::ZERO {
            return Err(AppError::validation(
                "rate",
                format!("rate must not be negative, got {}", rate),
            ));
        }
    }

    let assignment = state
        .assignments
        .update_assignment(assignment_id, &req)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("assignment {} not found", assignment_id))
        })?;
    Ok(Json(assignment))
}

/// Activate or deactivate an assignment.
///
/// POST /assignments/:assignment_id/status
pub async fn set_assignment_status(
    State(state): State<AppState>,
    principal: Principal,
    Path(assignment_id): Path<Uuid>,
    Json(req): Json<SetStatusRequest>,
) -> Result<Json<ServiceAssignment>, AppError> {
    authorize(&principal, Action::ManageAssignments)?;

    let assignment = state
        .assignments
        .set_assignment_status(assignment_id, req.active, req.stop_date)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("assignment {} not found", assignment_id))
        })?;
    Ok(Json(assignment))
}

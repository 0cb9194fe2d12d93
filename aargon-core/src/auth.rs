//! Authenticated principal context and role policy.
//!
//! Authentication itself is owned by the upstream auth service; by the time a
//! request reaches a handler it carries the principal's identity and role in
//! trusted headers. This module only decides what a given role may do, through
//! a single policy-evaluation function instead of inline role checks scattered
//! across handlers.

use crate::error::AppError;
use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};

/// Staff/client role attached to an authenticated principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Superadmin,
    Admin,
    Manager,
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Superadmin => "superadmin",
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Client => "client",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "superadmin" => Some(Role::Superadmin),
            "admin" => Some(Role::Admin),
            "manager" => Some(Role::Manager),
            "client" => Some(Role::Client),
            _ => None,
        }
    }
}

/// Authenticated caller identity, supplied by the auth layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub username: String,
    pub role: Role,
}

/// Actions subject to role policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    PreviewInvoice,
    CreateInvoice,
    ReadInvoice,
    DownloadInvoice,
    ManageAssignments,
    ReadAssignments,
}

/// Evaluate whether `principal` may perform `action`. The single place role
/// rules live.
pub fn allows(principal: &Principal, action: Action) -> bool {
    match principal.role {
        Role::Superadmin | Role::Admin => true,
        Role::Manager => !matches!(action, Action::ManageAssignments),
        Role::Client => matches!(action, Action::ReadInvoice | Action::DownloadInvoice),
    }
}

/// Policy check returning `Forbidden` on deny.
pub fn authorize(principal: &Principal, action: Action) -> Result<(), AppError> {
    if allows(principal, action) {
        Ok(())
    } else {
        Err(AppError::Forbidden(anyhow::anyhow!(
            "role '{}' may not perform this operation",
            principal.role.as_str()
        )))
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let user_id = header("x-user-id")
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("missing x-user-id header")))?;
        let username = header("x-username").unwrap_or_else(|| user_id.clone());
        let role = header("x-user-role")
            .and_then(|r| Role::from_string(&r))
            .ok_or_else(|| {
                AppError::Unauthorized(anyhow::anyhow!("missing or unknown x-user-role header"))
            })?;

        Ok(Principal {
            user_id,
            username,
            role,
        })
    }
}

use chrono::{DateTime, Utc};
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

use super::shared::Pagination;
use crate::error::AppError;

#[derive(Deserialize, utoipa::IntoParams)]
pub struct UserListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Case-insensitive username search.
    pub search: Option<String>,
    /// Filter by role name.
    pub role: Option<String>,
}

/// Admin request to move a user to a different role.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateUserRoleRequest {
    #[schema(example = "faculty")]
    pub role: String,
}

pub fn validate_update_user_role(payload: &UpdateUserRoleRequest) -> Result<(), AppError> {
    if payload.role.trim().is_empty() {
        return Err(AppError::Validation("role must not be empty".into()));
    }
    Ok(())
}

#[derive(Serialize, FromQueryResult, utoipa::ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub display_name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserListResponse {
    pub data: Vec<UserResponse>,
    pub pagination: Pagination,
}

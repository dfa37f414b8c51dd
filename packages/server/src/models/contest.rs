use chrono::{DateTime, Utc};
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

use super::shared::{Pagination, double_option, validate_optional_position, validate_title};
use crate::core::lifecycle::Phase;
use crate::entity::contest::{self, ActivityKind};
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateActivityRequest {
    pub title: String,
    /// Description in Markdown.
    pub description: String,
    pub scheduled_start: DateTime<Utc>,
    /// Window length in minutes; per-student for contests, shared for
    /// assignments.
    #[schema(example = 90)]
    pub duration_minutes: i32,
}

/// One year, the longest window an activity may stay open.
pub const MAX_DURATION_MINUTES: i32 = 366 * 24 * 60;

fn validate_duration(minutes: i32) -> Result<(), AppError> {
    if minutes <= 0 || minutes > MAX_DURATION_MINUTES {
        return Err(AppError::Validation(format!(
            "duration_minutes must be between 1 and {MAX_DURATION_MINUTES}"
        )));
    }
    Ok(())
}

pub fn validate_create_activity(payload: &CreateActivityRequest) -> Result<(), AppError> {
    validate_title(&payload.title)?;
    validate_duration(payload.duration_minutes)
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateActivityRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
}

pub fn validate_update_activity(payload: &UpdateActivityRequest) -> Result<(), AppError> {
    if let Some(title) = &payload.title {
        validate_title(title)?;
    }
    if let Some(minutes) = payload.duration_minutes {
        validate_duration(minutes)?;
    }
    Ok(())
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct AddContestProblemRequest {
    pub problem_id: i32,
    /// Short label shown to participants, e.g. "A".
    #[schema(example = "A")]
    pub label: String,
    pub position: Option<i32>,
    /// Contest-specific point override; omit to use the problem's default.
    pub points: Option<i32>,
}

pub fn validate_add_contest_problem(payload: &AddContestProblemRequest) -> Result<(), AppError> {
    let label = payload.label.trim();
    if label.is_empty() || label.chars().count() > 16 {
        return Err(AppError::Validation("Label must be 1-16 characters".into()));
    }
    if let Some(points) = payload.points
        && points < 0
    {
        return Err(AppError::Validation("points must be >= 0".into()));
    }
    validate_optional_position(payload.position)
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateContestProblemRequest {
    pub label: Option<String>,
    pub position: Option<i32>,
    /// Absent = keep, null = clear the override, value = set it.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub points: Option<Option<i32>>,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct ActivityListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Case-insensitive title search.
    pub search: Option<String>,
}

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

#[derive(Serialize, utoipa::ToSchema)]
pub struct ActivityResponse {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub kind: ActivityKind,
    pub scheduled_start: DateTime<Utc>,
    pub duration_minutes: i32,
    pub scheduled_end: DateTime<Utc>,
    pub published: bool,
    /// Global phase at the time of the request.
    pub phase: Phase,
    pub owner_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ActivityResponse {
    pub fn from_model(m: contest::Model, phase: Phase) -> Self {
        Self {
            id: m.id,
            title: m.title,
            description: m.description,
            kind: m.kind,
            scheduled_start: m.scheduled_start,
            scheduled_end: m.scheduled_start
                + chrono::Duration::minutes(i64::from(m.duration_minutes)),
            duration_minutes: m.duration_minutes,
            published: m.published,
            phase,
            owner_id: m.owner_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(FromQueryResult)]
pub struct ActivityListRow {
    pub id: i32,
    pub title: String,
    pub kind: ActivityKind,
    pub scheduled_start: DateTime<Utc>,
    pub duration_minutes: i32,
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ActivityListItem {
    pub id: i32,
    pub title: String,
    pub kind: ActivityKind,
    pub scheduled_start: DateTime<Utc>,
    pub duration_minutes: i32,
    pub published: bool,
    pub phase: Phase,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ActivityListResponse {
    pub data: Vec<ActivityListItem>,
    pub pagination: Pagination,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ContestProblemResponse {
    pub contest_id: i32,
    pub problem_id: i32,
    pub label: String,
    pub position: i32,
    /// Contest-specific override, if any.
    pub points: Option<i32>,
    /// What the problem is actually worth here.
    pub effective_points: i32,
    pub problem_title: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct EnrollmentResponse {
    pub contest_id: i32,
    pub user_id: i32,
    pub registered_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
}

impl From<crate::entity::enrollment::Model> for EnrollmentResponse {
    fn from(m: crate::entity::enrollment::Model) -> Self {
        Self {
            contest_id: m.contest_id,
            user_id: m.user_id,
            registered_at: m.registered_at,
            started_at: m.started_at,
        }
    }
}

/// Response to the "start" command.
#[derive(Serialize, utoipa::ToSchema)]
pub struct StartResponse {
    pub started_at: DateTime<Utc>,
    /// When this student's submission window closes.
    pub ends_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ParticipantResponse {
    pub user_id: i32,
    pub username: String,
    pub registered_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_req(minutes: i32) -> CreateActivityRequest {
        CreateActivityRequest {
            title: "Week 3 lab".into(),
            description: "desc".into(),
            scheduled_start: Utc::now(),
            duration_minutes: minutes,
        }
    }

    #[test]
    fn duration_must_be_positive() {
        assert!(validate_create_activity(&create_req(0)).is_err());
        assert!(validate_create_activity(&create_req(-5)).is_err());
        assert!(validate_create_activity(&create_req(90)).is_ok());
    }

    #[test]
    fn duration_is_capped_at_one_year() {
        assert!(validate_create_activity(&create_req(MAX_DURATION_MINUTES)).is_ok());
        assert!(validate_create_activity(&create_req(MAX_DURATION_MINUTES + 1)).is_err());
        assert!(validate_create_activity(&create_req(i32::MAX)).is_err());
    }

    #[test]
    fn update_duration_uses_the_same_bounds() {
        let req = UpdateActivityRequest {
            duration_minutes: Some(i32::MAX),
            ..Default::default()
        };
        assert!(validate_update_activity(&req).is_err());
        let req = UpdateActivityRequest {
            duration_minutes: Some(120),
            ..Default::default()
        };
        assert!(validate_update_activity(&req).is_ok());
    }

    #[test]
    fn capped_duration_keeps_scheduled_end_computable() {
        // RFC 3339 parsing tops out at year 9999, so the cap keeps the
        // window-end arithmetic inside chrono's representable range.
        let start: DateTime<Utc> = "9999-12-31T23:59:59Z".parse().unwrap();
        let _ = start + chrono::Duration::minutes(i64::from(MAX_DURATION_MINUTES));
    }
}

use chrono::{DateTime, Utc};
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

use super::shared::{Pagination, validate_optional_position, validate_title};
use crate::error::AppError;

pub const DIFFICULTIES: &[&str] = &["easy", "medium", "hard"];

const MAX_STATEMENT_BYTES: usize = 256 * 1024;
const MAX_TEST_DATA_BYTES: usize = 1024 * 1024;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateProblemRequest {
    pub title: String,
    /// Problem statement in Markdown.
    pub statement: String,
    /// One of "easy", "medium", "hard".
    #[schema(example = "medium")]
    pub difficulty: String,
    /// Default point value when a contest does not override it.
    #[schema(example = 100)]
    pub points: i32,
    /// Advisory time limit in milliseconds.
    #[schema(example = 2000)]
    pub time_limit: i32,
    /// Advisory memory limit in kilobytes.
    #[schema(example = 262144)]
    pub memory_limit: i32,
    pub sample_input: String,
    pub sample_output: String,
}

pub fn validate_create_problem(payload: &CreateProblemRequest) -> Result<(), AppError> {
    validate_title(&payload.title)?;
    if payload.statement.len() > MAX_STATEMENT_BYTES {
        return Err(AppError::Validation("Statement too large (max 256 KiB)".into()));
    }
    if !DIFFICULTIES.contains(&payload.difficulty.as_str()) {
        return Err(AppError::Validation(
            "difficulty must be one of: easy, medium, hard".into(),
        ));
    }
    if payload.points < 0 {
        return Err(AppError::Validation("points must be >= 0".into()));
    }
    if payload.time_limit <= 0 || payload.memory_limit <= 0 {
        return Err(AppError::Validation(
            "time_limit and memory_limit must be > 0".into(),
        ));
    }
    Ok(())
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateProblemRequest {
    pub title: Option<String>,
    pub statement: Option<String>,
    pub difficulty: Option<String>,
    pub points: Option<i32>,
    pub time_limit: Option<i32>,
    pub memory_limit: Option<i32>,
    pub sample_input: Option<String>,
    pub sample_output: Option<String>,
}

pub fn validate_update_problem(payload: &UpdateProblemRequest) -> Result<(), AppError> {
    if let Some(title) = &payload.title {
        validate_title(title)?;
    }
    if let Some(statement) = &payload.statement
        && statement.len() > MAX_STATEMENT_BYTES
    {
        return Err(AppError::Validation("Statement too large (max 256 KiB)".into()));
    }
    if let Some(difficulty) = &payload.difficulty
        && !DIFFICULTIES.contains(&difficulty.as_str())
    {
        return Err(AppError::Validation(
            "difficulty must be one of: easy, medium, hard".into(),
        ));
    }
    if let Some(points) = payload.points
        && points < 0
    {
        return Err(AppError::Validation("points must be >= 0".into()));
    }
    if payload.time_limit.is_some_and(|v| v <= 0) || payload.memory_limit.is_some_and(|v| v <= 0) {
        return Err(AppError::Validation(
            "time_limit and memory_limit must be > 0".into(),
        ));
    }
    Ok(())
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct ProblemListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Case-insensitive title search.
    pub search: Option<String>,
    pub difficulty: Option<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateTestCaseRequest {
    pub input: String,
    pub expected_output: String,
    /// Hidden cases are judged but never shown to students.
    pub is_hidden: bool,
    pub position: Option<i32>,
}

pub fn validate_create_test_case(payload: &CreateTestCaseRequest) -> Result<(), AppError> {
    if payload.input.len() > MAX_TEST_DATA_BYTES || payload.expected_output.len() > MAX_TEST_DATA_BYTES
    {
        return Err(AppError::Validation(
            "Test case data too large (max 1 MiB per field)".into(),
        ));
    }
    validate_optional_position(payload.position)
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateTestCaseRequest {
    pub input: Option<String>,
    pub expected_output: Option<String>,
    pub is_hidden: Option<bool>,
    pub position: Option<i32>,
}

/// Request body for the run preview: executes code against the problem's
/// visible test cases without recording anything.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RunRequest {
    /// One of the supported language names, e.g. "python".
    #[schema(example = "python")]
    pub language: String,
    pub code: String,
}

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProblemResponse {
    pub id: i32,
    pub title: String,
    pub statement: String,
    pub difficulty: String,
    pub points: i32,
    pub time_limit: i32,
    pub memory_limit: i32,
    pub sample_input: String,
    pub sample_output: String,
    pub author_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<crate::entity::problem::Model> for ProblemResponse {
    fn from(m: crate::entity::problem::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            statement: m.statement,
            difficulty: m.difficulty,
            points: m.points,
            time_limit: m.time_limit,
            memory_limit: m.memory_limit,
            sample_input: m.sample_input,
            sample_output: m.sample_output,
            author_id: m.author_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, FromQueryResult, utoipa::ToSchema)]
pub struct ProblemListItem {
    pub id: i32,
    pub title: String,
    pub difficulty: String,
    pub points: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProblemListResponse {
    pub data: Vec<ProblemListItem>,
    pub pagination: Pagination,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TestCaseResponse {
    pub id: i32,
    pub input: String,
    pub expected_output: String,
    pub is_hidden: bool,
    pub position: i32,
}

impl From<crate::entity::test_case::Model> for TestCaseResponse {
    fn from(m: crate::entity::test_case::Model) -> Self {
        Self {
            id: m.id,
            input: m.input,
            expected_output: m.expected_output,
            is_hidden: m.is_hidden,
            position: m.position,
        }
    }
}

/// Per-case outcome of a run preview.
#[derive(Serialize, utoipa::ToSchema)]
pub struct RunCaseResult {
    pub input: String,
    pub expected_output: String,
    /// What the program actually printed, if anything.
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub passed: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RunResponse {
    pub results: Vec<RunCaseResult>,
    pub cases_passed: i32,
    pub cases_total: i32,
}

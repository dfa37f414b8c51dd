use chrono::{DateTime, Utc};
use common::SubmissionStatus;
use common::judge::languages;
use serde::{Deserialize, Serialize};

use super::shared::Pagination;
use crate::error::AppError;

const MAX_CODE_BYTES: usize = 64 * 1024;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateSubmissionRequest {
    /// One of the supported language names, e.g. "python".
    #[schema(example = "python")]
    pub language: String,
    pub code: String,
}

pub fn validate_create_submission(payload: &CreateSubmissionRequest) -> Result<(), AppError> {
    validate_code(&payload.language, &payload.code)
}

/// Shared by submissions and the run preview.
pub fn validate_code(language: &str, code: &str) -> Result<(), AppError> {
    if languages::language_id(language).is_none() {
        return Err(AppError::Validation(format!(
            "Unsupported language '{}'; supported: {}",
            language,
            languages::supported_languages().join(", ")
        )));
    }
    if code.trim().is_empty() {
        return Err(AppError::Validation("Code must not be empty".into()));
    }
    if code.len() > MAX_CODE_BYTES {
        return Err(AppError::Validation("Code too large (max 64 KiB)".into()));
    }
    Ok(())
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct SubmissionListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Restrict to one problem.
    pub problem_id: Option<i32>,
    /// Restrict to one student; requires `submission:view_all` unless it is
    /// the caller.
    pub user_id: Option<i32>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionResponse {
    pub id: i32,
    pub contest_id: Option<i32>,
    pub problem_id: i32,
    pub user_id: i32,
    pub language: String,
    pub status: SubmissionStatus,
    pub cases_passed: i32,
    pub cases_total: i32,
    pub created_at: DateTime<Utc>,
    pub judged_at: Option<DateTime<Utc>>,
}

impl From<crate::entity::submission::Model> for SubmissionResponse {
    fn from(m: crate::entity::submission::Model) -> Self {
        Self {
            id: m.id,
            contest_id: m.contest_id,
            problem_id: m.problem_id,
            user_id: m.user_id,
            language: m.language,
            status: m.status,
            cases_passed: m.cases_passed,
            cases_total: m.cases_total,
            created_at: m.created_at,
            judged_at: m.judged_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionListResponse {
    pub data: Vec<SubmissionResponse>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(language: &str, code: &str) -> CreateSubmissionRequest {
        CreateSubmissionRequest {
            language: language.into(),
            code: code.into(),
        }
    }

    #[test]
    fn unknown_languages_are_rejected() {
        assert!(validate_create_submission(&req("cobol", "print()")).is_err());
        assert!(validate_create_submission(&req("python", "print()")).is_ok());
    }

    #[test]
    fn empty_code_is_rejected() {
        assert!(validate_create_submission(&req("python", "   \n")).is_err());
    }
}

use std::cmp;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::{Duration, Utc};
use common::SubmissionStatus;
use common::judge::languages;
use sea_orm::*;
use tracing::{info, instrument};

use crate::core::lifecycle;
use crate::entity::contest::ActivityKind;
use crate::entity::{submission, test_case};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::judging::{self, JudgeCase};
use crate::models::shared::Pagination;
use crate::models::submission::*;
use crate::state::AppState;
use crate::utils::activity::{
    check_visibility, find_activity, find_contest_problem, find_enrollment_for_update,
    participation_of, schedule_of,
};

/// Check rate limit for a user.
///
/// Uses an optimistic (non-locking) approach, so technically concurrent
/// requests within a very short window may both pass the rate check before
/// either insert completes, but this is an accepted trade-off compared to
/// pessimistic locking which adds latency to each request.
async fn check_rate_limit(
    db: &DatabaseConnection,
    user_id: i32,
    limit_per_minute: u32,
) -> Result<(), AppError> {
    if limit_per_minute == 0 {
        return Ok(()); // Rate limiting disabled
    }

    let one_minute_ago = Utc::now() - Duration::minutes(1);

    let count = submission::Entity::find()
        .filter(submission::Column::UserId.eq(user_id))
        .filter(submission::Column::CreatedAt.gt(one_minute_ago))
        .count(db)
        .await?;

    if count >= limit_per_minute as u64 {
        let oldest = submission::Entity::find()
            .filter(submission::Column::UserId.eq(user_id))
            .filter(submission::Column::CreatedAt.gt(one_minute_ago))
            .order_by_asc(submission::Column::CreatedAt)
            .one(db)
            .await?;

        let retry_after = oldest
            .map(|s| {
                let expires = s.created_at + Duration::minutes(1);
                cmp::max((expires - Utc::now()).num_seconds(), 1) as u64
            })
            .unwrap_or(60);

        return Err(AppError::RateLimited { retry_after });
    }

    Ok(())
}

#[utoipa::path(
    post,
    path = "/{id}/problems/{problem_id}/submissions",
    tag = "Submissions",
    operation_id = "createSubmission",
    summary = "Submit code for a problem",
    description = "Validates the participation state machine, appends a Pending record, awaits the judge and finalizes the verdict. A judge timeout leaves the record Pending and returns 504; it is not a Failed verdict. Requires `submission:submit` permission.",
    params(
        ("id" = i32, Path, description = "Activity ID"),
        ("problem_id" = i32, Path, description = "Problem ID"),
    ),
    request_body = CreateSubmissionRequest,
    responses(
        (status = 201, description = "Judged submission", body = SubmissionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Activity or problem not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "State conflict (NOT_YET_OPEN, ALREADY_ENDED, NOT_ENROLLED, SUBMISSION_WINDOW_CLOSED)", body = ErrorBody),
        (status = 429, description = "Too many submissions (RATE_LIMITED)", body = ErrorBody),
        (status = 502, description = "Judge failed (JUDGE_UNAVAILABLE)", body = ErrorBody),
        (status = 504, description = "Judge timed out, submission stays Pending (JUDGE_TIMEOUT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(
    skip(state, auth_user, payload),
    fields(activity_id = id, problem_id, user_id = auth_user.user_id, language = %payload.language, ?kind)
)]
pub async fn create_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Extension(kind): Extension<ActivityKind>,
    Path((id, problem_id)): Path<(i32, i32)>,
    AppJson(payload): AppJson<CreateSubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("submission:submit")?;
    validate_create_submission(&payload)?;
    let language_id = languages::language_id(&payload.language)
        .ok_or_else(|| AppError::Validation("Unsupported language".into()))?;

    check_rate_limit(
        &state.db,
        auth_user.user_id,
        state.config.submission.rate_limit_per_minute,
    )
    .await?;

    let now = Utc::now();

    // The enrollment row lock serializes join/start/submit per student, so
    // the window check and the Pending insert are atomic.
    let txn = state.db.begin().await?;
    let activity = find_activity(&txn, kind, id).await?;
    check_visibility(&auth_user, &activity)?;
    find_contest_problem(&txn, id, problem_id).await?;

    let enrollment_row = find_enrollment_for_update(&txn, id, auth_user.user_id).await?;
    let participation = enrollment_row.as_ref().map(participation_of);
    lifecycle::check_submit(&schedule_of(&activity), participation.as_ref(), now)?;

    let cases: Vec<JudgeCase> = test_case::Entity::find()
        .filter(test_case::Column::ProblemId.eq(problem_id))
        .order_by_asc(test_case::Column::Position)
        .order_by_asc(test_case::Column::Id)
        .all(&txn)
        .await?
        .into_iter()
        .map(JudgeCase::from)
        .collect();

    if cases.is_empty() {
        return Err(AppError::Validation(
            "Problem has no test cases; it cannot be judged yet".into(),
        ));
    }

    let pending = submission::ActiveModel {
        code: Set(payload.code.clone()),
        language: Set(payload.language.clone()),
        status: Set(SubmissionStatus::Pending),
        cases_passed: Set(0),
        cases_total: Set(cases.len() as i32),
        user_id: Set(auth_user.user_id),
        problem_id: Set(problem_id),
        contest_id: Set(Some(id)),
        created_at: Set(now),
        judged_at: Set(None),
        ..Default::default()
    };
    let pending = pending.insert(&txn).await?;
    txn.commit().await?;

    // The judge call happens outside any transaction; on timeout or upstream
    // failure the record simply stays Pending.
    let outcome =
        judging::run_test_cases(state.judge.as_ref(), language_id, &payload.code, &cases).await?;

    let mut active: submission::ActiveModel = pending.into();
    active.status = Set(outcome.status);
    active.cases_passed = Set(outcome.cases_passed);
    active.judged_at = Set(Some(Utc::now()));
    let model = active.update(&state.db).await?;

    info!(
        submission_id = model.id,
        status = %model.status,
        cases_passed = model.cases_passed,
        "submission judged"
    );

    Ok((StatusCode::CREATED, Json(SubmissionResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/{id}/submissions",
    tag = "Submissions",
    operation_id = "listSubmissions",
    summary = "List submissions in an activity",
    description = "Students see their own submissions; `submission:view_all` opens the full history and the `user_id` filter.",
    params(("id" = i32, Path, description = "Activity ID"), SubmissionListQuery),
    responses(
        (status = 200, description = "Submissions, newest first", body = SubmissionListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found or draft (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(activity_id = id, ?kind))]
pub async fn list_submissions(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Extension(kind): Extension<ActivityKind>,
    Path(id): Path<i32>,
    Query(query): Query<SubmissionListQuery>,
) -> Result<Json<SubmissionListResponse>, AppError> {
    let activity = find_activity(&state.db, kind, id).await?;
    check_visibility(&auth_user, &activity)?;

    let page = Ord::max(query.page.unwrap_or(1), 1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let viewer_scope = if auth_user.has_permission("submission:view_all") {
        query.user_id
    } else {
        match query.user_id {
            Some(uid) if uid != auth_user.user_id => return Err(AppError::PermissionDenied),
            _ => Some(auth_user.user_id),
        }
    };

    let mut select = submission::Entity::find().filter(submission::Column::ContestId.eq(id));
    if let Some(uid) = viewer_scope {
        select = select.filter(submission::Column::UserId.eq(uid));
    }
    if let Some(pid) = query.problem_id {
        select = select.filter(submission::Column::ProblemId.eq(pid));
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;
    let total_pages = total.div_ceil(per_page);

    let data = select
        .order_by_desc(submission::Column::CreatedAt)
        .order_by_desc(submission::Column::Id)
        .paginate(&state.db, per_page)
        .fetch_page(page - 1)
        .await?
        .into_iter()
        .map(SubmissionResponse::from)
        .collect();

    Ok(Json(SubmissionListResponse {
        data,
        pagination: Pagination {
            page,
            per_page,
            total,
            total_pages,
        },
    }))
}

#[utoipa::path(
    get,
    path = "/{id}/submissions/{submission_id}",
    tag = "Submissions",
    operation_id = "getSubmission",
    summary = "Get one submission",
    description = "Students may fetch their own submissions; `submission:view_all` opens everyone's.",
    params(
        ("id" = i32, Path, description = "Activity ID"),
        ("submission_id" = i32, Path, description = "Submission ID"),
    ),
    responses(
        (status = 200, description = "The submission", body = SubmissionResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(activity_id = id, submission_id, ?kind))]
pub async fn get_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Extension(kind): Extension<ActivityKind>,
    Path((id, submission_id)): Path<(i32, i32)>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let activity = find_activity(&state.db, kind, id).await?;
    check_visibility(&auth_user, &activity)?;

    let model = submission::Entity::find_by_id(submission_id)
        .filter(submission::Column::ContestId.eq(id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Submission not found".into()))?;

    if model.user_id != auth_user.user_id {
        auth_user.require_permission("submission:view_all")?;
    }

    Ok(Json(SubmissionResponse::from(model)))
}

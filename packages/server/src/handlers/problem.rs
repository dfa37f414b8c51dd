use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::instrument;

use common::judge::languages;

use crate::entity::{problem, test_case};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::judging::{self, JudgeCase};
use crate::models::problem::*;
use crate::models::shared::{Pagination, escape_like};
use crate::models::submission::validate_code;
use crate::state::AppState;

/// Find a problem by ID or return 404.
async fn find_problem<C: ConnectionTrait>(db: &C, id: i32) -> Result<problem::Model, AppError> {
    problem::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Problem not found".into()))
}

async fn next_test_case_position<C: ConnectionTrait>(
    db: &C,
    problem_id: i32,
) -> Result<i32, AppError> {
    let max_pos: Option<i32> = test_case::Entity::find()
        .filter(test_case::Column::ProblemId.eq(problem_id))
        .select_only()
        .column_as(test_case::Column::Position.max(), "max_pos")
        .into_tuple::<Option<i32>>()
        .one(db)
        .await?
        .flatten();
    Ok(max_pos.map_or(0, |m| m + 1))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Problems",
    operation_id = "createProblem",
    summary = "Create a new problem",
    description = "Creates a new problem. Requires `problem:create` permission.",
    request_body = CreateProblemRequest,
    responses(
        (status = 201, description = "Problem created", body = ProblemResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(title = %payload.title))]
pub async fn create_problem(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateProblemRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("problem:create")?;
    validate_create_problem(&payload)?;

    let now = chrono::Utc::now();
    let new_problem = problem::ActiveModel {
        title: Set(payload.title.trim().to_string()),
        statement: Set(payload.statement),
        difficulty: Set(payload.difficulty),
        points: Set(payload.points),
        time_limit: Set(payload.time_limit),
        memory_limit: Set(payload.memory_limit),
        sample_input: Set(payload.sample_input),
        sample_output: Set(payload.sample_output),
        author_id: Set(auth_user.user_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let model = new_problem.insert(&state.db).await?;

    Ok((StatusCode::CREATED, Json(ProblemResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Problems",
    operation_id = "listProblems",
    summary = "List problems with pagination and search",
    params(ProblemListQuery),
    responses(
        (status = 200, description = "List of problems", body = ProblemListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, query))]
pub async fn list_problems(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ProblemListQuery>,
) -> Result<Json<ProblemListResponse>, AppError> {
    let page = Ord::max(query.page.unwrap_or(1), 1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let mut select = problem::Entity::find();

    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(problem::Column::Title)))
                    .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
            );
        }
    }
    if let Some(ref difficulty) = query.difficulty {
        if !DIFFICULTIES.contains(&difficulty.as_str()) {
            return Err(AppError::Validation(
                "difficulty must be one of: easy, medium, hard".into(),
            ));
        }
        select = select.filter(problem::Column::Difficulty.eq(difficulty));
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;
    let total_pages = total.div_ceil(per_page);

    let data = select
        .order_by_asc(problem::Column::Id)
        .select_only()
        .columns([
            problem::Column::Id,
            problem::Column::Title,
            problem::Column::Difficulty,
            problem::Column::Points,
            problem::Column::CreatedAt,
        ])
        .into_model::<ProblemListItem>()
        .paginate(&state.db, per_page)
        .fetch_page(page - 1)
        .await?;

    Ok(Json(ProblemListResponse {
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
    path = "/{id}",
    tag = "Problems",
    operation_id = "getProblem",
    summary = "Get a problem by ID",
    params(("id" = i32, Path, description = "Problem ID")),
    responses(
        (status = 200, description = "The problem", body = ProblemResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(problem_id = id))]
pub async fn get_problem(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ProblemResponse>, AppError> {
    let model = find_problem(&state.db, id).await?;
    Ok(Json(ProblemResponse::from(model)))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Problems",
    operation_id = "updateProblem",
    summary = "Update a problem",
    description = "Partially updates a problem. Requires `problem:edit` permission.",
    params(("id" = i32, Path, description = "Problem ID")),
    request_body = UpdateProblemRequest,
    responses(
        (status = 200, description = "Problem updated", body = ProblemResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(problem_id = id))]
pub async fn update_problem(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateProblemRequest>,
) -> Result<Json<ProblemResponse>, AppError> {
    auth_user.require_permission("problem:edit")?;
    validate_update_problem(&payload)?;

    let existing = find_problem(&state.db, id).await?;
    let mut active: problem::ActiveModel = existing.into();

    if let Some(title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(statement) = payload.statement {
        active.statement = Set(statement);
    }
    if let Some(difficulty) = payload.difficulty {
        active.difficulty = Set(difficulty);
    }
    if let Some(points) = payload.points {
        active.points = Set(points);
    }
    if let Some(time_limit) = payload.time_limit {
        active.time_limit = Set(time_limit);
    }
    if let Some(memory_limit) = payload.memory_limit {
        active.memory_limit = Set(memory_limit);
    }
    if let Some(sample_input) = payload.sample_input {
        active.sample_input = Set(sample_input);
    }
    if let Some(sample_output) = payload.sample_output {
        active.sample_output = Set(sample_output);
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&state.db).await?;
    Ok(Json(ProblemResponse::from(model)))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Problems",
    operation_id = "deleteProblem",
    summary = "Delete a problem",
    description = "Deletes a problem and its test cases. Requires `problem:delete` permission. Fails with 409 if the problem is attached to any contest.",
    params(("id" = i32, Path, description = "Problem ID")),
    responses(
        (status = 204, description = "Problem deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Problem still in use (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(problem_id = id))]
pub async fn delete_problem(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("problem:delete")?;

    let txn = state.db.begin().await?;
    find_problem(&txn, id).await?;

    let in_use = crate::entity::contest_problem::Entity::find()
        .filter(crate::entity::contest_problem::Column::ProblemId.eq(id))
        .one(&txn)
        .await?
        .is_some();
    if in_use {
        return Err(AppError::Conflict(
            "Problem is attached to a contest or assignment; detach it first".into(),
        ));
    }

    test_case::Entity::delete_many()
        .filter(test_case::Column::ProblemId.eq(id))
        .exec(&txn)
        .await?;
    problem::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Test cases
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/",
    tag = "Test Cases",
    operation_id = "listTestCases",
    summary = "List a problem's test cases",
    description = "Returns the problem's test cases in judging order. Callers without `problem:edit` see only non-hidden cases.",
    params(("id" = i32, Path, description = "Problem ID")),
    responses(
        (status = 200, description = "Test cases", body = Vec<TestCaseResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(problem_id = id))]
pub async fn list_test_cases(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<TestCaseResponse>>, AppError> {
    find_problem(&state.db, id).await?;

    let mut select = test_case::Entity::find().filter(test_case::Column::ProblemId.eq(id));
    if !auth_user.has_permission("problem:edit") {
        select = select.filter(test_case::Column::IsHidden.eq(false));
    }

    let cases = select
        .order_by_asc(test_case::Column::Position)
        .order_by_asc(test_case::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(cases.into_iter().map(TestCaseResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Test Cases",
    operation_id = "createTestCase",
    summary = "Add a test case to a problem",
    description = "Requires `problem:edit` permission. Position defaults to the end of the list.",
    params(("id" = i32, Path, description = "Problem ID")),
    request_body = CreateTestCaseRequest,
    responses(
        (status = 201, description = "Test case created", body = TestCaseResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(problem_id = id))]
pub async fn create_test_case(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<CreateTestCaseRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("problem:edit")?;
    validate_create_test_case(&payload)?;

    let txn = state.db.begin().await?;
    find_problem(&txn, id).await?;

    let position = match payload.position {
        Some(pos) => pos,
        None => next_test_case_position(&txn, id).await?,
    };

    let new_case = test_case::ActiveModel {
        input: Set(payload.input),
        expected_output: Set(payload.expected_output),
        is_hidden: Set(payload.is_hidden),
        position: Set(position),
        problem_id: Set(id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let model = new_case.insert(&txn).await?;
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(TestCaseResponse::from(model))))
}

#[utoipa::path(
    patch,
    path = "/{tc_id}",
    tag = "Test Cases",
    operation_id = "updateTestCase",
    summary = "Update a test case",
    description = "Requires `problem:edit` permission.",
    params(
        ("id" = i32, Path, description = "Problem ID"),
        ("tc_id" = i32, Path, description = "Test case ID"),
    ),
    request_body = UpdateTestCaseRequest,
    responses(
        (status = 200, description = "Test case updated", body = TestCaseResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Problem or test case not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(problem_id = id, tc_id))]
pub async fn update_test_case(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, tc_id)): Path<(i32, i32)>,
    AppJson(payload): AppJson<UpdateTestCaseRequest>,
) -> Result<Json<TestCaseResponse>, AppError> {
    auth_user.require_permission("problem:edit")?;
    if payload.position.is_some_and(|p| p < 0) {
        return Err(AppError::Validation("Position must be >= 0".into()));
    }

    let existing = test_case::Entity::find_by_id(tc_id)
        .filter(test_case::Column::ProblemId.eq(id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Test case not found".into()))?;

    let mut active: test_case::ActiveModel = existing.into();
    if let Some(input) = payload.input {
        active.input = Set(input);
    }
    if let Some(expected_output) = payload.expected_output {
        active.expected_output = Set(expected_output);
    }
    if let Some(is_hidden) = payload.is_hidden {
        active.is_hidden = Set(is_hidden);
    }
    if let Some(position) = payload.position {
        active.position = Set(position);
    }

    let model = active.update(&state.db).await?;
    Ok(Json(TestCaseResponse::from(model)))
}

#[utoipa::path(
    delete,
    path = "/{tc_id}",
    tag = "Test Cases",
    operation_id = "deleteTestCase",
    summary = "Delete a test case",
    description = "Requires `problem:edit` permission.",
    params(
        ("id" = i32, Path, description = "Problem ID"),
        ("tc_id" = i32, Path, description = "Test case ID"),
    ),
    responses(
        (status = 204, description = "Test case deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Problem or test case not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(problem_id = id, tc_id))]
pub async fn delete_test_case(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, tc_id)): Path<(i32, i32)>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("problem:edit")?;

    let existing = test_case::Entity::find_by_id(tc_id)
        .filter(test_case::Column::ProblemId.eq(id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Test case not found".into()))?;

    let active: test_case::ActiveModel = existing.into();
    active.delete(&state.db).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Run preview
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/{id}/run",
    tag = "Problems",
    operation_id = "runProblem",
    summary = "Run code against a problem's visible test cases",
    description = "Executes code against the problem's non-hidden test cases and echoes per-case output. Nothing is recorded; this is a practice/preview facility. Requires `submission:submit` permission.",
    params(("id" = i32, Path, description = "Problem ID")),
    request_body = RunRequest,
    responses(
        (status = 200, description = "Per-case results", body = RunResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
        (status = 502, description = "Judge failed (JUDGE_UNAVAILABLE)", body = ErrorBody),
        (status = 504, description = "Judge timed out (JUDGE_TIMEOUT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(problem_id = id, language = %payload.language))]
pub async fn run_problem(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<RunRequest>,
) -> Result<Json<RunResponse>, AppError> {
    auth_user.require_permission("submission:submit")?;
    validate_code(&payload.language, &payload.code)?;
    let language_id = languages::language_id(&payload.language)
        .ok_or_else(|| AppError::Validation("Unsupported language".into()))?;

    find_problem(&state.db, id).await?;

    let cases: Vec<JudgeCase> = test_case::Entity::find()
        .filter(test_case::Column::ProblemId.eq(id))
        .filter(test_case::Column::IsHidden.eq(false))
        .order_by_asc(test_case::Column::Position)
        .order_by_asc(test_case::Column::Id)
        .all(&state.db)
        .await?
        .into_iter()
        .map(JudgeCase::from)
        .collect();

    if cases.is_empty() {
        return Err(AppError::Validation(
            "Problem has no visible test cases to run against".into(),
        ));
    }

    let outcome =
        judging::run_test_cases(state.judge.as_ref(), language_id, &payload.code, &cases).await?;

    let results = cases
        .into_iter()
        .zip(outcome.case_results)
        .map(|(case, result)| RunCaseResult {
            input: case.input,
            expected_output: case.expected_output,
            stdout: result.stdout,
            stderr: result.stderr,
            passed: result.passed,
        })
        .collect();

    Ok(Json(RunResponse {
        results,
        cases_passed: outcome.cases_passed,
        cases_total: outcome.cases_total,
    }))
}

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::instrument;

use crate::core::lifecycle::{self, StartOutcome};
use crate::entity::contest::{self, ActivityKind};
use crate::entity::{contest_problem, enrollment, problem, submission, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::contest::*;
use crate::models::shared::{Pagination, escape_like};
use crate::state::AppState;
use crate::utils::activity::{
    check_visibility, find_activity, find_activity_for_update, find_contest_problem,
    find_enrollment_for_update, participation_of, schedule_of,
};

#[utoipa::path(
    post,
    path = "/",
    tag = "Activities",
    operation_id = "createActivity",
    summary = "Create a new contest or assignment",
    description = "Creates a draft (unpublished) activity. Requires `contest:create` permission.",
    request_body = CreateActivityRequest,
    responses(
        (status = 201, description = "Activity created", body = ActivityResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(title = %payload.title, ?kind))]
pub async fn create_activity(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Extension(kind): Extension<ActivityKind>,
    AppJson(payload): AppJson<CreateActivityRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("contest:create")?;
    validate_create_activity(&payload)?;

    let now = chrono::Utc::now();
    let new_activity = contest::ActiveModel {
        title: Set(payload.title.trim().to_string()),
        description: Set(payload.description),
        kind: Set(kind),
        scheduled_start: Set(payload.scheduled_start),
        duration_minutes: Set(payload.duration_minutes),
        published: Set(false),
        owner_id: Set(auth_user.user_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let model = new_activity.insert(&state.db).await?;
    let phase = lifecycle::phase_at(&schedule_of(&model), now);

    Ok((
        StatusCode::CREATED,
        Json(ActivityResponse::from_model(model, phase)),
    ))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Activities",
    operation_id = "listActivities",
    summary = "List contests or assignments",
    description = "Paginated listing. Students see only published activities; managers and owners also see drafts.",
    params(ActivityListQuery),
    responses(
        (status = 200, description = "List of activities", body = ActivityListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(?kind))]
pub async fn list_activities(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Extension(kind): Extension<ActivityKind>,
    Query(query): Query<ActivityListQuery>,
) -> Result<Json<ActivityListResponse>, AppError> {
    let page = Ord::max(query.page.unwrap_or(1), 1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let mut select = contest::Entity::find().filter(contest::Column::Kind.eq(kind));

    if !auth_user.has_permission("contest:manage") {
        select = select.filter(
            Condition::any()
                .add(contest::Column::Published.eq(true))
                .add(contest::Column::OwnerId.eq(auth_user.user_id)),
        );
    }

    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(contest::Column::Title)))
                    .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
            );
        }
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;
    let total_pages = total.div_ceil(per_page);

    let rows = select
        .order_by_desc(contest::Column::ScheduledStart)
        .select_only()
        .columns([
            contest::Column::Id,
            contest::Column::Title,
            contest::Column::Kind,
            contest::Column::ScheduledStart,
            contest::Column::DurationMinutes,
            contest::Column::Published,
            contest::Column::CreatedAt,
        ])
        .into_model::<ActivityListRow>()
        .paginate(&state.db, per_page)
        .fetch_page(page - 1)
        .await?;

    let now = chrono::Utc::now();
    let data = rows
        .into_iter()
        .map(|row| {
            let schedule = lifecycle::Schedule {
                kind: row.kind,
                published: row.published,
                scheduled_start: row.scheduled_start,
                duration: chrono::Duration::minutes(i64::from(row.duration_minutes)),
            };
            ActivityListItem {
                id: row.id,
                title: row.title,
                kind: row.kind,
                scheduled_start: row.scheduled_start,
                duration_minutes: row.duration_minutes,
                published: row.published,
                phase: lifecycle::phase_at(&schedule, now),
                created_at: row.created_at,
            }
        })
        .collect();

    Ok(Json(ActivityListResponse {
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
    tag = "Activities",
    operation_id = "getActivity",
    summary = "Get an activity by ID",
    params(("id" = i32, Path, description = "Activity ID")),
    responses(
        (status = 200, description = "The activity", body = ActivityResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found or draft (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(activity_id = id, ?kind))]
pub async fn get_activity(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Extension(kind): Extension<ActivityKind>,
    Path(id): Path<i32>,
) -> Result<Json<ActivityResponse>, AppError> {
    let model = find_activity(&state.db, kind, id).await?;
    check_visibility(&auth_user, &model)?;
    let phase = lifecycle::phase_at(&schedule_of(&model), chrono::Utc::now());
    Ok(Json(ActivityResponse::from_model(model, phase)))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Activities",
    operation_id = "updateActivity",
    summary = "Update an activity",
    description = "Partially updates title, description or schedule. Requires `contest:manage` permission.",
    params(("id" = i32, Path, description = "Activity ID")),
    request_body = UpdateActivityRequest,
    responses(
        (status = 200, description = "Activity updated", body = ActivityResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(activity_id = id, ?kind))]
pub async fn update_activity(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Extension(kind): Extension<ActivityKind>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateActivityRequest>,
) -> Result<Json<ActivityResponse>, AppError> {
    auth_user.require_permission("contest:manage")?;
    validate_update_activity(&payload)?;

    let txn = state.db.begin().await?;
    let existing = find_activity_for_update(&txn, kind, id).await?;

    let mut active: contest::ActiveModel = existing.into();
    if let Some(title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(scheduled_start) = payload.scheduled_start {
        active.scheduled_start = Set(scheduled_start);
    }
    if let Some(duration_minutes) = payload.duration_minutes {
        active.duration_minutes = Set(duration_minutes);
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&txn).await?;
    txn.commit().await?;

    let phase = lifecycle::phase_at(&schedule_of(&model), chrono::Utc::now());
    Ok(Json(ActivityResponse::from_model(model, phase)))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Activities",
    operation_id = "deleteActivity",
    summary = "Delete an activity",
    description = "Deletes the activity together with its problem links, enrollments and scoped submissions. Requires `contest:delete`, or `contest:manage` on an activity you own.",
    params(("id" = i32, Path, description = "Activity ID")),
    responses(
        (status = 204, description = "Activity deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(activity_id = id, ?kind))]
pub async fn delete_activity(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Extension(kind): Extension<ActivityKind>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let txn = state.db.begin().await?;
    let existing = find_activity_for_update(&txn, kind, id).await?;

    let is_owner = existing.owner_id == auth_user.user_id;
    if !auth_user.has_permission("contest:delete")
        && !(is_owner && auth_user.has_permission("contest:manage"))
    {
        return Err(AppError::PermissionDenied);
    }

    // Cascade: links, enrollments and scoped submissions go with the parent.
    submission::Entity::delete_many()
        .filter(submission::Column::ContestId.eq(id))
        .exec(&txn)
        .await?;
    enrollment::Entity::delete_many()
        .filter(enrollment::Column::ContestId.eq(id))
        .exec(&txn)
        .await?;
    contest_problem::Entity::delete_many()
        .filter(contest_problem::Column::ContestId.eq(id))
        .exec(&txn)
        .await?;
    contest::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/{id}/publish",
    tag = "Activities",
    operation_id = "publishActivity",
    summary = "Publish an activity",
    description = "Makes the activity visible to students. Requires `contest:manage` permission. Idempotent.",
    params(("id" = i32, Path, description = "Activity ID")),
    responses(
        (status = 200, description = "Published", body = ActivityResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(activity_id = id, ?kind))]
pub async fn publish_activity(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Extension(kind): Extension<ActivityKind>,
    Path(id): Path<i32>,
) -> Result<Json<ActivityResponse>, AppError> {
    set_published(auth_user, state, kind, id, true).await
}

#[utoipa::path(
    post,
    path = "/{id}/unpublish",
    tag = "Activities",
    operation_id = "unpublishActivity",
    summary = "Unpublish an activity",
    description = "Returns the activity to Draft, hiding it from students. Requires `contest:manage` permission. Idempotent.",
    params(("id" = i32, Path, description = "Activity ID")),
    responses(
        (status = 200, description = "Unpublished", body = ActivityResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(activity_id = id, ?kind))]
pub async fn unpublish_activity(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Extension(kind): Extension<ActivityKind>,
    Path(id): Path<i32>,
) -> Result<Json<ActivityResponse>, AppError> {
    set_published(auth_user, state, kind, id, false).await
}

async fn set_published(
    auth_user: AuthUser,
    state: AppState,
    kind: ActivityKind,
    id: i32,
    published: bool,
) -> Result<Json<ActivityResponse>, AppError> {
    auth_user.require_permission("contest:manage")?;

    let txn = state.db.begin().await?;
    let existing = find_activity_for_update(&txn, kind, id).await?;

    let mut active: contest::ActiveModel = existing.into();
    active.published = Set(published);
    active.updated_at = Set(chrono::Utc::now());
    let model = active.update(&txn).await?;
    txn.commit().await?;

    let phase = lifecycle::phase_at(&schedule_of(&model), chrono::Utc::now());
    Ok(Json(ActivityResponse::from_model(model, phase)))
}

// ---------------------------------------------------------------------------
// Attached problems
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/",
    tag = "Activity Problems",
    operation_id = "addActivityProblem",
    summary = "Attach a problem to an activity",
    description = "Requires `contest:manage` permission. Point override is optional; omitted means the problem's own default applies.",
    params(("id" = i32, Path, description = "Activity ID")),
    request_body = AddContestProblemRequest,
    responses(
        (status = 201, description = "Problem attached", body = ContestProblemResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Activity or problem not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Problem already attached (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(activity_id = id, ?kind))]
pub async fn add_activity_problem(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Extension(kind): Extension<ActivityKind>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<AddContestProblemRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("contest:manage")?;
    validate_add_contest_problem(&payload)?;

    let txn = state.db.begin().await?;
    find_activity_for_update(&txn, kind, id).await?;

    let target = problem::Entity::find_by_id(payload.problem_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Problem not found".into()))?;

    let position = match payload.position {
        Some(pos) => pos,
        None => next_problem_position(&txn, id).await?,
    };

    let new_cp = contest_problem::ActiveModel {
        contest_id: Set(id),
        problem_id: Set(payload.problem_id),
        label: Set(payload.label.trim().to_string()),
        position: Set(position),
        points: Set(payload.points),
    };

    match new_cp.insert(&txn).await {
        Ok(model) => {
            txn.commit().await?;
            let effective_points = model.points.unwrap_or(target.points);
            Ok((
                StatusCode::CREATED,
                Json(ContestProblemResponse {
                    contest_id: model.contest_id,
                    problem_id: model.problem_id,
                    label: model.label,
                    position: model.position,
                    points: model.points,
                    effective_points,
                    problem_title: target.title,
                }),
            ))
        }
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            Err(AppError::Conflict("Problem already attached".into()))
        }
        Err(e) => Err(e.into()),
    }
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Activity Problems",
    operation_id = "listActivityProblems",
    summary = "List problems attached to an activity",
    params(("id" = i32, Path, description = "Activity ID")),
    responses(
        (status = 200, description = "Attached problems in order", body = Vec<ContestProblemResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(activity_id = id, ?kind))]
pub async fn list_activity_problems(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Extension(kind): Extension<ActivityKind>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<ContestProblemResponse>>, AppError> {
    let activity = find_activity(&state.db, kind, id).await?;
    check_visibility(&auth_user, &activity)?;

    let links = contest_problem::Entity::find()
        .filter(contest_problem::Column::ContestId.eq(id))
        .find_also_related(problem::Entity)
        .order_by_asc(contest_problem::Column::Position)
        .order_by_asc(contest_problem::Column::ProblemId)
        .all(&state.db)
        .await?;

    let data = links
        .into_iter()
        .map(|(link, problem)| {
            let (title, default_points) =
                problem.map_or((String::new(), 0), |p| (p.title, p.points));
            ContestProblemResponse {
                contest_id: link.contest_id,
                problem_id: link.problem_id,
                label: link.label,
                position: link.position,
                points: link.points,
                effective_points: link.points.unwrap_or(default_points),
                problem_title: title,
            }
        })
        .collect();

    Ok(Json(data))
}

#[utoipa::path(
    patch,
    path = "/{problem_id}",
    tag = "Activity Problems",
    operation_id = "updateActivityProblem",
    summary = "Update a problem's label, position or point override",
    description = "Requires `contest:manage` permission. Setting `points` to null clears the override.",
    params(
        ("id" = i32, Path, description = "Activity ID"),
        ("problem_id" = i32, Path, description = "Problem ID"),
    ),
    request_body = UpdateContestProblemRequest,
    responses(
        (status = 200, description = "Link updated", body = ContestProblemResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Activity or link not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(activity_id = id, problem_id, ?kind))]
pub async fn update_activity_problem(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Extension(kind): Extension<ActivityKind>,
    Path((id, problem_id)): Path<(i32, i32)>,
    AppJson(payload): AppJson<UpdateContestProblemRequest>,
) -> Result<Json<ContestProblemResponse>, AppError> {
    auth_user.require_permission("contest:manage")?;
    if let Some(label) = &payload.label {
        let label = label.trim();
        if label.is_empty() || label.chars().count() > 16 {
            return Err(AppError::Validation("Label must be 1-16 characters".into()));
        }
    }
    if payload.position.is_some_and(|p| p < 0) {
        return Err(AppError::Validation("Position must be >= 0".into()));
    }
    if let Some(Some(points)) = payload.points
        && points < 0
    {
        return Err(AppError::Validation("points must be >= 0".into()));
    }

    let txn = state.db.begin().await?;
    find_activity_for_update(&txn, kind, id).await?;
    let existing = find_contest_problem(&txn, id, problem_id).await?;

    let mut active: contest_problem::ActiveModel = existing.into();
    if let Some(label) = payload.label {
        active.label = Set(label.trim().to_string());
    }
    if let Some(position) = payload.position {
        active.position = Set(position);
    }
    if let Some(points) = payload.points {
        active.points = Set(points);
    }

    let model = active.update(&txn).await?;
    let target = problem::Entity::find_by_id(problem_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Problem not found".into()))?;
    txn.commit().await?;

    let effective_points = model.points.unwrap_or(target.points);
    Ok(Json(ContestProblemResponse {
        contest_id: model.contest_id,
        problem_id: model.problem_id,
        label: model.label,
        position: model.position,
        points: model.points,
        effective_points,
        problem_title: target.title,
    }))
}

#[utoipa::path(
    delete,
    path = "/{problem_id}",
    tag = "Activity Problems",
    operation_id = "removeActivityProblem",
    summary = "Detach a problem from an activity",
    description = "Requires `contest:manage` permission. Existing submissions stay on record but no longer score.",
    params(
        ("id" = i32, Path, description = "Activity ID"),
        ("problem_id" = i32, Path, description = "Problem ID"),
    ),
    responses(
        (status = 204, description = "Problem detached"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Activity or link not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(activity_id = id, problem_id, ?kind))]
pub async fn remove_activity_problem(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Extension(kind): Extension<ActivityKind>,
    Path((id, problem_id)): Path<(i32, i32)>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("contest:manage")?;

    let txn = state.db.begin().await?;
    find_activity_for_update(&txn, kind, id).await?;
    let cp = find_contest_problem(&txn, id, problem_id).await?;
    let active: contest_problem::ActiveModel = cp.into();
    active.delete(&txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Participation commands
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/{id}/join",
    tag = "Participation",
    operation_id = "joinActivity",
    summary = "Enroll in an activity",
    description = "Creates an enrollment while the activity is Active. Joining twice is an idempotent success. Joining an ended activity fails with ALREADY_ENDED; joining before the window opens fails with NOT_YET_OPEN.",
    params(("id" = i32, Path, description = "Activity ID")),
    responses(
        (status = 201, description = "Enrolled", body = EnrollmentResponse),
        (status = 200, description = "Already enrolled", body = EnrollmentResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found or draft (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "State conflict (NOT_YET_OPEN, ALREADY_ENDED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(activity_id = id, user_id = auth_user.user_id, ?kind))]
pub async fn join_activity(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Extension(kind): Extension<ActivityKind>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let now = chrono::Utc::now();

    let txn = state.db.begin().await?;
    let activity = find_activity(&txn, kind, id).await?;
    check_visibility(&auth_user, &activity)?;
    lifecycle::check_join(&schedule_of(&activity), now)?;

    if let Some(existing) = find_enrollment_for_update(&txn, id, auth_user.user_id).await? {
        txn.commit().await?;
        return Ok((StatusCode::OK, Json(EnrollmentResponse::from(existing))));
    }

    let new_enrollment = enrollment::ActiveModel {
        contest_id: Set(id),
        user_id: Set(auth_user.user_id),
        registered_at: Set(now),
        started_at: Set(None),
    };

    match new_enrollment.insert(&txn).await {
        Ok(model) => {
            txn.commit().await?;
            Ok((StatusCode::CREATED, Json(EnrollmentResponse::from(model))))
        }
        // Lost a race against ourselves; the other request's row wins.
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            txn.rollback().await?;
            let existing = enrollment::Entity::find_by_id((id, auth_user.user_id))
                .one(&state.db)
                .await?
                .ok_or_else(|| AppError::Internal("enrollment vanished after conflict".into()))?;
            Ok((StatusCode::OK, Json(EnrollmentResponse::from(existing))))
        }
        Err(e) => Err(e.into()),
    }
}

#[utoipa::path(
    post,
    path = "/{id}/start",
    tag = "Participation",
    operation_id = "startActivity",
    summary = "Start your personal clock",
    description = "Contest-only: stamps `started_at` and opens the per-student submission window. Repeating the call is a no-op that returns the original instant. Requires an enrollment.",
    params(("id" = i32, Path, description = "Activity ID")),
    responses(
        (status = 200, description = "Clock running", body = StartResponse),
        (status = 400, description = "Assignments have no start action (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found or draft (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "State conflict (NOT_YET_OPEN, ALREADY_ENDED, NOT_ENROLLED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(activity_id = id, user_id = auth_user.user_id, ?kind))]
pub async fn start_activity(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Extension(kind): Extension<ActivityKind>,
    Path(id): Path<i32>,
) -> Result<Json<StartResponse>, AppError> {
    if kind == ActivityKind::Assignment {
        return Err(AppError::Validation(
            "Assignments share one window; there is nothing to start".into(),
        ));
    }

    let now = chrono::Utc::now();

    let txn = state.db.begin().await?;
    let activity = find_activity(&txn, kind, id).await?;
    check_visibility(&auth_user, &activity)?;

    let enrollment_row = find_enrollment_for_update(&txn, id, auth_user.user_id).await?;
    let participation = enrollment_row.as_ref().map(participation_of);
    let schedule = schedule_of(&activity);

    match lifecycle::check_start(&schedule, participation.as_ref(), now)? {
        StartOutcome::AlreadyStarted(at) => {
            txn.commit().await?;
            Ok(Json(StartResponse {
                started_at: at,
                ends_at: at + schedule.duration,
            }))
        }
        StartOutcome::Started => {
            // check_start only returns Started for an existing enrollment.
            let row = enrollment_row
                .ok_or_else(|| AppError::Internal("missing enrollment after check".into()))?;
            let mut active: enrollment::ActiveModel = row.into();
            active.started_at = Set(Some(now));
            active.update(&txn).await?;
            txn.commit().await?;
            Ok(Json(StartResponse {
                started_at: now,
                ends_at: now + schedule.duration,
            }))
        }
    }
}

#[utoipa::path(
    get,
    path = "/{id}/participants",
    tag = "Participation",
    operation_id = "listParticipants",
    summary = "List enrolled participants",
    params(("id" = i32, Path, description = "Activity ID")),
    responses(
        (status = 200, description = "Participants in enrollment order", body = Vec<ParticipantResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found or draft (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(activity_id = id, ?kind))]
pub async fn list_participants(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Extension(kind): Extension<ActivityKind>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<ParticipantResponse>>, AppError> {
    let activity = find_activity(&state.db, kind, id).await?;
    check_visibility(&auth_user, &activity)?;

    let rows = enrollment::Entity::find()
        .filter(enrollment::Column::ContestId.eq(id))
        .find_also_related(user::Entity)
        .order_by_asc(enrollment::Column::RegisteredAt)
        .all(&state.db)
        .await?;

    let data = rows
        .into_iter()
        .map(|(enrollment, user)| ParticipantResponse {
            user_id: enrollment.user_id,
            username: user.map_or(String::new(), |u| u.username),
            registered_at: enrollment.registered_at,
            started_at: enrollment.started_at,
        })
        .collect();

    Ok(Json(data))
}

async fn next_problem_position<C: ConnectionTrait>(
    db: &C,
    contest_id: i32,
) -> Result<i32, AppError> {
    let max_pos: Option<i32> = contest_problem::Entity::find()
        .filter(contest_problem::Column::ContestId.eq(contest_id))
        .select_only()
        .column_as(contest_problem::Column::Position.max(), "max_pos")
        .into_tuple::<Option<i32>>()
        .one(db)
        .await?
        .flatten();
    Ok(max_pos.map_or(0, |m| m + 1))
}

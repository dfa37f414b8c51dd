use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::{Extension, Json};
use sea_orm::*;
use tracing::instrument;

use crate::core::standings::{
    ParticipantRecord, ScoredProblem, SubmissionOutcome, compute_standings,
};
use crate::entity::contest::ActivityKind;
use crate::entity::{contest_problem, enrollment, problem, submission, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::leaderboard::{LeaderboardResponse, LeaderboardRow};
use crate::state::AppState;
use crate::utils::activity::{check_visibility, find_activity};

#[utoipa::path(
    get,
    path = "/{id}/leaderboard",
    tag = "Leaderboard",
    operation_id = "getLeaderboard",
    summary = "Ranked standings for an activity",
    description = "Recomputes standings from the submission history on every read: total points over the solved set (contest-specific point values), tie-broken by problems solved and earliest last submission. Every enrolled student appears, including those with no submissions.",
    params(("id" = i32, Path, description = "Activity ID")),
    responses(
        (status = 200, description = "Ranked standings", body = LeaderboardResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found or draft (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(activity_id = id, ?kind))]
pub async fn get_leaderboard(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Extension(kind): Extension<ActivityKind>,
    Path(id): Path<i32>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let activity = find_activity(&state.db, kind, id).await?;
    check_visibility(&auth_user, &activity)?;

    let problems: Vec<ScoredProblem> = contest_problem::Entity::find()
        .filter(contest_problem::Column::ContestId.eq(id))
        .find_also_related(problem::Entity)
        .all(&state.db)
        .await?
        .into_iter()
        .map(|(link, problem)| ScoredProblem {
            problem_id: link.problem_id,
            points: link.points,
            default_points: problem.map_or(0, |p| p.points),
        })
        .collect();

    let enrollments = enrollment::Entity::find()
        .filter(enrollment::Column::ContestId.eq(id))
        .find_also_related(user::Entity)
        .all(&state.db)
        .await?;

    let submissions = submission::Entity::find()
        .filter(submission::Column::ContestId.eq(id))
        .order_by_asc(submission::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let mut by_user: HashMap<i32, Vec<SubmissionOutcome>> = HashMap::new();
    for sub in submissions {
        by_user.entry(sub.user_id).or_default().push(SubmissionOutcome {
            problem_id: sub.problem_id,
            status: sub.status,
            submitted_at: sub.created_at,
        });
    }

    let mut names: HashMap<i32, (String, String)> = HashMap::new();
    let participants: Vec<ParticipantRecord> = enrollments
        .into_iter()
        .map(|(enrollment, user)| {
            if let Some(u) = user {
                names.insert(enrollment.user_id, (u.username, u.display_name));
            }
            ParticipantRecord {
                user_id: enrollment.user_id,
                submissions: by_user.remove(&enrollment.user_id).unwrap_or_default(),
            }
        })
        .collect();

    let rows = compute_standings(&problems, &participants)
        .into_iter()
        .map(|standing| {
            let (username, display_name) = names
                .remove(&standing.user_id)
                .unwrap_or_else(|| (String::new(), String::new()));
            LeaderboardRow::from_standing(standing, username, display_name)
        })
        .collect();

    Ok(Json(LeaderboardResponse {
        contest_id: id,
        generated_at: chrono::Utc::now(),
        rows,
    }))
}

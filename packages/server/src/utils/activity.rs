use sea_orm::*;
use sea_orm::sea_query::LockType;

use crate::core::lifecycle::{Participation, Schedule};
use crate::entity::contest::{self, ActivityKind};
use crate::entity::{contest_problem, enrollment};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;

fn kind_noun(kind: ActivityKind) -> &'static str {
    match kind {
        ActivityKind::Contest => "Contest",
        ActivityKind::Assignment => "Assignment",
    }
}

/// Translate a row into the pure lifecycle view.
pub fn schedule_of(activity: &contest::Model) -> Schedule {
    Schedule {
        kind: activity.kind,
        published: activity.published,
        scheduled_start: activity.scheduled_start,
        duration: activity.duration(),
    }
}

pub fn participation_of(enrollment: &enrollment::Model) -> Participation {
    Participation {
        started_at: enrollment.started_at,
    }
}

/// Look up an activity by ID, returning 404 if it does not exist or is of the
/// other kind (an assignment fetched through /contests is a 404, not a leak).
pub async fn find_activity<C: ConnectionTrait>(
    db: &C,
    kind: ActivityKind,
    id: i32,
) -> Result<contest::Model, AppError> {
    contest::Entity::find_by_id(id)
        .filter(contest::Column::Kind.eq(kind))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} not found", kind_noun(kind))))
}

/// Same lookup with a row lock, for read-modify-write command handlers.
pub async fn find_activity_for_update(
    txn: &DatabaseTransaction,
    kind: ActivityKind,
    id: i32,
) -> Result<contest::Model, AppError> {
    contest::Entity::find_by_id(id)
        .filter(contest::Column::Kind.eq(kind))
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} not found", kind_noun(kind))))
}

/// Drafts are visible only to managers and their owner; everyone else gets a
/// 404 so unpublished activities do not leak.
pub fn check_visibility(auth_user: &AuthUser, activity: &contest::Model) -> Result<(), AppError> {
    if activity.published
        || auth_user.has_permission("contest:manage")
        || activity.owner_id == auth_user.user_id
    {
        Ok(())
    } else {
        Err(AppError::NotFound(format!(
            "{} not found",
            kind_noun(activity.kind)
        )))
    }
}

/// Look up a contest-problem link, returning 404 if the problem is not
/// attached to the activity.
pub async fn find_contest_problem<C: ConnectionTrait>(
    db: &C,
    contest_id: i32,
    problem_id: i32,
) -> Result<contest_problem::Model, AppError> {
    contest_problem::Entity::find_by_id((contest_id, problem_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Problem is not part of this activity".into()))
}

/// Locked read: serializes join/start/submit per enrollment row.
pub async fn find_enrollment_for_update(
    txn: &DatabaseTransaction,
    contest_id: i32,
    user_id: i32,
) -> Result<Option<enrollment::Model>, AppError> {
    Ok(enrollment::Entity::find_by_id((contest_id, user_id))
        .lock(LockType::Update)
        .one(txn)
        .await?)
}

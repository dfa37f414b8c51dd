use sea_orm::*;
use tracing::info;

use crate::entity::{role, role_permission, submission};

/// Default roles seeded on startup.
const DEFAULT_ROLES: &[&str] = &["admin", "faculty", "student"];

/// Default role-permission mappings seeded on startup.
const DEFAULT_MAPPINGS: &[(&str, &str)] = &[
    // Admin: all permissions
    ("admin", "submission:submit"),
    ("admin", "submission:view_all"),
    ("admin", "problem:create"),
    ("admin", "problem:edit"),
    ("admin", "problem:delete"),
    ("admin", "contest:create"),
    ("admin", "contest:manage"),
    ("admin", "contest:delete"),
    ("admin", "user:manage"),
    // Faculty: author problems and run contests
    ("faculty", "submission:submit"),
    ("faculty", "submission:view_all"),
    ("faculty", "problem:create"),
    ("faculty", "problem:edit"),
    ("faculty", "problem:delete"),
    ("faculty", "contest:create"),
    ("faculty", "contest:manage"),
    // Student
    ("student", "submission:submit"),
];

/// Seed the `role` and `role_permission` tables with defaults.
pub async fn seed_role_permissions(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Seed roles
    let mut roles_inserted = 0u32;
    for &name in DEFAULT_ROLES {
        let model = role::ActiveModel {
            name: Set(name.to_string()),
        };

        let result = role::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(role::Column::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => roles_inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if roles_inserted > 0 {
        info!("Seeded {} new roles", roles_inserted);
    }

    // Seed role-permission mappings
    let mut perms_inserted = 0u32;
    for &(role, permission) in DEFAULT_MAPPINGS {
        let model = role_permission::ActiveModel {
            role: Set(role.to_string()),
            permission: Set(permission.to_string()),
        };

        let result = role_permission::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::columns([
                    role_permission::Column::Role,
                    role_permission::Column::Permission,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => perms_inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if perms_inserted > 0 {
        info!("Seeded {} new role-permission mappings", perms_inserted);
    }

    Ok(())
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite non-unique indexes,
/// so we create them manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    use sea_orm::sea_query::{Index, PostgresQueryBuilder};

    // Composite index for rate limiting queries:
    // SELECT COUNT(*) FROM submission WHERE user_id = ? AND created_at > ?
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_submission_user_created")
        .table(submission::Entity)
        .col(submission::Column::UserId)
        .col(submission::Column::CreatedAt)
        .to_string(PostgresQueryBuilder);

    match db.execute_unprepared(&stmt).await {
        Ok(_) => {
            info!("Ensured index idx_submission_user_created exists");
        }
        Err(e) => {
            tracing::warn!("Failed to create index idx_submission_user_created: {}", e);
        }
    }

    // Composite index for leaderboard and history queries:
    // SELECT ... FROM submission WHERE contest_id = ? AND user_id = ?
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_submission_contest_user")
        .table(submission::Entity)
        .col(submission::Column::ContestId)
        .col(submission::Column::UserId)
        .to_string(PostgresQueryBuilder);

    match db.execute_unprepared(&stmt).await {
        Ok(_) => {
            info!("Ensured index idx_submission_contest_user exists");
        }
        Err(e) => {
            tracing::warn!("Failed to create index idx_submission_contest_user: {}", e);
        }
    }

    Ok(())
}

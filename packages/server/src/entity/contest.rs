use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Timing variant of an activity.
///
/// A `Contest` runs on a per-student clock: each participant starts their own
/// window of `duration_minutes` inside the scheduled period. An `Assignment`
/// shares one window for everybody and has no individual start action.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize,
    DeriveActiveEnum, EnumIter, utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    #[sea_orm(string_value = "contest")]
    Contest,
    #[sea_orm(string_value = "assignment")]
    Assignment,
}

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contest")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    pub description: String, // in Markdown
    pub kind: ActivityKind,

    pub scheduled_start: DateTimeUtc,
    /// Must be > 0; the shared window ends at `scheduled_start + duration_minutes`.
    pub duration_minutes: i32,
    /// Unpublished activities are drafts, invisible to students.
    pub published: bool,

    pub owner_id: i32,
    #[sea_orm(belongs_to, from = "owner_id", to = "id", relation_enum = "Owner")]
    pub owner: HasOne<super::user::Entity>,

    #[sea_orm(has_many, via = "enrollment")]
    pub participants: HasMany<super::user::Entity>,

    #[sea_orm(has_many, via = "contest_problem")]
    pub problems: HasMany<super::problem::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    pub fn duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.duration_minutes))
    }

    /// End of the shared window.
    pub fn scheduled_end(&self) -> DateTimeUtc {
        self.scheduled_start + self.duration()
    }
}

impl ActiveModelBehavior for ActiveModel {}

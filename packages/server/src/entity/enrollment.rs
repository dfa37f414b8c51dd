use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A student's participation record for one contest or assignment.
///
/// The composite primary key enforces at most one enrollment per
/// (contest, student); joining twice is an idempotent success at the API level.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "enrollment")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub contest_id: i32,
    #[sea_orm(primary_key)]
    pub user_id: i32,
    #[sea_orm(belongs_to, from = "contest_id", to = "id")]
    pub contest: Option<super::contest::Entity>,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: Option<super::user::Entity>,

    pub registered_at: DateTimeUtc,

    /// When the student pressed "start". NULL until then. For contests the
    /// personal window is `started_at + contest.duration_minutes`; assignments
    /// ignore this field.
    pub started_at: Option<DateTimeUtc>,
}

impl ActiveModelBehavior for ActiveModel {}

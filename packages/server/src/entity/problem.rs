use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "problem")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    pub statement: String, // in Markdown
    /// One of "easy", "medium", "hard".
    pub difficulty: String,
    /// Default point value when a contest does not override it.
    pub points: i32,
    /// Advisory only; the external judge enforces its own limits.
    pub time_limit: i32,   // in milliseconds
    pub memory_limit: i32, // in kilobytes

    /// Worked example shown in the statement.
    #[sea_orm(column_type = "Text")]
    pub sample_input: String,
    #[sea_orm(column_type = "Text")]
    pub sample_output: String,

    pub author_id: i32,
    #[sea_orm(belongs_to, from = "author_id", to = "id")]
    pub author: HasOne<super::user::Entity>,

    #[sea_orm(has_many)]
    pub test_cases: HasMany<super::test_case::Entity>,

    #[sea_orm(has_many)]
    pub submissions: HasMany<super::submission::Entity>,

    #[sea_orm(has_many, via = "contest_problem")]
    pub contests: HasMany<super::contest::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

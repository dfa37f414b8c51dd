use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::standings::Standing;

/// One ranked leaderboard row, enriched with the participant's names.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LeaderboardRow {
    pub rank: u32,
    pub user_id: i32,
    pub username: String,
    pub display_name: String,
    pub total_points: i32,
    pub problems_solved: u32,
    pub last_submission_at: Option<DateTime<Utc>>,
}

impl LeaderboardRow {
    pub fn from_standing(s: Standing, username: String, display_name: String) -> Self {
        Self {
            rank: s.rank,
            user_id: s.user_id,
            username,
            display_name,
            total_points: s.total_points,
            problems_solved: s.problems_solved,
            last_submission_at: s.last_submission_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct LeaderboardResponse {
    pub contest_id: i32,
    /// When this snapshot was computed; standings are recomputed on read and
    /// may be slightly stale relative to in-flight submissions.
    pub generated_at: DateTime<Utc>,
    pub rows: Vec<LeaderboardRow>,
}

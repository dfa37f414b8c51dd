pub mod auth;
pub mod contest;
pub mod leaderboard;
pub mod problem;
pub mod submission;
pub mod users;

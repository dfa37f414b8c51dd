pub mod auth;
pub mod contest;
pub mod leaderboard;
pub mod problem;
pub mod shared;
pub mod submission;
pub mod user;

pub mod contest;
pub mod contest_problem;
pub mod enrollment;
pub mod problem;
pub mod role;
pub mod role_permission;
pub mod submission;
pub mod test_case;
pub mod user;

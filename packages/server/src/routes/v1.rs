use axum::{
    Extension, Router,
    routing::{get, patch, post},
};

use crate::entity::contest::ActivityKind;
use crate::handlers;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/problems", problem_routes())
        .nest("/users", user_routes())
        // Contests and assignments share handlers; the extension tells each
        // handler which kind the route tree is scoped to.
        .nest(
            "/contests",
            activity_routes().layer(Extension(ActivityKind::Contest)),
        )
        .nest(
            "/assignments",
            activity_routes().layer(Extension(ActivityKind::Assignment)),
        )
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/me", get(handlers::auth::me))
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::users::list_users))
        .route("/{id}/role", patch(handlers::users::update_user_role))
}

fn problem_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::problem::list_problems).post(handlers::problem::create_problem),
        )
        .route(
            "/{id}",
            get(handlers::problem::get_problem)
                .patch(handlers::problem::update_problem)
                .delete(handlers::problem::delete_problem),
        )
        .route("/{id}/run", post(handlers::problem::run_problem))
        .nest("/{id}/test-cases", test_case_routes())
}

fn test_case_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::problem::list_test_cases).post(handlers::problem::create_test_case),
        )
        .route(
            "/{tc_id}",
            patch(handlers::problem::update_test_case)
                .delete(handlers::problem::delete_test_case),
        )
}

fn activity_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::contest::list_activities).post(handlers::contest::create_activity),
        )
        .route(
            "/{id}",
            get(handlers::contest::get_activity)
                .patch(handlers::contest::update_activity)
                .delete(handlers::contest::delete_activity),
        )
        .route("/{id}/publish", post(handlers::contest::publish_activity))
        .route(
            "/{id}/unpublish",
            post(handlers::contest::unpublish_activity),
        )
        .route("/{id}/join", post(handlers::contest::join_activity))
        .route("/{id}/start", post(handlers::contest::start_activity))
        .route(
            "/{id}/participants",
            get(handlers::contest::list_participants),
        )
        .route(
            "/{id}/leaderboard",
            get(handlers::leaderboard::get_leaderboard),
        )
        .route(
            "/{id}/submissions",
            get(handlers::submission::list_submissions),
        )
        .route(
            "/{id}/submissions/{submission_id}",
            get(handlers::submission::get_submission),
        )
        .nest("/{id}/problems", activity_problem_routes())
}

fn activity_problem_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::contest::list_activity_problems)
                .post(handlers::contest::add_activity_problem),
        )
        .route(
            "/{problem_id}",
            patch(handlers::contest::update_activity_problem)
                .delete(handlers::contest::remove_activity_problem),
        )
        .route(
            "/{problem_id}/submissions",
            post(handlers::submission::create_submission),
        )
}

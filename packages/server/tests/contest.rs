//! Handler-level tests for the join command, driven by a mocked database.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Extension;
use axum::body::to_bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{DatabaseBackend, MockDatabase, Value};

use common::judge::{ExecutionOutput, ExecutionRequest, JudgeClient, JudgeError};
use server::config::{
    AppConfig, AuthConfig, CorsConfig, DatabaseConfig, JudgeConfig, ServerConfig, SubmissionConfig,
};
use server::core::lifecycle::StateError;
use server::entity::contest::ActivityKind;
use server::error::AppError;
use server::extractors::auth::AuthUser;
use server::handlers::contest::join_activity;
use server::state::AppState;

/// Judge stub for handlers that never reach the judge.
struct UnusedJudge;

#[async_trait]
impl JudgeClient for UnusedJudge {
    async fn execute(&self, _request: ExecutionRequest) -> Result<ExecutionOutput, JudgeError> {
        Err(JudgeError::Upstream("not wired in these tests".into()))
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            cors: CorsConfig {
                allow_origins: vec![],
                max_age: 3600,
            },
        },
        database: DatabaseConfig {
            url: "postgres://unused".into(),
        },
        auth: AuthConfig {
            jwt_secret: "test-secret".into(),
            token_days: 7,
        },
        judge: JudgeConfig {
            url: "http://judge.invalid".into(),
            api_key: None,
            timeout_secs: 1,
        },
        submission: SubmissionConfig {
            rate_limit_per_minute: 0,
        },
    }
}

fn app_state(db: sea_orm::DatabaseConnection) -> AppState {
    AppState {
        db,
        config: Arc::new(test_config()),
        judge: Arc::new(UnusedJudge),
    }
}

fn student() -> AuthUser {
    AuthUser {
        user_id: 42,
        username: "student1".into(),
        role: "student".into(),
        permissions: vec!["submission:submit".into()],
    }
}

/// A published contest row as the database would return it.
fn contest_row(scheduled_start: DateTime<Utc>) -> BTreeMap<&'static str, Value> {
    let created = scheduled_start - Duration::days(2);
    BTreeMap::from([
        ("id", Value::from(7)),
        ("title", Value::from("Week 5 contest")),
        ("description", Value::from("Graded practice round.")),
        ("kind", Value::from("contest")),
        ("scheduled_start", Value::from(scheduled_start)),
        ("duration_minutes", Value::from(240)),
        ("published", Value::from(true)),
        ("owner_id", Value::from(1)),
        ("created_at", Value::from(created)),
        ("updated_at", Value::from(created)),
    ])
}

fn enrollment_row(registered_at: DateTime<Utc>) -> BTreeMap<&'static str, Value> {
    BTreeMap::from([
        ("contest_id", Value::from(7)),
        ("user_id", Value::from(42)),
        ("registered_at", Value::from(registered_at)),
        ("started_at", Value::ChronoDateTimeUtc(None)),
    ])
}

#[tokio::test]
async fn joining_twice_returns_the_original_enrollment_without_a_second_row() {
    let now = Utc::now();
    let registered_at = now - Duration::minutes(30);

    // The activity lookup finds a running contest; the locked enrollment
    // lookup finds the row from the first join. No insert results are queued,
    // so any attempt to write a second row would fail the test.
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([
            vec![contest_row(now - Duration::hours(1))],
            vec![enrollment_row(registered_at)],
        ])
        .into_connection();
    let state = app_state(db.clone());

    let response = join_activity(
        student(),
        State(state),
        Extension(ActivityKind::Contest),
        Path(7),
    )
    .await
    .expect("second join should succeed")
    .into_response();

    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["contest_id"], 7);
    assert_eq!(body["user_id"], 42);
    assert!(body["started_at"].is_null());
    let echoed: DateTime<Utc> = body["registered_at"]
        .as_str()
        .expect("registered_at should be a timestamp")
        .parse()
        .unwrap();
    assert_eq!(echoed, registered_at);

    let log = format!("{:?}", db.into_transaction_log());
    assert!(!log.contains("INSERT"), "re-join must not write a row: {log}");
}

#[tokio::test]
async fn joining_before_the_scheduled_start_is_a_state_conflict() {
    let now = Utc::now();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![contest_row(now + Duration::hours(1))]])
        .into_connection();
    let state = app_state(db.clone());

    let Err(err) = join_activity(
        student(),
        State(state),
        Extension(ActivityKind::Contest),
        Path(7),
    )
    .await
    else {
        panic!("join before the window opens should be rejected");
    };

    assert!(matches!(err, AppError::State(StateError::NotYetOpen)));

    let log = format!("{:?}", db.into_transaction_log());
    assert!(!log.contains("INSERT"), "rejected join must not write a row: {log}");
}

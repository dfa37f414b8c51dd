//! HTTP client for a Judge0-compatible execution service.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ExecutionOutput, ExecutionRequest, JudgeClient, JudgeError};

/// Default bound on a single judge round-trip. Observed upstream latencies for
/// compile+run sit between 10s and 60s depending on language.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for a Judge0 CE instance (or API-compatible service).
///
/// Uses the synchronous `wait=true` mode: the judge holds the connection open
/// until execution finishes, so a single bounded request covers the whole
/// round-trip. There is no cancellation of an in-flight run.
pub struct Judge0Client {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

#[derive(Serialize)]
struct Judge0Submission<'a> {
    source_code: &'a str,
    language_id: i32,
    stdin: &'a str,
}

#[derive(Deserialize)]
struct Judge0Status {
    id: i32,
    description: String,
}

#[derive(Deserialize)]
struct Judge0Response {
    stdout: Option<String>,
    stderr: Option<String>,
    compile_output: Option<String>,
    status: Judge0Status,
}

impl Judge0Client {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl JudgeClient for Judge0Client {
    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionOutput, JudgeError> {
        let url = format!(
            "{}/submissions?base64_encoded=false&wait=true",
            self.base_url
        );

        let body = Judge0Submission {
            source_code: &request.source_code,
            language_id: request.language_id,
            stdin: &request.stdin,
        };

        let mut req = self.http.post(&url).timeout(self.timeout).json(&body);
        if let Some(ref key) = self.api_key {
            req = req.header("X-Auth-Token", key);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                JudgeError::Timeout(self.timeout)
            } else {
                JudgeError::Upstream(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(JudgeError::Upstream(format!(
                "judge returned HTTP {status}: {detail}"
            )));
        }

        let parsed: Judge0Response = response
            .json()
            .await
            .map_err(|e| JudgeError::Malformed(e.to_string()))?;

        debug!(
            status_id = parsed.status.id,
            status = %parsed.status.description,
            "Judge execution finished"
        );

        Ok(ExecutionOutput {
            stdout: parsed.stdout,
            stderr: parsed.stderr,
            compile_output: parsed.compile_output,
            status_id: parsed.status.id,
            status_description: parsed.status.description,
        })
    }
}

//! Boundary to the external code-execution service.
//!
//! The server never runs user code itself; it hands source + stdin to a remote
//! judge over HTTPS and compares the captured stdout against the expected
//! output. Everything behind [`JudgeClient`] is replaceable (a different
//! backend, a mock in tests) without touching submission handling.

pub mod judge0;
pub mod languages;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub use judge0::Judge0Client;
pub use languages::{LANGUAGES, language_id};

/// One execution request: a program and the stdin to feed it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Source code text (not base64).
    pub source_code: String,
    /// Backend-specific language id, see [`languages`].
    pub language_id: i32,
    /// Data piped to the program's stdin.
    pub stdin: String,
}

/// What the judge captured while running the program.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExecutionOutput {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    /// Backend status id (informational; grading uses output comparison).
    pub status_id: i32,
    /// Backend status description, e.g. "Accepted" or "Runtime Error (NZEC)".
    pub status_description: String,
}

/// Failures talking to the judge service.
///
/// A [`JudgeError::Timeout`] is not evidence the submitted code is wrong and
/// must never be folded into a Failed verdict.
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("judge request timed out after {0:?}")]
    Timeout(Duration),

    #[error("judge service error: {0}")]
    Upstream(String),

    #[error("unsupported language: {0}")]
    UnknownLanguage(String),

    #[error("malformed judge response: {0}")]
    Malformed(String),
}

/// Client for a remote execution service.
#[async_trait]
pub trait JudgeClient: Send + Sync {
    /// Run one program against one stdin and return the captured output.
    ///
    /// Implementations must bound the request with a timeout and surface it
    /// as [`JudgeError::Timeout`].
    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionOutput, JudgeError>;
}

/// Grading rule for a single test case: captured stdout matches the expected
/// output after trimming leading/trailing whitespace on both sides.
pub fn outputs_match(stdout: Option<&str>, expected: &str) -> bool {
    stdout.unwrap_or("").trim() == expected.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outputs_match_trims_both_sides() {
        assert!(outputs_match(Some("42\n"), "42"));
        assert!(outputs_match(Some("  hello world  "), "hello world\n"));
        assert!(outputs_match(Some("a\nb"), " a\nb "));
    }

    #[test]
    fn test_outputs_match_rejects_differences() {
        assert!(!outputs_match(Some("42"), "43"));
        assert!(!outputs_match(Some("a b"), "a  b"));
        assert!(!outputs_match(None, "42"));
    }

    #[test]
    fn test_missing_stdout_matches_empty_expectation() {
        assert!(outputs_match(None, ""));
        assert!(outputs_match(None, "  \n"));
    }
}

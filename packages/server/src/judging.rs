//! Runs a piece of code through the judge client against a problem's test
//! cases and folds the per-case results into a verdict.
//!
//! Judge errors propagate untouched: a timeout must reach the handler as a
//! timeout so the submission can stay Pending instead of turning into a
//! spurious Failed.

use common::SubmissionStatus;
use common::judge::{ExecutionRequest, JudgeClient, JudgeError, outputs_match};
use tracing::debug;

use crate::entity::test_case;

/// One test case reduced to what judging needs.
#[derive(Clone, Debug)]
pub struct JudgeCase {
    pub test_case_id: i32,
    pub input: String,
    pub expected_output: String,
}

impl From<test_case::Model> for JudgeCase {
    fn from(m: test_case::Model) -> Self {
        Self {
            test_case_id: m.id,
            input: m.input,
            expected_output: m.expected_output,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CaseOutcome {
    pub test_case_id: i32,
    pub passed: bool,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

#[derive(Clone, Debug)]
pub struct JudgeOutcome {
    pub status: SubmissionStatus,
    pub cases_passed: i32,
    pub cases_total: i32,
    pub case_results: Vec<CaseOutcome>,
}

/// Execute `code` against every case in order. Cases are independent, but we
/// run them sequentially: the judge backend is the scarce resource and a
/// submission is already a single awaited unit of work.
pub async fn run_test_cases(
    judge: &dyn JudgeClient,
    language_id: i32,
    code: &str,
    cases: &[JudgeCase],
) -> Result<JudgeOutcome, JudgeError> {
    let mut case_results = Vec::with_capacity(cases.len());
    let mut cases_passed = 0i32;

    for case in cases {
        let output = judge
            .execute(ExecutionRequest {
                source_code: code.to_owned(),
                language_id,
                stdin: case.input.clone(),
            })
            .await?;

        let passed = output.compile_output.is_none()
            && outputs_match(output.stdout.as_deref(), &case.expected_output);
        if passed {
            cases_passed += 1;
        }
        debug!(
            test_case_id = case.test_case_id,
            passed, "judged one test case"
        );
        case_results.push(CaseOutcome {
            test_case_id: case.test_case_id,
            passed,
            stdout: output.stdout,
            stderr: output.stderr.or(output.compile_output),
        });
    }

    let cases_total = cases.len() as i32;
    let status = if cases_passed == cases_total {
        SubmissionStatus::Passed
    } else {
        SubmissionStatus::Failed
    };

    Ok(JudgeOutcome {
        status,
        cases_passed,
        cases_total,
        case_results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::judge::ExecutionOutput;
    use std::time::Duration;

    /// Pretends to run code: echoes the stdin back, uppercased when the
    /// "code" says so, so tests can steer pass/fail per case.
    struct EchoJudge;

    #[async_trait]
    impl JudgeClient for EchoJudge {
        async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionOutput, JudgeError> {
            let stdout = if request.source_code == "upper" {
                request.stdin.to_uppercase()
            } else {
                request.stdin.clone()
            };
            Ok(ExecutionOutput {
                stdout: Some(stdout),
                stderr: None,
                compile_output: None,
                status_id: 3,
                status_description: "Accepted".into(),
            })
        }
    }

    struct TimeoutJudge;

    #[async_trait]
    impl JudgeClient for TimeoutJudge {
        async fn execute(&self, _request: ExecutionRequest) -> Result<ExecutionOutput, JudgeError> {
            Err(JudgeError::Timeout(Duration::from_secs(30)))
        }
    }

    struct BrokenCompileJudge;

    #[async_trait]
    impl JudgeClient for BrokenCompileJudge {
        async fn execute(&self, _request: ExecutionRequest) -> Result<ExecutionOutput, JudgeError> {
            Ok(ExecutionOutput {
                stdout: None,
                stderr: None,
                compile_output: Some("error: expected `;`".into()),
                status_id: 6,
                status_description: "Compilation Error".into(),
            })
        }
    }

    fn case(id: i32, input: &str, expected: &str) -> JudgeCase {
        JudgeCase {
            test_case_id: id,
            input: input.into(),
            expected_output: expected.into(),
        }
    }

    #[tokio::test]
    async fn all_cases_passing_yields_passed() {
        let cases = vec![case(1, "a", "a"), case(2, "b", "b")];
        let outcome = run_test_cases(&EchoJudge, 71, "echo", &cases).await.unwrap();
        assert_eq!(outcome.status, SubmissionStatus::Passed);
        assert_eq!(outcome.cases_passed, 2);
        assert_eq!(outcome.cases_total, 2);
    }

    #[tokio::test]
    async fn one_wrong_case_yields_failed_with_counts() {
        // The second case expects lowercase but the program uppercases.
        let cases = vec![case(1, "A", "A"), case(2, "b", "b")];
        let outcome = run_test_cases(&EchoJudge, 71, "upper", &cases)
            .await
            .unwrap();
        assert_eq!(outcome.status, SubmissionStatus::Failed);
        assert_eq!(outcome.cases_passed, 1);
        assert!(outcome.case_results[0].passed);
        assert!(!outcome.case_results[1].passed);
    }

    #[tokio::test]
    async fn timeouts_propagate_instead_of_failing_the_submission() {
        let cases = vec![case(1, "a", "a")];
        let err = run_test_cases(&TimeoutJudge, 71, "echo", &cases)
            .await
            .unwrap_err();
        assert!(matches!(err, JudgeError::Timeout(_)));
    }

    #[tokio::test]
    async fn compile_errors_fail_every_case() {
        let cases = vec![case(1, "a", "a")];
        let outcome = run_test_cases(&BrokenCompileJudge, 54, "int main(", &cases)
            .await
            .unwrap();
        assert_eq!(outcome.status, SubmissionStatus::Failed);
        assert_eq!(outcome.cases_passed, 0);
        assert_eq!(
            outcome.case_results[0].stderr.as_deref(),
            Some("error: expected `;`")
        );
    }
}

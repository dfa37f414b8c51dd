//! Scoring and leaderboard aggregation.
//!
//! Every leaderboard endpoint funnels through [`compute_standings`]; there is
//! exactly one definition of the ordering and of what "solved" means.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use common::SubmissionStatus;

/// A problem as attached to one contest, with its point override.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScoredProblem {
    pub problem_id: i32,
    /// Contest-specific value; NULL in the link row.
    pub points: Option<i32>,
    /// The problem's own default value.
    pub default_points: i32,
}

impl ScoredProblem {
    pub fn effective_points(&self) -> i32 {
        self.points.unwrap_or(self.default_points)
    }
}

/// One judged (or still pending) submission, reduced to what scoring needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub problem_id: i32,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
}

/// One enrollment's full submission history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParticipantRecord {
    pub user_id: i32,
    pub submissions: Vec<SubmissionOutcome>,
}

/// One leaderboard row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Standing {
    pub user_id: i32,
    pub total_points: i32,
    pub problems_solved: u32,
    pub last_submission_at: Option<DateTime<Utc>>,
    pub rank: u32,
}

/// Effective status for one problem: Passed if any attempt passed, otherwise
/// the most recent attempt's status, otherwise `None` (not attempted). A later
/// failure never demotes an earlier pass.
pub fn effective_status(
    submissions: &[SubmissionOutcome],
    problem_id: i32,
) -> Option<SubmissionStatus> {
    let mut latest: Option<&SubmissionOutcome> = None;
    for sub in submissions.iter().filter(|s| s.problem_id == problem_id) {
        if sub.status == SubmissionStatus::Passed {
            return Some(SubmissionStatus::Passed);
        }
        if latest.is_none_or(|l| sub.submitted_at >= l.submitted_at) {
            latest = Some(sub);
        }
    }
    latest.map(|s| s.status)
}

/// The set of problem ids with at least one passed attempt. Set semantics:
/// resubmitting a solved problem never changes the size.
pub fn solved_problem_ids(submissions: &[SubmissionOutcome]) -> BTreeSet<i32> {
    submissions
        .iter()
        .filter(|s| s.status == SubmissionStatus::Passed)
        .map(|s| s.problem_id)
        .collect()
}

/// Build the ranked leaderboard for one contest or assignment.
///
/// Total and never panicking: an enrollment with no submissions scores 0 and
/// ranks last. Ordering is total_points desc, then problems_solved desc, then
/// last_submission_at asc with absent timestamps last, then user_id for
/// determinism. Ranks are 1-based and never shared.
pub fn compute_standings(
    problems: &[ScoredProblem],
    participants: &[ParticipantRecord],
) -> Vec<Standing> {
    let points_by_problem: BTreeMap<i32, i32> = problems
        .iter()
        .map(|p| (p.problem_id, p.effective_points()))
        .collect();

    let mut rows: Vec<Standing> = participants
        .iter()
        .map(|participant| {
            // Only problems still attached to the contest score.
            let solved: Vec<i32> = solved_problem_ids(&participant.submissions)
                .into_iter()
                .filter(|id| points_by_problem.contains_key(id))
                .collect();
            let total_points = solved.iter().map(|id| points_by_problem[id]).sum();
            let last_submission_at = participant
                .submissions
                .iter()
                .map(|s| s.submitted_at)
                .max();
            Standing {
                user_id: participant.user_id,
                total_points,
                problems_solved: solved.len() as u32,
                last_submission_at,
                rank: 0,
            }
        })
        .collect();

    rows.sort_by_key(|row| {
        let last = match row.last_submission_at {
            Some(at) => (0u8, at),
            None => (1, DateTime::<Utc>::MIN_UTC),
        };
        (
            std::cmp::Reverse(row.total_points),
            std::cmp::Reverse(row.problems_solved),
            last,
            row.user_id,
        )
    });
    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = (i + 1) as u32;
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 10, min, 0).unwrap()
    }

    fn sub(problem_id: i32, status: SubmissionStatus, min: u32) -> SubmissionOutcome {
        SubmissionOutcome {
            problem_id,
            status,
            submitted_at: at(min),
        }
    }

    fn problem(id: i32, points: Option<i32>, default_points: i32) -> ScoredProblem {
        ScoredProblem {
            problem_id: id,
            points,
            default_points,
        }
    }

    fn participant(user_id: i32, submissions: Vec<SubmissionOutcome>) -> ParticipantRecord {
        ParticipantRecord {
            user_id,
            submissions,
        }
    }

    #[test]
    fn effective_status_prefers_any_pass() {
        let subs = vec![
            sub(1, SubmissionStatus::Failed, 1),
            sub(1, SubmissionStatus::Passed, 2),
            sub(1, SubmissionStatus::Failed, 3),
        ];
        assert_eq!(effective_status(&subs, 1), Some(SubmissionStatus::Passed));
    }

    #[test]
    fn effective_status_falls_back_to_most_recent() {
        let subs = vec![
            sub(1, SubmissionStatus::Failed, 1),
            sub(1, SubmissionStatus::Pending, 5),
            sub(1, SubmissionStatus::Failed, 3),
        ];
        assert_eq!(effective_status(&subs, 1), Some(SubmissionStatus::Pending));
        assert_eq!(effective_status(&subs, 2), None);
    }

    #[test]
    fn solved_set_never_shrinks_as_attempts_arrive() {
        let mut subs = vec![sub(1, SubmissionStatus::Passed, 1)];
        let before = solved_problem_ids(&subs);
        subs.push(sub(1, SubmissionStatus::Failed, 2));
        subs.push(sub(2, SubmissionStatus::Failed, 3));
        let after = solved_problem_ids(&subs);
        assert!(before.is_subset(&after));
        assert_eq!(after.len(), 1);
    }

    #[test]
    fn resubmitting_a_solved_problem_does_not_double_count() {
        let problems = [problem(1, None, 100)];
        let rows = compute_standings(
            &problems,
            &[participant(
                7,
                vec![
                    sub(1, SubmissionStatus::Passed, 1),
                    sub(1, SubmissionStatus::Passed, 2),
                ],
            )],
        );
        assert_eq!(rows[0].total_points, 100);
        assert_eq!(rows[0].problems_solved, 1);
    }

    #[test]
    fn contest_override_beats_the_problem_default() {
        let problems = [problem(1, Some(30), 100), problem(2, None, 50)];
        let rows = compute_standings(
            &problems,
            &[participant(
                7,
                vec![
                    sub(1, SubmissionStatus::Passed, 1),
                    sub(2, SubmissionStatus::Passed, 2),
                ],
            )],
        );
        assert_eq!(rows[0].total_points, 80);
    }

    #[test]
    fn passes_on_detached_problems_do_not_score() {
        let problems = [problem(1, None, 100)];
        let rows = compute_standings(
            &problems,
            &[participant(7, vec![sub(99, SubmissionStatus::Passed, 1)])],
        );
        assert_eq!(rows[0].total_points, 0);
        assert_eq!(rows[0].problems_solved, 0);
        assert_eq!(rows[0].last_submission_at, Some(at(1)));
    }

    #[test]
    fn zero_submission_enrollment_scores_zero_and_ranks_last() {
        let problems = [problem(1, None, 100)];
        let rows = compute_standings(
            &problems,
            &[
                participant(1, vec![]),
                participant(2, vec![sub(1, SubmissionStatus::Passed, 5)]),
            ],
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].user_id, 2);
        assert_eq!(rows[1].user_id, 1);
        assert_eq!(rows[1].total_points, 0);
        assert_eq!(rows[1].last_submission_at, None);
        assert_eq!(rows[1].rank, 2);
    }

    #[test]
    fn failed_attempts_on_the_big_problem_score_only_the_solved_one() {
        // Two problems worth 100 and 50; only the 50 is solved.
        let problems = [problem(1, None, 100), problem(2, None, 50)];
        let rows = compute_standings(
            &problems,
            &[participant(
                7,
                vec![
                    sub(1, SubmissionStatus::Failed, 1),
                    sub(1, SubmissionStatus::Failed, 2),
                    sub(2, SubmissionStatus::Passed, 3),
                ],
            )],
        );
        assert_eq!(rows[0].total_points, 50);
        assert_eq!(rows[0].problems_solved, 1);
    }

    #[test]
    fn earlier_finisher_wins_the_tie() {
        let problems = [problem(1, None, 100)];
        let rows = compute_standings(
            &problems,
            &[
                participant(1, vec![sub(1, SubmissionStatus::Passed, 30)]),
                participant(2, vec![sub(1, SubmissionStatus::Passed, 10)]),
            ],
        );
        assert_eq!(rows[0].user_id, 2);
        assert_eq!(rows[1].user_id, 1);
    }

    #[test]
    fn more_problems_solved_breaks_an_equal_points_tie() {
        let problems = [problem(1, None, 50), problem(2, None, 50), problem(3, None, 100)];
        let rows = compute_standings(
            &problems,
            &[
                participant(1, vec![sub(3, SubmissionStatus::Passed, 1)]),
                participant(
                    2,
                    vec![
                        sub(1, SubmissionStatus::Passed, 2),
                        sub(2, SubmissionStatus::Passed, 3),
                    ],
                ),
            ],
        );
        assert_eq!(rows[0].user_id, 2);
        assert_eq!(rows[0].problems_solved, 2);
    }

    #[test]
    fn ranks_are_dense_and_never_shared() {
        let problems = [problem(1, None, 100)];
        let rows = compute_standings(
            &problems,
            &[
                participant(1, vec![]),
                participant(2, vec![]),
                participant(3, vec![sub(1, SubmissionStatus::Passed, 1)]),
            ],
        );
        let ranks: Vec<u32> = rows.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn last_submission_counts_failures_too() {
        let problems = [problem(1, None, 100)];
        let rows = compute_standings(
            &problems,
            &[participant(
                1,
                vec![
                    sub(1, SubmissionStatus::Passed, 5),
                    sub(1, SubmissionStatus::Failed, 20),
                ],
            )],
        );
        assert_eq!(rows[0].last_submission_at, Some(at(20)));
    }
}

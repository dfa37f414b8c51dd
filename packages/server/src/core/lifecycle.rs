//! The contest/assignment state machine.
//!
//! Phases are never stored: they are recomputed from the schedule and the
//! wall-clock on every read. There is no timer task.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::entity::contest::ActivityKind;

/// The timing facts of one activity, decoupled from the database row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Schedule {
    pub kind: ActivityKind,
    pub published: bool,
    pub scheduled_start: DateTime<Utc>,
    pub duration: Duration,
}

impl Schedule {
    pub fn scheduled_end(&self) -> DateTime<Utc> {
        self.scheduled_start + self.duration
    }
}

/// A student's participation facts, decoupled from the enrollment row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Participation {
    pub started_at: Option<DateTime<Utc>>,
}

/// The global phase of an activity at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Draft,
    Upcoming,
    Active,
    Completed,
}

/// A lifecycle precondition the caller violated. Client-correctable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("the activity has not opened yet")]
    NotYetOpen,
    #[error("the activity has already ended")]
    AlreadyEnded,
    #[error("you are not enrolled in this activity")]
    NotEnrolled,
    #[error("you have already started this activity")]
    AlreadyStarted,
    #[error("your submission window has closed")]
    SubmissionWindowClosed,
}

impl StateError {
    /// Stable discriminant carried in the HTTP error body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotYetOpen => "NOT_YET_OPEN",
            Self::AlreadyEnded => "ALREADY_ENDED",
            Self::NotEnrolled => "NOT_ENROLLED",
            Self::AlreadyStarted => "ALREADY_STARTED",
            Self::SubmissionWindowClosed => "SUBMISSION_WINDOW_CLOSED",
        }
    }
}

pub fn phase_at(schedule: &Schedule, now: DateTime<Utc>) -> Phase {
    if !schedule.published {
        return Phase::Draft;
    }
    if now < schedule.scheduled_start {
        Phase::Upcoming
    } else if now < schedule.scheduled_end() {
        Phase::Active
    } else {
        Phase::Completed
    }
}

/// Enrollment creation is legal only while the activity is globally Active.
/// Duplicate joins are handled by the caller as an idempotent success, not
/// here.
pub fn check_join(schedule: &Schedule, now: DateTime<Utc>) -> Result<(), StateError> {
    match phase_at(schedule, now) {
        Phase::Active => Ok(()),
        Phase::Draft | Phase::Upcoming => Err(StateError::NotYetOpen),
        Phase::Completed => Err(StateError::AlreadyEnded),
    }
}

/// What the "start" command resolved to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// Repeated start is a no-op that reports the original instant.
    AlreadyStarted(DateTime<Utc>),
}

/// A student may start their personal clock once, while the activity is
/// globally Active. Assignments have no personal clock.
pub fn check_start(
    schedule: &Schedule,
    participation: Option<&Participation>,
    now: DateTime<Utc>,
) -> Result<StartOutcome, StateError> {
    match phase_at(schedule, now) {
        Phase::Active => {}
        Phase::Draft | Phase::Upcoming => return Err(StateError::NotYetOpen),
        Phase::Completed => return Err(StateError::AlreadyEnded),
    }
    let participation = participation.ok_or(StateError::NotEnrolled)?;
    match participation.started_at {
        Some(at) => Ok(StartOutcome::AlreadyStarted(at)),
        None => Ok(StartOutcome::Started),
    }
}

/// The instant after which the student can no longer submit, if it is known
/// yet. A contest participant who has not pressed start has no deadline.
pub fn submission_deadline(
    schedule: &Schedule,
    participation: &Participation,
) -> Option<DateTime<Utc>> {
    match schedule.kind {
        ActivityKind::Assignment => Some(schedule.scheduled_end()),
        ActivityKind::Contest => participation.started_at.map(|at| at + schedule.duration),
    }
}

/// The full submission precondition: globally open, enrolled, and inside the
/// student's own window.
pub fn check_submit(
    schedule: &Schedule,
    participation: Option<&Participation>,
    now: DateTime<Utc>,
) -> Result<(), StateError> {
    // A late starter's personal window may outlive the shared one, so the
    // global Completed phase alone is not a rejection here.
    match phase_at(schedule, now) {
        Phase::Draft | Phase::Upcoming => return Err(StateError::NotYetOpen),
        Phase::Active | Phase::Completed => {}
    }
    let participation = participation.ok_or(StateError::NotEnrolled)?;
    match submission_deadline(schedule, participation) {
        // Contest participant who never started: their window never opened.
        None => Err(StateError::NotYetOpen),
        Some(deadline) if now >= deadline => Err(StateError::SubmissionWindowClosed),
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, hour, min, 0).unwrap()
    }

    fn contest() -> Schedule {
        Schedule {
            kind: ActivityKind::Contest,
            published: true,
            scheduled_start: at(10, 0),
            duration: Duration::minutes(90),
        }
    }

    fn assignment() -> Schedule {
        Schedule {
            kind: ActivityKind::Assignment,
            ..contest()
        }
    }

    #[test]
    fn phase_follows_the_clock() {
        let s = contest();
        assert_eq!(phase_at(&s, at(9, 59)), Phase::Upcoming);
        assert_eq!(phase_at(&s, at(10, 0)), Phase::Active);
        assert_eq!(phase_at(&s, at(11, 29)), Phase::Active);
        assert_eq!(phase_at(&s, at(11, 30)), Phase::Completed);
    }

    #[test]
    fn unpublished_is_draft_regardless_of_time() {
        let s = Schedule {
            published: false,
            ..contest()
        };
        assert_eq!(phase_at(&s, at(9, 0)), Phase::Draft);
        assert_eq!(phase_at(&s, at(10, 30)), Phase::Draft);
        assert_eq!(phase_at(&s, at(12, 0)), Phase::Draft);
    }

    #[test]
    fn join_before_start_is_not_yet_open() {
        assert_eq!(check_join(&contest(), at(9, 0)), Err(StateError::NotYetOpen));
    }

    #[test]
    fn join_after_end_is_already_ended() {
        assert_eq!(
            check_join(&contest(), at(12, 0)),
            Err(StateError::AlreadyEnded)
        );
    }

    #[test]
    fn join_while_active_is_allowed() {
        assert_eq!(check_join(&contest(), at(10, 30)), Ok(()));
    }

    #[test]
    fn start_requires_enrollment() {
        assert_eq!(
            check_start(&contest(), None, at(10, 30)),
            Err(StateError::NotEnrolled)
        );
    }

    #[test]
    fn repeated_start_reports_the_original_instant() {
        let p = Participation {
            started_at: Some(at(10, 5)),
        };
        assert_eq!(
            check_start(&contest(), Some(&p), at(10, 30)),
            Ok(StartOutcome::AlreadyStarted(at(10, 5)))
        );
    }

    #[test]
    fn start_outside_the_window_is_rejected() {
        let p = Participation::default();
        assert_eq!(
            check_start(&contest(), Some(&p), at(9, 0)),
            Err(StateError::NotYetOpen)
        );
        assert_eq!(
            check_start(&contest(), Some(&p), at(12, 0)),
            Err(StateError::AlreadyEnded)
        );
    }

    #[test]
    fn submit_without_enrollment_is_not_enrolled() {
        assert_eq!(
            check_submit(&contest(), None, at(10, 30)),
            Err(StateError::NotEnrolled)
        );
    }

    #[test]
    fn submit_before_pressing_start_is_not_yet_open() {
        let p = Participation::default();
        assert_eq!(
            check_submit(&contest(), Some(&p), at(10, 30)),
            Err(StateError::NotYetOpen)
        );
    }

    #[test]
    fn personal_window_elapsing_closes_submissions() {
        // Started at 10:05 with a 90 minute clock: closes at 11:35.
        let p = Participation {
            started_at: Some(at(10, 5)),
        };
        assert_eq!(check_submit(&contest(), Some(&p), at(11, 34)), Ok(()));
        assert_eq!(
            check_submit(&contest(), Some(&p), at(11, 35)),
            Err(StateError::SubmissionWindowClosed)
        );
    }

    #[test]
    fn late_starter_keeps_the_full_personal_window() {
        // Global window ends 11:30 but this student started at 11:00.
        let p = Participation {
            started_at: Some(at(11, 0)),
        };
        assert_eq!(check_submit(&contest(), Some(&p), at(12, 15)), Ok(()));
        assert_eq!(
            check_submit(&contest(), Some(&p), at(12, 30)),
            Err(StateError::SubmissionWindowClosed)
        );
    }

    #[test]
    fn assignments_share_one_window() {
        let p = Participation::default();
        assert_eq!(check_submit(&assignment(), Some(&p), at(10, 0)), Ok(()));
        assert_eq!(
            check_submit(&assignment(), Some(&p), at(11, 30)),
            Err(StateError::SubmissionWindowClosed)
        );
    }

    #[test]
    fn assignment_deadline_is_the_shared_end() {
        let p = Participation::default();
        assert_eq!(
            submission_deadline(&assignment(), &p),
            Some(at(11, 30))
        );
    }
}

//! Decides whether a teacher should be marked present for a day once their
//! daily reports cover every scheduled period.
//!
//! The decision itself ([`should_mark_present`], [`decide`]) is pure; all
//! reads and the single conditional write go through [`ReconcileStore`].

use crate::model::attendance::AttendanceStatus;
use crate::model::daily_report::DailyReport;
use crate::model::schedule::{ScheduledPeriod, day_of_week};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Display;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileStatus {
    /// Attendance is (now) `Present`.
    Marked,
    /// Not every scheduled period has a report yet.
    Pending,
    /// Left untouched: an approved leave, or the store failed.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PeriodCounts {
    pub total_periods: usize,
    pub covered_periods: usize,
    pub reports_submitted: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    MarkPresent,
    AwaitPeriods,
    KeepLeave,
}

impl Decision {
    pub fn status(self) -> ReconcileStatus {
        match self {
            Decision::MarkPresent => ReconcileStatus::Marked,
            Decision::AwaitPeriods => ReconcileStatus::Pending,
            Decision::KeepLeave => ReconcileStatus::Skipped,
        }
    }
}

/// Returned verbatim in the report-submission response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOutcome {
    pub status: ReconcileStatus,
    pub reports_submitted: usize,
    pub total_periods: usize,
    pub covered_periods: usize,
}

impl ReconcileOutcome {
    fn new(status: ReconcileStatus, counts: PeriodCounts) -> Self {
        Self {
            status,
            reports_submitted: counts.reports_submitted,
            total_periods: counts.total_periods,
            covered_periods: counts.covered_periods,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReconcileInput {
    pub teacher_id: u64,
    pub school_id: u64,
    pub date: NaiveDate,
}

fn same_grade(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Period ids covered by at least one report. A report matches periods of
/// the same grade; when none match by grade it falls back to its class id.
pub fn covered_periods(periods: &[ScheduledPeriod], reports: &[DailyReport]) -> HashSet<u64> {
    let mut covered = HashSet::new();

    for report in reports {
        let by_grade: Vec<u64> = periods
            .iter()
            .filter(|p| same_grade(&p.grade, &report.grade))
            .map(|p| p.id)
            .collect();

        if !by_grade.is_empty() {
            covered.extend(by_grade);
            continue;
        }

        if let Some(class_id) = report.class_id {
            covered.extend(
                periods
                    .iter()
                    .filter(|p| p.class_id == Some(class_id))
                    .map(|p| p.id),
            );
        }
    }

    covered
}

pub fn count_periods(periods: &[ScheduledPeriod], reports: &[DailyReport]) -> PeriodCounts {
    let total: HashSet<u64> = periods.iter().map(|p| p.id).collect();
    PeriodCounts {
        total_periods: total.len(),
        covered_periods: covered_periods(periods, reports).len(),
        reports_submitted: reports.len(),
    }
}

/// With a schedule on record, every period must be covered, or at least as
/// many reports submitted as there are periods (tolerates grade naming
/// drift between schedules and reports). Without one, any report counts.
pub fn should_mark_present(counts: &PeriodCounts) -> bool {
    if counts.total_periods > 0 {
        counts.covered_periods >= counts.total_periods
            || counts.reports_submitted >= counts.total_periods
    } else {
        counts.reports_submitted > 0
    }
}

pub fn decide(
    counts: &PeriodCounts,
    existing: Option<AttendanceStatus>,
    on_approved_leave: bool,
) -> Decision {
    if !should_mark_present(counts) {
        return Decision::AwaitPeriods;
    }
    if on_approved_leave || existing == Some(AttendanceStatus::LeaveApproved) {
        return Decision::KeepLeave;
    }
    Decision::MarkPresent
}

/// Reads and the one write the routine needs from the store.
#[allow(async_fn_in_trait)]
pub trait ReconcileStore {
    type Error: Display;

    async fn active_periods(
        &self,
        teacher_id: u64,
        school_id: u64,
        day_of_week: &str,
    ) -> Result<Vec<ScheduledPeriod>, Self::Error>;

    async fn reports_for_day(
        &self,
        teacher_id: u64,
        school_id: u64,
        date: NaiveDate,
    ) -> Result<Vec<DailyReport>, Self::Error>;

    async fn attendance_status(
        &self,
        teacher_id: u64,
        school_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceStatus>, Self::Error>;

    async fn has_approved_leave(
        &self,
        teacher_id: u64,
        school_id: u64,
        date: NaiveDate,
    ) -> Result<bool, Self::Error>;

    /// Must never replace an existing `Leave-Approved` status.
    async fn upsert_present(
        &self,
        teacher_id: u64,
        school_id: u64,
        date: NaiveDate,
    ) -> Result<(), Self::Error>;
}

/// Never fails: store errors are logged and reported as `skipped` so the
/// caller's report submission still succeeds.
pub async fn reconcile<S: ReconcileStore>(store: &S, input: ReconcileInput) -> ReconcileOutcome {
    let mut counts = PeriodCounts::default();

    match run(store, input, &mut counts).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(
                error = %e,
                teacher_id = input.teacher_id,
                school_id = input.school_id,
                date = %input.date,
                "Attendance reconciliation failed; skipping"
            );
            ReconcileOutcome::new(ReconcileStatus::Skipped, counts)
        }
    }
}

async fn run<S: ReconcileStore>(
    store: &S,
    input: ReconcileInput,
    counts: &mut PeriodCounts,
) -> Result<ReconcileOutcome, S::Error> {
    let ReconcileInput {
        teacher_id,
        school_id,
        date,
    } = input;
    let day = day_of_week(date);

    let periods = store.active_periods(teacher_id, school_id, day).await?;
    let reports = store.reports_for_day(teacher_id, school_id, date).await?;
    *counts = count_periods(&periods, &reports);

    debug!(
        teacher_id,
        day,
        total = counts.total_periods,
        covered = counts.covered_periods,
        submitted = counts.reports_submitted,
        "Counted periods"
    );

    if !should_mark_present(counts) {
        return Ok(ReconcileOutcome::new(ReconcileStatus::Pending, *counts));
    }

    let existing = store.attendance_status(teacher_id, school_id, date).await?;
    let on_leave = store.has_approved_leave(teacher_id, school_id, date).await?;

    let decision = decide(counts, existing, on_leave);
    if decision == Decision::MarkPresent {
        store.upsert_present(teacher_id, school_id, date).await?;
        info!(teacher_id, school_id, %date, "Attendance marked present");
    }

    Ok(ReconcileOutcome::new(decision.status(), *counts))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveTime;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    pub(crate) fn period(id: u64, grade: &str, class_id: Option<u64>, day: &str) -> ScheduledPeriod {
        ScheduledPeriod {
            id,
            school_id: 1,
            teacher_id: 7,
            class_id,
            day_of_week: day.to_string(),
            grade: grade.to_string(),
            subject: "Mathematics".to_string(),
            start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(8, 45, 0).unwrap(),
            is_active: true,
        }
    }

    pub(crate) fn report(id: u64, grade: &str, class_id: Option<u64>, date: NaiveDate) -> DailyReport {
        DailyReport {
            id,
            teacher_id: 7,
            school_id: 1,
            report_date: date,
            grade: grade.to_string(),
            class_id,
            subject: "Mathematics".to_string(),
            topics_covered: "Fractions".to_string(),
            homework: None,
            notes: None,
            created_at: None,
        }
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 12).unwrap()
    }

    #[derive(Default)]
    struct MemoryStore {
        periods: Vec<ScheduledPeriod>,
        reports: RefCell<Vec<DailyReport>>,
        attendance: RefCell<HashMap<(u64, u64, NaiveDate), AttendanceStatus>>,
        approved_leave: Vec<(NaiveDate, NaiveDate)>,
        fail_reports: bool,
        writes: Cell<usize>,
    }

    impl MemoryStore {
        fn status(&self) -> Option<AttendanceStatus> {
            self.attendance.borrow().get(&(7, 1, monday())).copied()
        }
    }

    impl ReconcileStore for MemoryStore {
        type Error = String;

        async fn active_periods(
            &self,
            teacher_id: u64,
            school_id: u64,
            day_of_week: &str,
        ) -> Result<Vec<ScheduledPeriod>, String> {
            Ok(self
                .periods
                .iter()
                .filter(|p| {
                    p.teacher_id == teacher_id
                        && p.school_id == school_id
                        && p.day_of_week == day_of_week
                        && p.is_active
                })
                .cloned()
                .collect())
        }

        async fn reports_for_day(
            &self,
            teacher_id: u64,
            school_id: u64,
            date: NaiveDate,
        ) -> Result<Vec<DailyReport>, String> {
            if self.fail_reports {
                return Err("table daily_reports does not exist".into());
            }
            Ok(self
                .reports
                .borrow()
                .iter()
                .filter(|r| r.teacher_id == teacher_id && r.school_id == school_id && r.report_date == date)
                .cloned()
                .collect())
        }

        async fn attendance_status(
            &self,
            teacher_id: u64,
            school_id: u64,
            date: NaiveDate,
        ) -> Result<Option<AttendanceStatus>, String> {
            Ok(self.attendance.borrow().get(&(teacher_id, school_id, date)).copied())
        }

        async fn has_approved_leave(
            &self,
            _teacher_id: u64,
            _school_id: u64,
            date: NaiveDate,
        ) -> Result<bool, String> {
            Ok(self
                .approved_leave
                .iter()
                .any(|(start, end)| *start <= date && date <= *end))
        }

        async fn upsert_present(
            &self,
            teacher_id: u64,
            school_id: u64,
            date: NaiveDate,
        ) -> Result<(), String> {
            self.writes.set(self.writes.get() + 1);
            let mut rows = self.attendance.borrow_mut();
            let entry = rows
                .entry((teacher_id, school_id, date))
                .or_insert(AttendanceStatus::Present);
            if *entry != AttendanceStatus::LeaveApproved {
                *entry = AttendanceStatus::Present;
            }
            Ok(())
        }
    }

    fn input() -> ReconcileInput {
        ReconcileInput {
            teacher_id: 7,
            school_id: 1,
            date: monday(),
        }
    }

    fn counts(total: usize, covered: usize, submitted: usize) -> PeriodCounts {
        PeriodCounts {
            total_periods: total,
            covered_periods: covered,
            reports_submitted: submitted,
        }
    }

    #[test]
    fn no_schedule_and_no_reports_waits() {
        assert_eq!(decide(&counts(0, 0, 0), None, false), Decision::AwaitPeriods);
        assert_eq!(
            decide(&counts(0, 0, 0), Some(AttendanceStatus::LeaveApproved), false),
            Decision::AwaitPeriods
        );
    }

    #[test]
    fn no_schedule_with_a_report_marks() {
        assert_eq!(decide(&counts(0, 0, 1), None, false), Decision::MarkPresent);
        assert_eq!(
            decide(&counts(0, 0, 1), Some(AttendanceStatus::LeaveApproved), false),
            Decision::KeepLeave
        );
    }

    #[test]
    fn scheduled_day_marks_only_when_covered_or_enough_reports() {
        for total in 1..5 {
            for covered in 0..=total {
                for submitted in 0..=total + 1 {
                    let c = counts(total, covered, submitted);
                    let expect_mark = covered >= total || submitted >= total;
                    let expected = if expect_mark {
                        Decision::MarkPresent
                    } else {
                        Decision::AwaitPeriods
                    };
                    assert_eq!(decide(&c, None, false), expected, "{c:?}");
                }
            }
        }
    }

    #[test]
    fn report_count_alone_satisfies_schedule() {
        // reports whose grades match no period still count toward the total
        let c = counts(2, 0, 2);
        assert!(should_mark_present(&c));
        assert!(!should_mark_present(&counts(2, 0, 1)));
    }

    #[test]
    fn leave_is_never_downgraded() {
        let ready = counts(2, 2, 2);
        assert_eq!(
            decide(&ready, Some(AttendanceStatus::LeaveApproved), false),
            Decision::KeepLeave
        );
        assert_eq!(decide(&ready, None, true), Decision::KeepLeave);
        assert_eq!(
            decide(&ready, Some(AttendanceStatus::Absent), false),
            Decision::MarkPresent
        );
    }

    #[test]
    fn grade_match_wins_over_class_fallback() {
        let periods = vec![
            period(1, "Grade 5", Some(10), "Monday"),
            period(2, "Grade 6", Some(11), "Monday"),
        ];
        // grade matches period 1; class 11 is ignored because grade matched
        let reports = vec![report(1, " grade 5 ", Some(11), monday())];
        assert_eq!(covered_periods(&periods, &reports), HashSet::from([1]));
    }

    #[test]
    fn class_fallback_applies_when_grade_misses() {
        let periods = vec![
            period(1, "Grade 5", Some(10), "Monday"),
            period(2, "Grade 6", Some(11), "Monday"),
        ];
        let reports = vec![report(1, "5th", Some(10), monday())];
        assert_eq!(covered_periods(&periods, &reports), HashSet::from([1]));

        let unmatched = vec![report(2, "5th", None, monday())];
        assert!(covered_periods(&periods, &unmatched).is_empty());
    }

    #[test]
    fn duplicate_period_ids_count_once() {
        let periods = vec![
            period(1, "Grade 5", None, "Monday"),
            period(1, "Grade 5", None, "Monday"),
        ];
        let c = count_periods(&periods, &[]);
        assert_eq!(c.total_periods, 1);
    }

    fn three_period_store() -> MemoryStore {
        MemoryStore {
            periods: vec![
                period(1, "A", None, "Monday"),
                period(2, "B", None, "Monday"),
                period(3, "C", None, "Monday"),
                period(4, "D", None, "Tuesday"),
            ],
            ..Default::default()
        }
    }

    #[actix_web::test]
    async fn three_periods_pending_then_marked() {
        let store = three_period_store();
        store.reports.borrow_mut().push(report(1, "A", None, monday()));
        store.reports.borrow_mut().push(report(2, "B", None, monday()));

        let outcome = reconcile(&store, input()).await;
        assert_eq!(outcome.status, ReconcileStatus::Pending);
        assert_eq!(outcome.covered_periods, 2);
        assert_eq!(outcome.total_periods, 3);
        assert_eq!(outcome.reports_submitted, 2);
        assert_eq!(store.status(), None);

        store.reports.borrow_mut().push(report(3, "C", None, monday()));
        let outcome = reconcile(&store, input()).await;
        assert_eq!(outcome.status, ReconcileStatus::Marked);
        assert_eq!(outcome.covered_periods, 3);
        assert_eq!(store.status(), Some(AttendanceStatus::Present));
    }

    #[actix_web::test]
    async fn unscheduled_teacher_marked_by_single_report() {
        let store = MemoryStore::default();
        store.reports.borrow_mut().push(report(1, "A", None, monday()));

        let outcome = reconcile(&store, input()).await;
        assert_eq!(outcome.status, ReconcileStatus::Marked);
        assert_eq!(outcome.total_periods, 0);
        assert_eq!(outcome.reports_submitted, 1);
    }

    #[actix_web::test]
    async fn nothing_submitted_writes_nothing() {
        let store = MemoryStore::default();
        let outcome = reconcile(&store, input()).await;
        assert_eq!(outcome.status, ReconcileStatus::Pending);
        assert_eq!(store.writes.get(), 0);
    }

    #[actix_web::test]
    async fn existing_leave_record_is_skipped_and_unchanged() {
        let store = MemoryStore::default();
        store
            .attendance
            .borrow_mut()
            .insert((7, 1, monday()), AttendanceStatus::LeaveApproved);
        store.reports.borrow_mut().push(report(1, "A", None, monday()));

        let outcome = reconcile(&store, input()).await;
        assert_eq!(outcome.status, ReconcileStatus::Skipped);
        assert_eq!(store.status(), Some(AttendanceStatus::LeaveApproved));
        assert_eq!(store.writes.get(), 0);
    }

    #[actix_web::test]
    async fn approved_leave_request_suppresses_marking() {
        let store = MemoryStore {
            approved_leave: vec![(monday(), monday())],
            ..Default::default()
        };
        store.reports.borrow_mut().push(report(1, "A", None, monday()));

        let outcome = reconcile(&store, input()).await;
        assert_eq!(outcome.status, ReconcileStatus::Skipped);
        assert_eq!(store.status(), None);
    }

    #[actix_web::test]
    async fn repeated_runs_are_idempotent() {
        let store = MemoryStore::default();
        store.reports.borrow_mut().push(report(1, "A", None, monday()));

        let first = reconcile(&store, input()).await;
        let second = reconcile(&store, input()).await;
        assert_eq!(first, second);
        assert_eq!(store.status(), Some(AttendanceStatus::Present));
        assert_eq!(store.attendance.borrow().len(), 1);
    }

    #[actix_web::test]
    async fn store_failure_is_swallowed_as_skipped() {
        let store = MemoryStore {
            fail_reports: true,
            ..three_period_store()
        };
        let outcome = reconcile(&store, input()).await;
        assert_eq!(outcome.status, ReconcileStatus::Skipped);
        assert_eq!(outcome.reports_submitted, 0);
        assert_eq!(store.writes.get(), 0);
    }

    #[test]
    fn outcome_serializes_camel_case() {
        let outcome = ReconcileOutcome::new(ReconcileStatus::Pending, counts(3, 2, 2));
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "pending");
        assert_eq!(value["reportsSubmitted"], 2);
        assert_eq!(value["totalPeriods"], 3);
        assert_eq!(value["coveredPeriods"], 2);
    }
}

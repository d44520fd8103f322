//! Approving or rejecting a pending leave request.
//!
//! An approval changes the request's status and writes `Leave-Approved` for
//! every day it covers. Both happen in one [`LeaveDecisionTx`], so a failure
//! part way leaves the request pending and the admin can simply retry.

use crate::model::attendance::AttendanceStatus;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use chrono::NaiveDate;
use sqlx::{MySql, MySqlPool, Transaction};
use std::fmt::Display;

/// A unit of work over leave data. Nothing is visible to others until
/// `commit`; dropping it uncommitted discards every write.
#[allow(async_fn_in_trait)]
pub trait LeaveDecisionTx {
    type Error: Display;

    /// Moves a pending request to `status`. `false` when it was no longer pending.
    async fn set_status(
        &mut self,
        leave_id: u64,
        status: LeaveStatus,
        decided_by: u64,
    ) -> Result<bool, Self::Error>;

    async fn mark_leave_day(
        &mut self,
        teacher_id: u64,
        school_id: u64,
        date: NaiveDate,
    ) -> Result<(), Self::Error>;

    async fn commit(self) -> Result<(), Self::Error>;
}

#[derive(Debug, PartialEq)]
pub enum DecisionError<E> {
    AlreadyProcessed,
    Store(E),
}

pub fn leave_days(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

/// Returns the number of days marked as leave.
pub async fn approve<T: LeaveDecisionTx>(
    mut tx: T,
    leave: &LeaveRequest,
    decided_by: u64,
) -> Result<u64, DecisionError<T::Error>> {
    let moved = tx
        .set_status(leave.id, LeaveStatus::Approved, decided_by)
        .await
        .map_err(DecisionError::Store)?;
    if !moved {
        return Err(DecisionError::AlreadyProcessed);
    }

    let mut marked = 0;
    for date in leave_days(leave.start_date, leave.end_date) {
        tx.mark_leave_day(leave.teacher_id, leave.school_id, date)
            .await
            .map_err(DecisionError::Store)?;
        marked += 1;
    }

    tx.commit().await.map_err(DecisionError::Store)?;
    Ok(marked)
}

pub async fn reject<T: LeaveDecisionTx>(
    mut tx: T,
    leave_id: u64,
    decided_by: u64,
) -> Result<(), DecisionError<T::Error>> {
    let moved = tx
        .set_status(leave_id, LeaveStatus::Rejected, decided_by)
        .await
        .map_err(DecisionError::Store)?;
    if !moved {
        return Err(DecisionError::AlreadyProcessed);
    }
    tx.commit().await.map_err(DecisionError::Store)
}

pub struct MySqlLeaveTx {
    tx: Transaction<'static, MySql>,
}

impl MySqlLeaveTx {
    pub async fn begin(pool: &MySqlPool) -> Result<Self, sqlx::Error> {
        Ok(Self {
            tx: pool.begin().await?,
        })
    }
}

impl LeaveDecisionTx for MySqlLeaveTx {
    type Error = sqlx::Error;

    async fn set_status(
        &mut self,
        leave_id: u64,
        status: LeaveStatus,
        decided_by: u64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?, decided_by = ?, decided_at = NOW()
            WHERE id = ?
            AND status = 'pending'
            "#,
        )
        .bind(status.as_ref())
        .bind(decided_by)
        .bind(leave_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // Replaces whatever status the day had.
    async fn mark_leave_day(
        &mut self,
        teacher_id: u64,
        school_id: u64,
        date: NaiveDate,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO attendance_records (teacher_id, school_id, date, status)
            VALUES (?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE status = VALUES(status), updated_at = NOW()
            "#,
        )
        .bind(teacher_id)
        .bind(school_id)
        .bind(date)
        .bind(AttendanceStatus::LeaveApproved.as_ref())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn commit(self) -> Result<(), sqlx::Error> {
        self.tx.commit().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Committed state shared by every transaction a test opens.
    struct Ledger {
        status: RefCell<LeaveStatus>,
        days: RefCell<Vec<NaiveDate>>,
    }

    impl Ledger {
        fn pending() -> Self {
            Self {
                status: RefCell::new(LeaveStatus::Pending),
                days: RefCell::new(Vec::new()),
            }
        }

        fn begin(&self, fail_on: Option<NaiveDate>) -> MemoryTx<'_> {
            MemoryTx {
                ledger: self,
                fail_on,
                status: None,
                days: Vec::new(),
            }
        }
    }

    struct MemoryTx<'a> {
        ledger: &'a Ledger,
        fail_on: Option<NaiveDate>,
        status: Option<LeaveStatus>,
        days: Vec<NaiveDate>,
    }

    impl LeaveDecisionTx for MemoryTx<'_> {
        type Error = String;

        async fn set_status(
            &mut self,
            _leave_id: u64,
            status: LeaveStatus,
            _decided_by: u64,
        ) -> Result<bool, String> {
            if *self.ledger.status.borrow() != LeaveStatus::Pending {
                return Ok(false);
            }
            self.status = Some(status);
            Ok(true)
        }

        async fn mark_leave_day(
            &mut self,
            _teacher_id: u64,
            _school_id: u64,
            date: NaiveDate,
        ) -> Result<(), String> {
            if self.fail_on == Some(date) {
                return Err(format!("write failed for {date}"));
            }
            self.days.push(date);
            Ok(())
        }

        async fn commit(self) -> Result<(), String> {
            if let Some(status) = self.status {
                *self.ledger.status.borrow_mut() = status;
            }
            self.ledger.days.borrow_mut().extend(self.days);
            Ok(())
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
    }

    fn leave(start: u32, end: u32) -> LeaveRequest {
        LeaveRequest {
            id: 11,
            teacher_id: 7,
            school_id: 1,
            start_date: d(start),
            end_date: d(end),
            leave_type: "sick".into(),
            reason: None,
            status: LeaveStatus::Pending,
            created_at: None,
        }
    }

    #[actix_web::test]
    async fn approval_marks_every_day_in_range() {
        let ledger = Ledger::pending();
        let marked = approve(ledger.begin(None), &leave(12, 14), 2).await.unwrap();

        assert_eq!(marked, 3);
        assert_eq!(*ledger.status.borrow(), LeaveStatus::Approved);
        assert_eq!(*ledger.days.borrow(), vec![d(12), d(13), d(14)]);
    }

    #[actix_web::test]
    async fn failed_day_write_leaves_request_pending_and_retryable() {
        let ledger = Ledger::pending();
        let request = leave(12, 14);

        let err = approve(ledger.begin(Some(d(13))), &request, 2).await.unwrap_err();
        assert!(matches!(err, DecisionError::Store(_)));
        assert_eq!(*ledger.status.borrow(), LeaveStatus::Pending);
        assert!(ledger.days.borrow().is_empty());

        let marked = approve(ledger.begin(None), &request, 2).await.unwrap();
        assert_eq!(marked, 3);
        assert_eq!(*ledger.status.borrow(), LeaveStatus::Approved);
    }

    #[actix_web::test]
    async fn decided_request_cannot_be_decided_again() {
        let ledger = Ledger::pending();
        approve(ledger.begin(None), &leave(12, 12), 2).await.unwrap();

        let again = approve(ledger.begin(None), &leave(12, 12), 2).await;
        assert_eq!(again, Err(DecisionError::AlreadyProcessed));
        assert_eq!(
            reject(ledger.begin(None), 11, 2).await,
            Err(DecisionError::AlreadyProcessed)
        );
        assert_eq!(ledger.days.borrow().len(), 1);
    }

    #[actix_web::test]
    async fn rejection_writes_no_attendance() {
        let ledger = Ledger::pending();
        reject(ledger.begin(None), 11, 2).await.unwrap();

        assert_eq!(*ledger.status.borrow(), LeaveStatus::Rejected);
        assert!(ledger.days.borrow().is_empty());
    }

    #[test]
    fn leave_days_are_inclusive() {
        assert_eq!(leave_days(d(1), d(1)).count(), 1);
        assert_eq!(leave_days(d(30), d(31)).collect::<Vec<_>>(), vec![d(30), d(31)]);
    }
}

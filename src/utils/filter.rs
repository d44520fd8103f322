use crate::utils::pagination::Page;
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::query::{QueryAs, QueryScalar};
use sqlx::{FromRow, MySql, MySqlPool};
use utoipa::ToSchema;

use crate::model::{
    attendance::AttendanceRecord, class::SchoolClass, course_progress::CourseProgress,
    daily_report::DailyReport, leave_request::LeaveRequest, notification::Notification,
    schedule::ScheduledPeriod, school::School, student::Student, teacher::Teacher,
};

// Helper enum for typed SQLx binding
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    U64(u64),
    Str(String),
    Date(NaiveDate),
    Bool(bool),
}

impl From<u64> for FilterValue {
    fn from(v: u64) -> Self {
        FilterValue::U64(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Str(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Str(v)
    }
}

impl From<NaiveDate> for FilterValue {
    fn from(v: NaiveDate) -> Self {
        FilterValue::Date(v)
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Bool(v)
    }
}

/// WHERE clause assembled from optional filters, with its bind values in order.
#[derive(Debug, Clone)]
pub struct Filter {
    clause: String,
    args: Vec<FilterValue>,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            clause: String::from(" WHERE 1=1"),
            args: Vec::new(),
        }
    }
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `condition` is a fixed SQL fragment with exactly one `?`.
    pub fn and(mut self, condition: &'static str, value: impl Into<FilterValue>) -> Self {
        self.clause.push_str(" AND ");
        self.clause.push_str(condition);
        self.args.push(value.into());
        self
    }

    /// Like [`Filter::and`] for a fragment with one `?` per value.
    pub fn and_many<V: Into<FilterValue>>(
        mut self,
        condition: &'static str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.clause.push_str(" AND ");
        self.clause.push_str(condition);
        self.args.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn and_opt<V: Into<FilterValue>>(self, condition: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.and(condition, v),
            None => self,
        }
    }

    pub fn clause(&self) -> &str {
        &self.clause
    }

    pub fn args(&self) -> &[FilterValue] {
        &self.args
    }

    pub fn bind_as<'q, O>(
        &'q self,
        mut q: QueryAs<'q, MySql, O, MySqlArguments>,
    ) -> QueryAs<'q, MySql, O, MySqlArguments> {
        for arg in &self.args {
            q = match arg {
                FilterValue::U64(v) => q.bind(*v),
                FilterValue::Str(s) => q.bind(s.as_str()),
                FilterValue::Date(d) => q.bind(*d),
                FilterValue::Bool(b) => q.bind(*b),
            };
        }
        q
    }

    pub fn bind_scalar<'q, O>(
        &'q self,
        mut q: QueryScalar<'q, MySql, O, MySqlArguments>,
    ) -> QueryScalar<'q, MySql, O, MySqlArguments> {
        for arg in &self.args {
            q = match arg {
                FilterValue::U64(v) => q.bind(*v),
                FilterValue::Str(s) => q.bind(s.as_str()),
                FilterValue::Date(d) => q.bind(*d),
                FilterValue::Bool(b) => q.bind(*b),
            };
        }
        q
    }
}

#[derive(Serialize, ToSchema)]
#[aliases(
    SchoolPage = Paginated<School>,
    TeacherPage = Paginated<Teacher>,
    StudentPage = Paginated<Student>,
    ClassPage = Paginated<SchoolClass>,
    SchedulePage = Paginated<ScheduledPeriod>,
    ReportPage = Paginated<DailyReport>,
    AttendancePage = Paginated<AttendanceRecord>,
    LeavePage = Paginated<LeaveRequest>,
    ProgressPage = Paginated<CourseProgress>,
    NotificationPage = Paginated<Notification>
)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

/// COUNT + page query over one table sharing the same filter.
pub async fn fetch_page<T>(
    pool: &MySqlPool,
    table: &str,
    columns: &str,
    filter: &Filter,
    order_by: &str,
    page: Page,
) -> Result<Paginated<T>, sqlx::Error>
where
    T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
{
    let count_sql = format!("SELECT COUNT(*) FROM {table}{}", filter.clause());
    let total = filter
        .bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
        .fetch_one(pool)
        .await?;

    let data_sql = format!(
        "SELECT {columns} FROM {table}{} ORDER BY {order_by} LIMIT ? OFFSET ?",
        filter.clause()
    );
    let data = filter
        .bind_as(sqlx::query_as::<_, T>(&data_sql))
        .bind(page.per_page)
        .bind(page.offset)
        .fetch_all(pool)
        .await?;

    Ok(Paginated {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_filters_only_add_present_values() {
        let filter = Filter::new()
            .and("school_id = ?", 3u64)
            .and_opt("teacher_id = ?", None::<u64>)
            .and_opt("status = ?", Some("Present"));

        assert_eq!(filter.clause(), " WHERE 1=1 AND school_id = ? AND status = ?");
        assert_eq!(
            filter.args(),
            &[FilterValue::U64(3), FilterValue::Str("Present".into())]
        );
    }

    #[test]
    fn grouped_condition_keeps_value_order() {
        let filter = Filter::new().and_many("(name LIKE ? OR code LIKE ?)", ["%a%", "%b%"]);
        assert_eq!(filter.clause(), " WHERE 1=1 AND (name LIKE ? OR code LIKE ?)");
        assert_eq!(
            filter.args(),
            &[FilterValue::Str("%a%".into()), FilterValue::Str("%b%".into())]
        );
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert_eq!(Filter::new().clause(), " WHERE 1=1");
        assert!(Filter::new().args().is_empty());
    }
}

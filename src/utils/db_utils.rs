use crate::error::{AppError, AppResult};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use sqlx::MySqlPool;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, PartialEq)]
pub enum SqlValue {
    String(String),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Null,
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Target row of an update, with an optional tenant guard.
pub struct UpdateTarget<'a> {
    pub table: &'a str,
    pub id: u64,
    pub school_id: Option<u64>,
}

fn to_sql_value(key: &str, value: &Value) -> AppResult<SqlValue> {
    Ok(match value {
        Value::String(s) => {
            if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                SqlValue::Date(d)
            } else if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
                SqlValue::DateTime(dt)
            } else if let Ok(t) = NaiveTime::parse_from_str(s, "%H:%M:%S") {
                SqlValue::Time(t)
            } else {
                SqlValue::String(s.clone())
            }
        }
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                SqlValue::U64(u)
            } else if let Some(i) = n.as_i64() {
                SqlValue::I64(i)
            } else if let Some(f) = n.as_f64() {
                SqlValue::F64(f)
            } else {
                return Err(AppError::bad_request(format!("Unsupported number for {key}")));
            }
        }
        Value::Bool(b) => SqlValue::Bool(*b),
        Value::Null => SqlValue::Null,
        _ => {
            return Err(AppError::bad_request(format!(
                "Unsupported JSON value type for {key}"
            )));
        }
    })
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
/// Only keys listed in `allowed` may be written; anything else is a 400,
/// so client JSON never reaches the SQL text unchecked.
pub fn build_update_sql(
    target: &UpdateTarget<'_>,
    payload: &Value,
    allowed: &[&str],
) -> AppResult<SqlUpdate> {
    let obj = payload
        .as_object()
        .ok_or_else(|| AppError::bad_request("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(AppError::bad_request("No fields provided for update"));
    }

    if let Some(bad) = obj.keys().find(|k| !allowed.contains(&k.as_str())) {
        return Err(AppError::bad_request(format!("Field '{bad}' cannot be updated")));
    }

    let set_clause = obj
        .keys()
        .map(|k| format!("{k} = ?"))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!("UPDATE {} SET {} WHERE id = ?", target.table, set_clause);

    let mut values = Vec::with_capacity(obj.len() + 2);
    for (key, value) in obj {
        values.push(to_sql_value(key, value)?);
    }

    values.push(SqlValue::U64(target.id));

    if let Some(school_id) = target.school_id {
        sql.push_str(" AND school_id = ?");
        values.push(SqlValue::U64(school_id));
    }

    Ok(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::Time(v) => query.bind(v),
            SqlValue::DateTime(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ALLOWED: &[&str] = &["name", "address", "is_active", "opened_on"];

    fn target(school_id: Option<u64>) -> UpdateTarget<'static> {
        UpdateTarget {
            table: "schools",
            id: 5,
            school_id,
        }
    }

    #[test]
    fn builds_set_clause_with_typed_values() {
        let update = build_update_sql(
            &target(None),
            &json!({"name": "North", "is_active": false, "opened_on": "2026-09-01"}),
            ALLOWED,
        )
        .unwrap();

        assert!(update.sql.starts_with("UPDATE schools SET "));
        assert!(update.sql.ends_with("WHERE id = ?"));
        assert!(update.values.contains(&SqlValue::String("North".into())));
        assert!(update.values.contains(&SqlValue::Bool(false)));
        assert!(
            update
                .values
                .contains(&SqlValue::Date(NaiveDate::from_ymd_opt(2026, 9, 1).unwrap()))
        );
        assert_eq!(update.values.last(), Some(&SqlValue::U64(5)));
    }

    #[test]
    fn tenant_guard_is_appended() {
        let update =
            build_update_sql(&target(Some(3)), &json!({"address": null}), ALLOWED).unwrap();
        assert!(update.sql.ends_with("WHERE id = ? AND school_id = ?"));
        assert_eq!(
            update.values,
            vec![SqlValue::Null, SqlValue::U64(5), SqlValue::U64(3)]
        );
    }

    #[test]
    fn unknown_columns_are_rejected() {
        let err = build_update_sql(
            &target(None),
            &json!({"name": "x", "id = 1; DROP TABLE schools; --": 1}),
            ALLOWED,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn empty_and_non_object_payloads_are_rejected() {
        assert!(build_update_sql(&target(None), &json!({}), ALLOWED).is_err());
        assert!(build_update_sql(&target(None), &json!([1, 2]), ALLOWED).is_err());
        assert!(build_update_sql(&target(None), &json!({"name": [1]}), ALLOWED).is_err());
    }
}

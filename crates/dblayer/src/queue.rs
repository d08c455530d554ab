//! Deferred operations stored in a table and processed on demand.

use chrono::{DateTime, Utc};
use dblayer_core::{AddColumns, SqlValue, TableBuilder, TableDefinition, Values};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::executor::{column_i64, Row};

/// Processing state of a queued operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
    Pending,
    Completed,
    Failed,
}

impl QueueStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A row of a queue table.
///
/// Times are stored as Unix seconds so due-date comparisons behave the
/// same on every dialect.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedOperation {
    pub id: i64,
    pub operation: String,
    pub payload: Value,
    pub status: QueueStatus,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub run_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl QueuedOperation {
    pub(crate) fn insert_values(operation: &str, payload: &Value, run_at: DateTime<Utc>) -> Values {
        vec![
            (String::from("operation"), SqlValue::Text(String::from(operation))),
            (String::from("payload"), SqlValue::Text(payload.to_string())),
            (
                String::from("status"),
                SqlValue::Text(String::from(QueueStatus::Pending.as_str())),
            ),
            (String::from("attempts"), SqlValue::Int(0)),
            (String::from("run_at"), SqlValue::Int(run_at.timestamp())),
            (String::from("created_at"), SqlValue::Int(Utc::now().timestamp())),
        ]
    }

    pub fn from_row(row: &Row) -> Result<Self> {
        let int = |column: &str| {
            column_i64(row, column)
                .ok_or_else(|| Error::Driver(format!("queue row has no integer column '{column}'")))
        };
        let text = |column: &str| row.get(column).and_then(Value::as_str);
        let time = |column: &str| -> Result<DateTime<Utc>> {
            let secs = int(column)?;
            DateTime::from_timestamp(secs, 0)
                .ok_or_else(|| Error::Driver(format!("queue column '{column}' is out of range")))
        };

        let status = text("status").unwrap_or_default();
        let payload = match text("payload") {
            Some(s) => serde_json::from_str(s)?,
            None => Value::Null,
        };
        Ok(Self {
            id: int("id")?,
            operation: text("operation").map(String::from).unwrap_or_default(),
            payload,
            status: QueueStatus::parse(status)
                .ok_or_else(|| Error::Driver(format!("unknown queue status '{status}'")))?,
            attempts: int("attempts")?,
            last_error: text("last_error").map(String::from),
            run_at: time("run_at")?,
            created_at: time("created_at")?,
            processed_at: match column_i64(row, "processed_at") {
                Some(_) => Some(time("processed_at")?),
                None => None,
            },
        })
    }
}

/// Outcome of one [`process_queue`](crate::QueryBuilder::process_queue) run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueReport {
    pub processed: u64,
    pub completed: u64,
    pub failed: u64,
}

/// Definition of a queue table named `name`.
#[must_use]
pub fn queue_table(name: &str) -> TableDefinition {
    let mut t = TableBuilder::new(name);
    t.id();
    t.string("operation", 100);
    t.text("payload");
    t.string("status", 16).default(QueueStatus::Pending.as_str());
    t.integer("attempts").default(0);
    t.text("last_error").nullable();
    t.big_integer("run_at");
    t.big_integer("created_at");
    t.big_integer("processed_at").nullable();
    t.index(&format!("idx_{name}_due"), &["status", "run_at"]);
    t.if_not_exists();
    t.finish()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_round_trip_through_row() {
        let run_at = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();
        let mut row: Row = QueuedOperation::insert_values("send_email", &json!({"to": "a@b.c"}), run_at)
            .into_iter()
            .map(|(k, v)| (k, v.to_json()))
            .collect();
        row.insert(String::from("id"), json!(9));

        let op = QueuedOperation::from_row(&row).unwrap();
        assert_eq!(op.id, 9);
        assert_eq!(op.operation, "send_email");
        assert_eq!(op.payload, json!({"to": "a@b.c"}));
        assert_eq!(op.status, QueueStatus::Pending);
        assert_eq!(op.run_at, run_at);
        assert_eq!(op.last_error, None);
        assert_eq!(op.processed_at, None);
    }

    #[test]
    fn test_unknown_status() {
        assert_eq!(QueueStatus::parse("failed"), Some(QueueStatus::Failed));
        assert_eq!(QueueStatus::parse("stuck"), None);
    }
}

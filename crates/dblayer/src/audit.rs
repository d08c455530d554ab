//! Audit trail for writes made through builders with an actor attached.

use chrono::{DateTime, SecondsFormat, Utc};
use dblayer_core::{AddColumns, SqlValue, TableBuilder, TableDefinition, Values};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::executor::{column_i64, Row};

/// The write that produced an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// One row of the audit table.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub table_name: String,
    /// Primary key of the written row, when it is known.
    pub record_id: Option<i64>,
    pub action: AuditAction,
    pub actor_id: i64,
    pub old_values: Option<Value>,
    pub new_values: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    #[must_use]
    pub fn new(table_name: &str, action: AuditAction, actor_id: i64) -> Self {
        Self {
            table_name: String::from(table_name),
            record_id: None,
            action,
            actor_id,
            old_values: None,
            new_values: None,
            created_at: Utc::now(),
        }
    }

    /// Column values for the INSERT. JSON snapshots are stored as text so
    /// the table is portable across dialects.
    pub(crate) fn values(&self) -> Values {
        let json_text = |v: &Option<Value>| {
            v.as_ref()
                .map_or(SqlValue::Null, |v| SqlValue::Text(v.to_string()))
        };
        vec![
            (String::from("table_name"), SqlValue::Text(self.table_name.clone())),
            (
                String::from("record_id"),
                self.record_id.map_or(SqlValue::Null, SqlValue::Int),
            ),
            (String::from("action"), SqlValue::Text(String::from(self.action.as_str()))),
            (String::from("actor_id"), SqlValue::Int(self.actor_id)),
            (String::from("old_values"), json_text(&self.old_values)),
            (String::from("new_values"), json_text(&self.new_values)),
            (
                String::from("created_at"),
                SqlValue::Text(self.created_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ),
        ]
    }

    /// Decodes a row read back from the audit table.
    pub fn from_row(row: &Row) -> Result<Self> {
        let text = |column: &str| -> Result<String> {
            row.get(column)
                .and_then(Value::as_str)
                .map(String::from)
                .ok_or_else(|| Error::Driver(format!("audit row has no text column '{column}'")))
        };
        let json = |column: &str| -> Result<Option<Value>> {
            match row.get(column).and_then(Value::as_str) {
                Some(s) => Ok(Some(serde_json::from_str(s)?)),
                None => Ok(None),
            }
        };
        let action = text("action")?;
        let created_at = text("created_at")?;
        Ok(Self {
            table_name: text("table_name")?,
            record_id: column_i64(row, "record_id"),
            action: AuditAction::parse(&action)
                .ok_or_else(|| Error::Driver(format!("unknown audit action '{action}'")))?,
            actor_id: column_i64(row, "actor_id").unwrap_or_default(),
            old_values: json("old_values")?,
            new_values: json("new_values")?,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| Error::Driver(format!("bad audit timestamp '{created_at}': {e}")))?
                .with_timezone(&Utc),
        })
    }
}

/// Definition of an audit table named `name`.
#[must_use]
pub fn audit_table(name: &str) -> TableDefinition {
    let mut t = TableBuilder::new(name);
    t.id();
    t.string("table_name", 64);
    t.big_integer("record_id").nullable();
    t.string("action", 16);
    t.big_integer("actor_id");
    t.text("old_values").nullable();
    t.text("new_values").nullable();
    t.string("created_at", 32);
    t.index(&format!("idx_{name}_record"), &["table_name", "record_id"]);
    t.if_not_exists();
    t.finish()
}

//! Query metrics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// The kind of statement observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
    Ddl,
    Other,
}

impl QueryKind {
    /// Classifies a statement by its leading keyword.
    #[must_use]
    pub fn from_sql(sql: &str) -> Self {
        let keyword = sql
            .trim_start_matches(|c: char| c.is_whitespace() || c == '(')
            .split(|c: char| !c.is_ascii_alphabetic())
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();
        match keyword.as_str() {
            "SELECT" | "WITH" => Self::Select,
            "INSERT" => Self::Insert,
            "UPDATE" => Self::Update,
            "DELETE" => Self::Delete,
            "CREATE" | "ALTER" | "DROP" | "TRUNCATE" | "COMMENT" => Self::Ddl,
            _ => Self::Other,
        }
    }
}

/// One executed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryObservation {
    pub sql: String,
    pub kind: QueryKind,
    pub duration: Duration,
    /// Rows returned for queries, rows affected for statements.
    pub rows: u64,
    pub error: Option<String>,
}

/// Receives an observation for every statement a builder executes.
///
/// Implementations must not fail; anything they cannot record is dropped.
pub trait MetricsCollector: Send + Sync {
    fn observe(&self, observation: &QueryObservation);
}

/// Aggregated counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    pub queries: u64,
    pub errors: u64,
    pub rows: u64,
    pub total_time: Duration,
    pub max_time: Duration,
}

impl QueryStats {
    #[must_use]
    pub fn average_time(&self) -> Duration {
        if self.queries == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total_time.as_nanos() / u128::from(self.queries);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

/// A lock-free [`MetricsCollector`] that keeps running totals.
#[derive(Debug, Default)]
pub struct StatsCollector {
    queries: AtomicU64,
    errors: AtomicU64,
    rows: AtomicU64,
    total_nanos: AtomicU64,
    max_nanos: AtomicU64,
}

impl StatsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> QueryStats {
        QueryStats {
            queries: self.queries.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            rows: self.rows.load(Ordering::Relaxed),
            total_time: Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed)),
            max_time: Duration::from_nanos(self.max_nanos.load(Ordering::Relaxed)),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.queries,
            &self.errors,
            &self.rows,
            &self.total_nanos,
            &self.max_nanos,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl MetricsCollector for StatsCollector {
    fn observe(&self, observation: &QueryObservation) {
        let nanos = u64::try_from(observation.duration.as_nanos()).unwrap_or(u64::MAX);
        self.queries.fetch_add(1, Ordering::Relaxed);
        if observation.error.is_some() {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
        self.rows.fetch_add(observation.rows, Ordering::Relaxed);
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.max_nanos.fetch_max(nanos, Ordering::Relaxed);
    }
}

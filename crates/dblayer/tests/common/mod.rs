#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use dblayer::dblayer_core::{AddColumns, ParameterizedSql};
use dblayer::{Connection, Database, DbLayer, ExecResult, Executor, Row, TransactionalExecutor};
use serde_json::Value;
use sqlx::any::AnyPoolOptions;

#[derive(Default)]
struct MockState {
    statements: Mutex<Vec<ParameterizedSql>>,
    responses: Mutex<VecDeque<Vec<Row>>>,
    rows_affected: AtomicU64,
    last_insert_id: Mutex<Option<i64>>,
    fail_on: Mutex<Option<String>>,
}

/// Records every statement it receives and answers queries from a queue
/// of canned responses. Transactions share the same log and record
/// `BEGIN`, `COMMIT` and `ROLLBACK` as statements.
#[derive(Clone)]
pub struct MockExecutor {
    driver: &'static str,
    state: Arc<MockState>,
}

impl MockExecutor {
    pub fn new(driver: &'static str) -> Self {
        Self {
            driver,
            state: Arc::new(MockState::default()),
        }
    }

    /// Queues the rows returned by the next query.
    pub fn push_rows(&self, rows: Vec<Value>) {
        let rows = rows
            .into_iter()
            .map(|row| match row {
                Value::Object(map) => map,
                other => panic!("mock rows must be objects, got {other}"),
            })
            .collect();
        self.state.responses.lock().unwrap().push_back(rows);
    }

    pub fn set_rows_affected(&self, n: u64) {
        self.state.rows_affected.store(n, Ordering::SeqCst);
    }

    pub fn set_last_insert_id(&self, id: i64) {
        *self.state.last_insert_id.lock().unwrap() = Some(id);
    }

    /// Makes every statement containing `fragment` fail after recording it.
    pub fn fail_on(&self, fragment: &str) {
        *self.state.fail_on.lock().unwrap() = Some(String::from(fragment));
    }

    fn check(&self, stmt: &ParameterizedSql) -> dblayer::Result<()> {
        match self.state.fail_on.lock().unwrap().as_deref() {
            Some(fragment) if stmt.sql.contains(fragment) => {
                Err(dblayer::Error::Driver(format!("rejected: {}", stmt.sql)))
            }
            _ => Ok(()),
        }
    }

    pub fn statements(&self) -> Vec<ParameterizedSql> {
        self.state.statements.lock().unwrap().clone()
    }

    pub fn sql(&self) -> Vec<String> {
        self.statements().into_iter().map(|s| s.sql).collect()
    }

    fn record(&self, sql: &str) {
        self.state
            .statements
            .lock()
            .unwrap()
            .push(ParameterizedSql::raw(sql));
    }
}

impl Executor for MockExecutor {
    fn driver_name(&self) -> &str {
        self.driver
    }

    async fn exec(&self, stmt: &ParameterizedSql) -> dblayer::Result<ExecResult> {
        self.state.statements.lock().unwrap().push(stmt.clone());
        self.check(stmt)?;
        Ok(ExecResult {
            rows_affected: self.state.rows_affected.load(Ordering::SeqCst),
            last_insert_id: *self.state.last_insert_id.lock().unwrap(),
        })
    }

    async fn query(&self, stmt: &ParameterizedSql) -> dblayer::Result<Vec<Row>> {
        self.state.statements.lock().unwrap().push(stmt.clone());
        self.check(stmt)?;
        Ok(self
            .state
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }
}

impl TransactionalExecutor for MockExecutor {
    async fn commit(&self) -> dblayer::Result<()> {
        self.record("COMMIT");
        Ok(())
    }

    async fn rollback(&self) -> dblayer::Result<()> {
        self.record("ROLLBACK");
        Ok(())
    }
}

impl Connection for MockExecutor {
    type Tx = Self;

    async fn begin(&self) -> dblayer::Result<Self> {
        self.record("BEGIN");
        Ok(self.clone())
    }
}

pub fn mock(driver: &'static str) -> (DbLayer<MockExecutor>, MockExecutor) {
    let executor = MockExecutor::new(driver);
    (DbLayer::new(executor.clone()).unwrap(), executor)
}

/// Routes `tracing` output through the test harness. Safe to call from
/// every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// A layer over a private in-memory SQLite database.
///
/// The pool holds exactly one connection that never expires, since every
/// SQLite connection would otherwise open its own empty database.
pub async fn sqlite() -> DbLayer<Database> {
    init_tracing();
    let options = AnyPoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None);
    let db = Database::connect_with(options, "sqlite::memory:").await.unwrap();
    DbLayer::new(db).unwrap()
}

pub async fn create_users(db: &DbLayer<Database>) {
    db.create_table("users", |t| {
        t.id();
        t.string("name", 100);
        t.string("email", 255).unique();
        t.integer("age").default(0);
        t.string("status", 20).default("active");
    })
    .await
    .unwrap();
}

/// Inserts `n` users named `user0` .. `user{n-1}` with ids 1 ..= n.
pub async fn seed_users(db: &DbLayer<Database>, n: usize) {
    for i in 0..n {
        db.table("users")
            .create(&serde_json::json!({
                "name": format!("user{i}"),
                "email": format!("user{i}@example.com"),
                "age": 20 + i,
            }))
            .await
            .unwrap();
    }
}

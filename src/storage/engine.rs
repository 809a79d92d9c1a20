//! SQLite Storage Engine
//!
//! Default [`ReadingStore`] backend. All readings live in a single table whose
//! CHECK constraints restate the reading schema, so a row that slipped past
//! the normalizer is still refused by the database.
//!
//! The connection sits behind a `std::sync::Mutex` and is only locked inside
//! `spawn_blocking` closures, never across an `.await`.

use async_trait::async_trait;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::query::{AggregateOp, AggregatePlan, Comparison, Condition, Conjunction, OrderKey, SortOrder};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::schema::Column;
use crate::storage::store::{AggregateValue, ReadingStore};
use crate::storage::types::{ColumnValue, Reading, Visibility};

const CREATE_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS readings (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp   INTEGER NOT NULL,
        temperature REAL NOT NULL,
        rainfall    REAL NOT NULL CHECK (rainfall >= 0),
        humidity    REAL NOT NULL,
        wind_speed  REAL NOT NULL CHECK (wind_speed >= 0),
        visibility  TEXT NOT NULL CHECK (visibility IN ('VP', 'P', 'M', 'G', 'VG', 'E'))
    );
    CREATE INDEX IF NOT EXISTS idx_readings_timestamp ON readings(timestamp);
"#;

const INSERT_READING: &str = "INSERT INTO readings
    (timestamp, temperature, rainfall, humidity, wind_speed, visibility)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

const SELECT_COLUMNS: &str =
    "SELECT timestamp, temperature, rainfall, humidity, wind_speed, visibility FROM readings";

/// SQLite-backed reading store
///
/// Statements run on tokio's blocking pool via `spawn_blocking`, so a slow
/// query never stalls the async workers.
pub struct StorageEngine {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl StorageEngine {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| StorageError::CreateDirectory {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        info!("Opening reading store at {}", path.display());
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        conn.execute_batch(CREATE_SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CREATE_SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Database file, `None` when in memory
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `f` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StorageResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|e| StorageError::Lock(e.to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StorageError::Task(e.to_string()))?
    }
}

#[async_trait]
impl ReadingStore for StorageEngine {
    async fn append(&self, readings: &[Reading]) -> StorageResult<usize> {
        let readings = readings.to_vec();
        let n = self
            .with_conn(move |conn| {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare_cached(INSERT_READING)?;
                    for r in &readings {
                        stmt.execute(params![
                            r.timestamp,
                            r.temperature,
                            r.rainfall,
                            r.humidity,
                            r.wind_speed,
                            r.visibility.code(),
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(readings.len())
            })
            .await?;

        debug!(rows = n, "Appended readings");
        Ok(n)
    }

    async fn find(
        &self,
        predicate: &Conjunction,
        order: Option<&OrderKey>,
    ) -> StorageResult<Vec<Reading>> {
        let (where_clause, params) = build_where(predicate);
        let order_clause = match order {
            Some(key) => format!(
                "ORDER BY {} {}, id ASC",
                order_expr(key.column),
                sort_keyword(key.order)
            ),
            None => "ORDER BY id ASC".to_string(),
        };
        let sql = format!("{} {} {}", SELECT_COLUMNS, where_clause, order_clause);
        debug!("Executing query: {}", sql);

        let raw = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params_from_iter(params.iter()), |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, f64>(1)?,
                            row.get::<_, f64>(2)?,
                            row.get::<_, f64>(3)?,
                            row.get::<_, f64>(4)?,
                            row.get::<_, String>(5)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        raw.into_iter()
            .map(|(timestamp, temperature, rainfall, humidity, wind_speed, code)| {
                let visibility = Visibility::from_code(&code).ok_or_else(|| {
                    StorageError::Corruption(format!(
                        "visibility '{}' at timestamp {}",
                        code, timestamp
                    ))
                })?;
                Ok(Reading::new(
                    timestamp,
                    temperature,
                    rainfall,
                    humidity,
                    wind_speed,
                    visibility,
                ))
            })
            .collect()
    }

    async fn aggregate(
        &self,
        predicate: &Conjunction,
        aggregate: &AggregatePlan,
    ) -> StorageResult<AggregateValue> {
        let (where_clause, params) = build_where(predicate);
        let sql = format!(
            "SELECT {}({}) FROM readings {}",
            aggregate.op,
            aggregate.column.name(),
            where_clause
        );
        debug!("Executing aggregate: {}", sql);

        let is_count = aggregate.op == AggregateOp::Count;
        self.with_conn(move |conn| {
            let params = params_from_iter(params.iter());
            let value = if is_count {
                let n: i64 = conn.query_row(&sql, params, |row| row.get(0))?;
                AggregateValue::Count(n.max(0) as u64)
            } else {
                let v: Option<f64> = conn.query_row(&sql, params, |row| row.get(0))?;
                AggregateValue::Number(v)
            };
            Ok(value)
        })
        .await
    }

    async fn count(&self) -> StorageResult<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM readings", [], |row| row.get(0))?;
            Ok(n.max(0) as u64)
        })
        .await
    }
}

/// Render a conjunction as a WHERE clause with bound parameters
fn build_where(predicate: &Conjunction) -> (String, Vec<SqlValue>) {
    let mut conditions: Vec<String> = Vec::new();
    let mut params: Vec<SqlValue> = Vec::new();

    for condition in predicate.conditions() {
        conditions.push(render_condition(condition, &mut params));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    (where_clause, params)
}

fn render_condition(condition: &Condition, params: &mut Vec<SqlValue>) -> String {
    let column = condition.column.name();
    match condition.value {
        ColumnValue::Integer(v) => {
            params.push(SqlValue::Integer(v));
            format!("{} {} ?", column, condition.op)
        }
        ColumnValue::Real(v) => {
            params.push(SqlValue::Real(v));
            format!("{} {} ?", column, condition.op)
        }
        // Codes are text in the table; compare along the scale by listing
        // every code that satisfies the condition. The target itself always
        // satisfies gte, lte and eq, so the list is never empty.
        ColumnValue::Code(target) => {
            let codes = codes_satisfying(condition.op, target);
            let placeholders = vec!["?"; codes.len()].join(", ");
            params.extend(codes.into_iter().map(|c| SqlValue::Text(c.to_string())));
            format!("{} IN ({})", column, placeholders)
        }
    }
}

fn codes_satisfying(op: Comparison, target: Visibility) -> Vec<&'static str> {
    Visibility::all()
        .iter()
        .copied()
        .filter(|v| op.holds(v.cmp(&target)))
        .map(|v| v.code())
        .collect()
}

fn order_expr(column: Column) -> String {
    match column {
        Column::Visibility => {
            let arms: Vec<String> = Visibility::all()
                .iter()
                .map(|v| format!("WHEN '{}' THEN {}", v.code(), v.rank()))
                .collect();
            format!("CASE visibility {} END", arms.join(" "))
        }
        other => other.name().to_string(),
    }
}

fn sort_keyword(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Ascending => "ASC",
        SortOrder::Descending => "DESC",
    }
}

//! FloatChat profile store
//!
//! A thin layer over a single SQLite connection holding the `profiles` table:
//!
//! ```text
//!   ETL rows ──► load_profiles ──►┌──────────────┐
//!                                 │   profiles   │◄── execute(sql) ──► QueryResult
//!   inspect  ◄── overview ◄───────│   (SQLite)   │
//!                                 └──────────────┘
//! ```
//!
//! The connection is opened once and shared by reference for the lifetime of
//! the process. Every statement is materialized in full before returning.

pub mod guard;
pub mod ingest;
pub mod result;
pub mod schema;

use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params, Connection, ErrorCode, OpenFlags};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub use guard::{check_read_only, GuardRejection};
pub use ingest::{parse_profile_records, CompleteProfile, LoadReport, ProfileRecord};
pub use result::{QueryResult, Row, Scalar};
pub use schema::{ColumnSpec, DeclaredType, SchemaDescriptor, PROFILES_TABLE};

/// VM instructions between deadline checks.
const PROGRESS_OPS: i32 = 1_000;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The statement was rejected by the guard or by SQLite itself.
    #[error("execution error: {0}")]
    Execution(String),
    #[error("ingest error: {0}")]
    Ingest(String),
    #[error("database {} does not exist (run `floatchat load` first)", .0.display())]
    NotFound(PathBuf),
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Interrupt a statement that runs longer than this. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Refuse anything but a single query statement.
    pub read_only: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            read_only: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Drop and recreate the table (the ETL's `if_exists='replace'`).
    Replace,
    Append,
}

/// Shape of the data currently in the store.
#[derive(Debug, Clone, Serialize)]
pub struct StoreOverview {
    pub row_count: i64,
    pub sample: QueryResult,
    pub years: Vec<String>,
    pub latitude_range: Option<(f64, f64)>,
    pub longitude_range: Option<(f64, f64)>,
}

#[derive(Debug)]
pub struct ProfileStore {
    conn: Mutex<Connection>,
    schema: SchemaDescriptor,
    options: StoreOptions,
    path: Option<PathBuf>,
}

impl ProfileStore {
    /// Open or create the database file. Used by the loader.
    pub fn open(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self, StoreError> {
        let path = path.as_ref();
        Self::from_connection(Connection::open(path)?, path, options)
    }

    /// Open a database that must already exist.
    ///
    /// A missing file is [`StoreError::NotFound`] and nothing is created.
    pub fn open_existing(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(|e| {
            if matches!(&e, rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::CannotOpen) {
                StoreError::NotFound(path.to_path_buf())
            } else {
                StoreError::Sqlite(e)
            }
        })?;
        Self::from_connection(conn, path, options)
    }

    fn from_connection(
        conn: Connection,
        path: &Path,
        options: StoreOptions,
    ) -> Result<Self, StoreError> {
        conn.busy_timeout(Duration::from_secs(5))?;
        tracing::info!(path = %path.display(), read_only = options.read_only, "opened profile store");
        Ok(Self {
            conn: Mutex::new(conn),
            schema: SchemaDescriptor::argo_profiles(),
            options,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory(options: StoreOptions) -> Result<Self, StoreError> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            schema: SchemaDescriptor::argo_profiles(),
            options,
            path: None,
        })
    }

    pub fn schema(&self) -> &SchemaDescriptor {
        &self.schema
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run one statement and materialize every row.
    ///
    /// Failures are never retried here; every failure surfaces as
    /// [`StoreError::Execution`].
    pub fn execute(&self, sql: &str) -> Result<QueryResult, StoreError> {
        if sql.trim().is_empty() {
            return Err(StoreError::Execution("empty statement".to_string()));
        }
        if self.options.read_only {
            check_read_only(sql).map_err(|e| StoreError::Execution(e.to_string()))?;
        }

        let started = Instant::now();
        let conn = self.conn.lock();
        // A deadline past the end of the clock means no deadline.
        if let Some(deadline) = self.options.timeout.and_then(|t| started.checked_add(t)) {
            conn.progress_handler(PROGRESS_OPS, Some(move || Instant::now() >= deadline));
        }
        let outcome = run_query(&conn, sql);
        conn.progress_handler(0, None::<fn() -> bool>);
        drop(conn);

        match outcome {
            Ok(result) => {
                tracing::debug!(
                    rows = result.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "statement executed"
                );
                Ok(result)
            }
            Err(e) if is_interrupt(&e) => Err(StoreError::Execution(format!(
                "statement interrupted after {}s timeout",
                self.options.timeout.unwrap_or_default().as_secs()
            ))),
            Err(e) => Err(StoreError::Execution(e.to_string())),
        }
    }

    /// Insert complete records in one transaction; incomplete ones are dropped.
    pub fn load_profiles(
        &self,
        records: &[ProfileRecord],
        mode: LoadMode,
    ) -> Result<LoadReport, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        if mode == LoadMode::Replace {
            tx.execute_batch(&format!("DROP TABLE IF EXISTS \"{}\"", self.schema.table))?;
        }
        tx.execute_batch(&self.schema.create_table_sql(true))?;

        let mut report = LoadReport {
            read: records.len(),
            ..LoadReport::default()
        };
        {
            let columns = self
                .schema
                .column_names()
                .map(|c| format!("\"{c}\""))
                .collect::<Vec<_>>()
                .join(", ");
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO \"{}\" ({columns}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                self.schema.table
            ))?;
            for p in records.iter().filter_map(ProfileRecord::complete) {
                stmt.execute(params![
                    p.float_id,
                    p.pres,
                    p.temp,
                    p.psal,
                    p.latitude,
                    p.longitude,
                    p.time.format(TIME_FORMAT).to_string(),
                    p.profile_id,
                ])?;
                report.inserted += 1;
            }
        }
        tx.commit()?;

        report.dropped = report.read - report.inserted;
        tracing::info!(
            read = report.read,
            inserted = report.inserted,
            dropped = report.dropped,
            "loaded profiles"
        );
        Ok(report)
    }

    pub fn load_file(&self, path: impl AsRef<Path>, mode: LoadMode) -> Result<LoadReport, StoreError> {
        let text = std::fs::read_to_string(path)?;
        let records = parse_profile_records(&text)?;
        self.load_profiles(&records, mode)
    }

    /// Sample rows, available years, and coordinate ranges.
    pub fn overview(&self) -> Result<StoreOverview, StoreError> {
        let table = self.schema.table;
        let row_count = self
            .execute(&format!("SELECT COUNT(*) FROM \"{table}\""))?
            .row(0)
            .and_then(|r| r.iter().next().map(|(_, v)| v.clone()))
            .and_then(|v| match v {
                Scalar::Integer(n) => Some(n),
                _ => None,
            })
            .unwrap_or(0);
        let sample = self.execute(&format!("SELECT * FROM \"{table}\" LIMIT 5"))?;
        let years = self
            .execute(&format!(
                "SELECT DISTINCT strftime('%Y', TIME) AS year FROM \"{table}\" ORDER BY year"
            ))?
            .column_values("year")
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        let latitude_range = self.range("LATITUDE")?;
        let longitude_range = self.range("LONGITUDE")?;

        Ok(StoreOverview {
            row_count,
            sample,
            years,
            latitude_range,
            longitude_range,
        })
    }

    fn range(&self, column: &str) -> Result<Option<(f64, f64)>, StoreError> {
        let result = self.execute(&format!(
            "SELECT MIN(\"{column}\") AS lo, MAX(\"{column}\") AS hi FROM \"{}\"",
            self.schema.table
        ))?;
        Ok(result.row(0).and_then(|r| {
            let lo = r.get("lo")?.as_f64()?;
            let hi = r.get("hi")?.as_f64()?;
            Some((lo, hi))
        }))
    }
}

fn run_query(conn: &Connection, sql: &str) -> rusqlite::Result<QueryResult> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<(String, bool)> = stmt
        .columns()
        .iter()
        .map(|c| {
            let is_time = c.decl_type().is_some_and(is_datetime_decl);
            (c.name().to_string(), is_time)
        })
        .collect();

    let mut result = QueryResult::new(columns.iter().map(|(n, _)| n.clone()).collect());
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(columns.len());
        for (i, (_, is_time)) in columns.iter().enumerate() {
            values.push(to_scalar(row.get::<_, Value>(i)?, *is_time));
        }
        result.push_row(values);
    }
    Ok(result)
}

fn is_datetime_decl(decl: &str) -> bool {
    let decl = decl.to_ascii_uppercase();
    decl.contains("DATE") || decl.contains("TIME")
}

fn to_scalar(value: Value, is_time: bool) -> Scalar {
    match value {
        Value::Null => Scalar::Null,
        Value::Integer(v) => Scalar::Integer(v),
        Value::Real(v) => Scalar::Real(v),
        Value::Text(s) if is_time => match Scalar::parse_timestamp(&s) {
            Some(t) => Scalar::Timestamp(t),
            None => Scalar::Text(s),
        },
        Value::Text(s) => Scalar::Text(s),
        Value::Blob(b) => Scalar::Text(format!("[BLOB {} bytes]", b.len())),
    }
}

fn is_interrupt(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::OperationInterrupted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(psal: f64, time: &str) -> ProfileRecord {
        ProfileRecord {
            float_id: Some("2902746".into()),
            pres: Some(5.0),
            temp: Some(28.0),
            psal: Some(psal),
            latitude: Some(10.5),
            longitude: Some(80.25),
            time: Some(time.into()),
            profile_id: Some(1),
        }
    }

    fn store_with_rows() -> ProfileStore {
        let store = ProfileStore::open_in_memory(StoreOptions::default()).unwrap();
        store
            .load_profiles(
                &[
                    record(35.5, "2024-01-03 04:00:00"),
                    record(35.4, "2024-01-20 12:00:00"),
                    record(34.9, "2023-12-30 00:00:00"),
                ],
                LoadMode::Replace,
            )
            .unwrap();
        store
    }

    #[test]
    fn test_execute_recovers_timestamps_from_decl_type() {
        let store = store_with_rows();
        let result = store
            .execute("SELECT PSAL, TIME FROM profiles WHERE strftime('%Y-%m', TIME) = '2024-01' LIMIT 10")
            .unwrap();
        assert_eq!(result.len(), 2);
        let row = result.row(0).unwrap();
        assert_eq!(row.get("PSAL"), Some(&Scalar::Real(35.5)));
        assert!(row.get("TIME").unwrap().as_timestamp().is_some());
    }

    #[test]
    fn test_execute_reports_syntax_errors() {
        let store = store_with_rows();
        let err = store
            .execute("Sure! Here's the query: SELECT * FROM profiles")
            .unwrap_err();
        assert!(matches!(err, StoreError::Execution(_)));

        let err = store.execute("SELECT nope FROM profiles").unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_execute_rejects_blank_statement() {
        let store = store_with_rows();
        assert!(matches!(store.execute("  \n"), Err(StoreError::Execution(_))));
    }

    #[test]
    fn test_read_only_guard() {
        let store = ProfileStore::open_in_memory(StoreOptions {
            read_only: true,
            ..StoreOptions::default()
        })
        .unwrap();
        store.load_profiles(&[record(35.0, "2024-01-01")], LoadMode::Replace).unwrap();

        let err = store.execute("DROP TABLE profiles").unwrap_err();
        assert!(err.to_string().contains("only SELECT"));
        assert_eq!(store.execute("SELECT COUNT(*) FROM profiles").unwrap().len(), 1);
    }

    #[test]
    fn test_timeout_interrupts_long_statement() {
        let store = ProfileStore::open_in_memory(StoreOptions {
            timeout: Some(Duration::from_millis(50)),
            read_only: false,
        })
        .unwrap();
        let err = store
            .execute(
                "WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n) \
                 SELECT COUNT(*) FROM n",
            )
            .unwrap_err();
        assert!(err.to_string().contains("interrupted"));
        // the handler is cleared afterwards
        assert_eq!(store.execute("SELECT 1").unwrap().len(), 1);
    }

    #[test]
    fn test_unrepresentable_timeout_runs_without_deadline() {
        let store = ProfileStore::open_in_memory(StoreOptions {
            timeout: Some(Duration::from_secs(u64::MAX)),
            read_only: false,
        })
        .unwrap();
        let result = store.execute("SELECT 1").unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_load_drops_incomplete_rows_and_appends() {
        let store = store_with_rows();
        let mut partial = record(35.0, "2024-02-01 00:00:00");
        partial.latitude = None;
        let report = store
            .load_profiles(&[partial, record(35.1, "2024-02-02 00:00:00")], LoadMode::Append)
            .unwrap();
        assert_eq!(
            report,
            LoadReport {
                read: 2,
                inserted: 1,
                dropped: 1
            }
        );
        assert_eq!(store.execute("SELECT * FROM profiles").unwrap().len(), 4);
    }

    #[test]
    fn test_overview() {
        let store = store_with_rows();
        let overview = store.overview().unwrap();
        assert_eq!(overview.row_count, 3);
        assert_eq!(overview.sample.len(), 3);
        assert_eq!(overview.years, vec!["2023".to_string(), "2024".to_string()]);
        assert_eq!(overview.latitude_range, Some((10.5, 10.5)));
        assert_eq!(overview.longitude_range, Some((80.25, 80.25)));
    }
}

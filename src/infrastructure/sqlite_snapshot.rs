// SQLite snapshot repository implementation
use crate::application::snapshot_repository::SnapshotRepository;
use crate::domain::record::{LaundryRecord, RecordFilter};
use crate::error::SnapshotError;
use crate::infrastructure::config::SchemaConfig;
use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};

pub struct SqliteSnapshotRepository {
    path: PathBuf,
    schema: SchemaConfig,
}

impl SqliteSnapshotRepository {
    pub fn new(path: impl Into<PathBuf>, schema: SchemaConfig) -> Self {
        Self {
            path: path.into(),
            schema,
        }
    }

    fn build_query(&self, filter: &RecordFilter) -> anyhow::Result<(String, Vec<Value>)> {
        let s = &self.schema;
        let columns = [
            &s.timestamp,
            &s.machine,
            &s.client,
            &s.pieces_in,
            &s.pieces_out,
            &s.efficiency_in,
            &s.efficiency_out,
            &s.operating_time,
            &s.idle_time,
        ]
        .iter()
        .map(|c| quote_ident(c))
        .collect::<anyhow::Result<Vec<_>>>()?
        .join(", ");

        let mut sql = format!("SELECT {} FROM {}", columns, quote_ident(&s.table)?);
        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        let ts = quote_ident(&s.timestamp)?;
        if let Some(start) = filter.start_date {
            params.push(Value::Text(start.format("%Y-%m-%d").to_string()));
            conditions.push(format!("date({}) >= ?{}", ts, params.len()));
        }
        if let Some(end) = filter.end_date {
            params.push(Value::Text(end.format("%Y-%m-%d").to_string()));
            conditions.push(format!("date({}) <= ?{}", ts, params.len()));
        }
        if let Some(machine) = filter.machine {
            params.push(Value::Integer(machine));
            conditions.push(format!("{} = ?{}", quote_ident(&s.machine)?, params.len()));
        }
        if let Some(client) = &filter.client {
            params.push(Value::Text(client.clone()));
            conditions.push(format!("{} = ?{}", quote_ident(&s.client)?, params.len()));
        }

        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        Ok((sql, params))
    }
}

#[async_trait]
impl SnapshotRepository for SqliteSnapshotRepository {
    async fn load_records(&self, filter: &RecordFilter) -> anyhow::Result<Vec<LaundryRecord>> {
        // Fresh read-only connection per invocation; the refresher's atomic
        // rename guarantees we never observe a half-written file.
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("failed to open snapshot at {}", self.path.display()))?;

        let (sql, params) = self.build_query(filter)?;
        let mut stmt = conn.prepare(&sql).context("failed to prepare snapshot scan")?;
        let mut rows = stmt
            .query(rusqlite::params_from_iter(params))
            .context("snapshot scan failed")?;

        let mut records = Vec::new();
        let mut dropped = 0usize;
        while let Some(row) = rows.next()? {
            let raw_ts = value_string(row.get::<_, Value>(0)?);
            let Some(timestamp) = parse_timestamp(&raw_ts) else {
                dropped += 1;
                continue;
            };
            records.push(LaundryRecord {
                timestamp,
                machine_id: value_i64(row.get::<_, Value>(1)?),
                line_id: value_string(row.get::<_, Value>(2)?),
                pieces_in: value_f64(row.get::<_, Value>(3)?).unwrap_or(0.0),
                pieces_out: value_f64(row.get::<_, Value>(4)?).unwrap_or(0.0),
                efficiency_in: value_f64(row.get::<_, Value>(5)?),
                efficiency_out: value_f64(row.get::<_, Value>(6)?),
                operating_time: value_f64(row.get::<_, Value>(7)?).unwrap_or(0.0),
                idle_time: value_f64(row.get::<_, Value>(8)?).unwrap_or(0.0),
            });
        }
        if dropped > 0 {
            tracing::debug!(dropped, "skipped rows with unparseable timestamps");
        }
        Ok(records)
    }

    fn preview_columns(&self) -> Vec<String> {
        self.schema.column_order()
    }
}

/// Structural validation: the file opens as SQLite, the expected table
/// exists, and a row count succeeds. Returns the row count.
pub fn verify_integrity(path: &Path, table: &str) -> Result<u64, SnapshotError> {
    let quoted = quote_ident(table).map_err(|e| SnapshotError::Corrupt(e.to_string()))?;
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| SnapshotError::Corrupt(format!("cannot open: {e}")))?;

    let tables: u64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )
        .map_err(|e| SnapshotError::Corrupt(format!("not a readable database: {e}")))?;
    if tables == 0 {
        return Err(SnapshotError::Corrupt(format!("missing table {table}")));
    }

    conn.query_row(&format!("SELECT COUNT(*) FROM {quoted}"), [], |row| {
        row.get(0)
    })
    .map_err(|e| SnapshotError::Corrupt(format!("table {table} is unreadable: {e}")))
}

/// Configured identifiers are quoted into SQL, so restrict them to names that
/// cannot terminate the quoting.
fn quote_ident(name: &str) -> anyhow::Result<String> {
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        anyhow::bail!("invalid identifier in schema config: {name:?}");
    }
    Ok(format!("\"{name}\""))
}

/// Vendor snapshots store timestamps as text in a few shapes; a date-only
/// value means midnight.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts);
        }
    }
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn value_string(value: Value) -> String {
    match value {
        Value::Text(s) => s,
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Null => String::new(),
        Value::Blob(_) => String::new(),
    }
}

fn value_i64(value: Value) -> i64 {
    match value {
        Value::Integer(i) => i,
        Value::Real(f) => f as i64,
        Value::Text(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn value_f64(value: Value) -> Option<f64> {
    match value {
        Value::Real(f) => Some(f),
        Value::Integer(i) => Some(i as f64),
        Value::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

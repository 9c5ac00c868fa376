use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

/// Metadata for one finished compression run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionRecord {
    pub id: String,
    pub original_file: String,
    pub compressed_file: String,
    /// Kilobytes (bytes / 1000)
    pub original_size_kb: f64,
    pub compressed_size_kb: f64,
    pub k: usize,
    /// original_size / compressed_size, rounded to two decimals
    pub reduced_by: f64,
    pub created_at: DateTime<Utc>,
}

impl CompressionRecord {
    /// Build a record from raw byte sizes with a fresh id and timestamp
    pub fn new(
        original_file: impl Into<String>,
        compressed_file: impl Into<String>,
        original_bytes: u64,
        compressed_bytes: u64,
        k: usize,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            original_file: original_file.into(),
            compressed_file: compressed_file.into(),
            original_size_kb: original_bytes as f64 / 1000.0,
            compressed_size_kb: compressed_bytes as f64 / 1000.0,
            k,
            reduced_by: reduction_ratio(original_bytes, compressed_bytes),
            created_at: Utc::now(),
        }
    }
}

/// `original / compressed` rounded to two decimals; 0 when nothing was written
pub fn reduction_ratio(original_bytes: u64, compressed_bytes: u64) -> f64 {
    if compressed_bytes == 0 {
        return 0.0;
    }
    let ratio = original_bytes as f64 / compressed_bytes as f64;
    (ratio * 100.0).round() / 100.0
}

/// Storage for run metadata, injected into the pipeline
pub trait RunStore {
    fn insert_run(&self, record: &CompressionRecord) -> Result<()>;

    /// Most recent runs first
    fn recent_runs(&self, limit: usize) -> Result<Vec<CompressionRecord>>;

    fn get_run(&self, id: &str) -> Result<Option<CompressionRecord>>;

    fn run_count(&self) -> Result<u64>;
}

pub struct SqliteRunStore {
    conn: Connection,
}

const SELECT_COLUMNS: &str = "SELECT id, original_file, compressed_file, original_size_kb, compressed_size_kb, k, reduced_by, created_at FROM compression_runs";

impl SqliteRunStore {
    /// Create a new in-memory database
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to create in-memory database")?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Open (or create) a database file
    pub fn open(path: &str) -> Result<Self> {
        let conn =
            Connection::open(path).context(format!("Failed to open database at {}", path))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r#"
            CREATE TABLE IF NOT EXISTS compression_runs (
                id TEXT PRIMARY KEY,
                original_file TEXT NOT NULL,
                compressed_file TEXT NOT NULL,
                original_size_kb REAL NOT NULL,
                compressed_size_kb REAL NOT NULL,
                k INTEGER NOT NULL,
                reduced_by REAL NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_runs_created ON compression_runs(created_at);
            "#,
            )
            .context("Failed to initialize database schema")?;
        Ok(())
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<CompressionRecord> {
    let k: i64 = row.get(5)?;
    let created_at: String = row.get(7)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);

    Ok(CompressionRecord {
        id: row.get(0)?,
        original_file: row.get(1)?,
        compressed_file: row.get(2)?,
        original_size_kb: row.get(3)?,
        compressed_size_kb: row.get(4)?,
        k: k as usize,
        reduced_by: row.get(6)?,
        created_at,
    })
}

impl RunStore for SqliteRunStore {
    fn insert_run(&self, record: &CompressionRecord) -> Result<()> {
        // Fixed-width timestamps keep text ordering chronological
        let created_at = record.created_at.to_rfc3339_opts(SecondsFormat::Micros, true);

        self.conn
            .execute(
                "INSERT INTO compression_runs (id, original_file, compressed_file, original_size_kb, compressed_size_kb, k, reduced_by, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id,
                    record.original_file,
                    record.compressed_file,
                    record.original_size_kb,
                    record.compressed_size_kb,
                    record.k as i64,
                    record.reduced_by,
                    created_at
                ],
            )
            .context(format!("Failed to insert run: {}", record.id))?;
        Ok(())
    }

    fn recent_runs(&self, limit: usize) -> Result<Vec<CompressionRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "{} ORDER BY created_at DESC, rowid DESC LIMIT ?1",
                SELECT_COLUMNS
            ))
            .context("Failed to prepare statement")?;

        let runs = stmt
            .query_map(params![limit as i64], record_from_row)
            .context("Failed to query runs")?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to collect runs")?;

        Ok(runs)
    }

    fn get_run(&self, id: &str) -> Result<Option<CompressionRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} WHERE id = ?1", SELECT_COLUMNS))
            .context("Failed to prepare statement")?;

        let mut rows = stmt.query(params![id]).context("Failed to query run")?;

        match rows.next().context("Failed to get next row")? {
            Some(row) => Ok(Some(record_from_row(row).context("Failed to read run")?)),
            None => Ok(None),
        }
    }

    fn run_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM compression_runs", [], |row| row.get(0))
            .context("Failed to count runs")?;
        Ok(count as u64)
    }
}

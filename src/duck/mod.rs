// src/duck/mod.rs
//! Append-only DuckDB destination.

use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use duckdb::{params, Connection};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

pub mod load;

pub use load::{BatchLoad, LoadInfo};

/// Column stamped on every appended row with the run's load id.
pub const LOAD_ID_COLUMN: &str = "_load_id";

/// Per-run bookkeeping table, one row per completed load.
pub const LOADS_TABLE: &str = "_loads";

/// What a single append did to the destination table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Appended {
    pub rows: usize,
    pub columns_added: Vec<String>,
}

/// A DuckDB database holding one dataset (schema) of append-only tables.
pub struct DuckSink {
    conn: Connection,
    path: Option<PathBuf>,
    dataset: String,
}

impl DuckSink {
    /// Open (or create) the database file at `path` and make sure `dataset` exists.
    pub fn open(path: impl AsRef<Path>, dataset: &str) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("opening DuckDB at {}", path.display()))?;
        Self::init(conn, Some(path.to_path_buf()), dataset)
    }

    pub fn open_in_memory(dataset: &str) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, None, dataset)
    }

    fn init(conn: Connection, path: Option<PathBuf>, dataset: &str) -> Result<Self> {
        let sink = Self {
            conn,
            path,
            dataset: dataset.to_string(),
        };
        sink.conn
            .execute_batch(&format!("CREATE SCHEMA IF NOT EXISTS {};", quote(dataset)))
            .with_context(|| format!("creating dataset {}", dataset))?;
        sink.conn
            .execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    load_id VARCHAR,
                    pipeline_name VARCHAR,
                    table_name VARCHAR,
                    row_count BIGINT,
                    status VARCHAR,
                    inserted_at TIMESTAMP
                );",
                sink.qualified(LOADS_TABLE)
            ))
            .context("creating load bookkeeping table")?;
        Ok(sink)
    }

    /// Human-readable destination, the file path or `:memory:`.
    pub fn destination(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ":memory:".to_string())
    }

    /// Append `batch` to `table`, creating the table on first use and adding any new columns.
    /// Existing rows are never touched. An empty batch is a no-op.
    #[instrument(level = "info", skip(self, batch), fields(rows = batch.num_rows()))]
    pub fn append(&self, table: &str, batch: &RecordBatch, load_id: &str) -> Result<Appended> {
        if batch.num_rows() == 0 {
            debug!("empty batch, nothing to append");
            return Ok(Appended::default());
        }

        let staged = stage_parquet_in(&env::temp_dir(), batch)?;
        let source = format!(
            "read_parquet('{}')",
            staged.path().display().to_string().replace('\'', "''")
        );
        let target = self.qualified(table);

        // 1) create from the staged file's schema on first use
        if !self.table_exists(table)? {
            self.conn
                .execute_batch(&format!(
                    "CREATE TABLE {target} AS \
                     SELECT *, CAST(NULL AS VARCHAR) AS {load_col} FROM {source} LIMIT 0;",
                    load_col = quote(LOAD_ID_COLUMN),
                ))
                .with_context(|| format!("creating {}", target))?;
            info!(table = %target, "created table");
        }

        // 2) evolve: add columns the table hasn't seen yet
        let existing: HashSet<String> = self
            .columns(table)?
            .into_iter()
            .map(|c| c.to_lowercase())
            .collect();
        let mut columns_added = Vec::new();
        for (name, ty) in self.describe(&source)? {
            if !existing.contains(&name.to_lowercase()) {
                self.conn
                    .execute_batch(&format!(
                        "ALTER TABLE {target} ADD COLUMN {} {ty};",
                        quote(&name)
                    ))
                    .with_context(|| format!("adding column {} to {}", name, target))?;
                info!(table = %target, column = %name, column_type = %ty, "added column");
                columns_added.push(name);
            }
        }

        // 3) append by name, stamped with the load id
        self.conn
            .execute(
                &format!(
                    "INSERT INTO {target} BY NAME \
                     SELECT *, CAST(? AS VARCHAR) AS {load_col} FROM {source};",
                    load_col = quote(LOAD_ID_COLUMN),
                ),
                params![load_id],
            )
            .with_context(|| format!("appending to {}", target))?;

        Ok(Appended {
            rows: batch.num_rows(),
            columns_added,
        })
    }

    /// Record a finished run in the bookkeeping table.
    pub fn record_load(&self, info: &LoadInfo, status: &str) -> Result<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO {} VALUES (?, ?, ?, ?, ?, CAST(? AS TIMESTAMP));",
                    self.qualified(LOADS_TABLE)
                ),
                params![
                    info.load_id,
                    info.pipeline_name,
                    info.table_name,
                    info.rows_appended() as i64,
                    status,
                    info.finished_at
                        .unwrap_or(info.started_at)
                        .naive_utc()
                        .format("%Y-%m-%d %H:%M:%S%.6f")
                        .to_string(),
                ],
            )
            .context("recording load")?;
        Ok(())
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_schema = ? AND table_name = ?",
            params![self.dataset, table],
            |r| r.get(0),
        )?;
        Ok(n > 0)
    }

    /// Column names of `table`, in table order.
    pub fn columns(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT column_name FROM information_schema.columns \
             WHERE table_schema = ? AND table_name = ? ORDER BY ordinal_position",
        )?;
        let names = stmt
            .query_map(params![self.dataset, table], |r| r.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    pub fn row_count(&self, table: &str) -> Result<i64> {
        let n = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.qualified(table)),
            [],
            |r| r.get(0),
        )?;
        Ok(n)
    }

    /// Borrow the connection for ad-hoc reads.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn describe(&self, source: &str) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare(&format!("DESCRIBE SELECT * FROM {source}"))?;
        let cols = stmt
            .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cols)
    }

    fn qualified(&self, table: &str) -> String {
        format!("{}.{}", quote(&self.dataset), quote(table))
    }
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Write `batch` to a temp parquet file under `dir` that DuckDB can scan; removed when dropped.
fn stage_parquet_in(dir: &Path, batch: &RecordBatch) -> Result<NamedTempFile> {
    let staged = tempfile::Builder::new()
        .prefix("append-")
        .suffix(".parquet")
        .tempfile_in(dir)
        .context("creating staging file")?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(staged.reopen()?, batch.schema(), Some(props))
        .context("creating Arrow writer for staging")?;
    writer.write(batch).context("writing staging batch")?;
    writer.close().context("closing staging writer")?;
    Ok(staged)
}

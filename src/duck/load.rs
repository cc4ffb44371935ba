// src/duck/load.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use super::Appended;
use crate::fetch::{MonthBatch, MonthKey};
use crate::process::CleaningReport;

/// One month's contribution to a load.
#[derive(Debug, Clone, Serialize)]
pub struct BatchLoad {
    pub month: String,
    pub raw_rows: usize,
    pub rows_appended: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns_added: Vec<String>,
    pub cleaning: CleaningReport,
}

impl BatchLoad {
    pub fn new(batch: &MonthBatch, appended: Appended) -> Self {
        Self {
            month: batch.key.to_string(),
            raw_rows: batch.raw_rows,
            rows_appended: appended.rows,
            columns_added: appended.columns_added,
            cleaning: batch.report.clone(),
        }
    }
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct LoadInfo {
    pub pipeline_name: String,
    pub dataset_name: String,
    pub table_name: String,
    pub destination: String,
    pub load_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub batches: Vec<BatchLoad>,
    /// Months attempted that produced nothing.
    pub skipped: Vec<String>,
}

impl LoadInfo {
    pub fn start(
        pipeline_name: &str,
        dataset_name: &str,
        table_name: &str,
        destination: String,
    ) -> Self {
        let started_at = Utc::now();
        Self {
            pipeline_name: pipeline_name.to_string(),
            dataset_name: dataset_name.to_string(),
            table_name: table_name.to_string(),
            destination,
            load_id: load_id(started_at),
            started_at,
            finished_at: None,
            batches: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn push(&mut self, batch: BatchLoad) {
        self.batches.push(batch);
    }

    /// Close the load; any of `attempted` without a batch is recorded as skipped.
    pub fn finish(&mut self, attempted: impl IntoIterator<Item = MonthKey>) {
        self.skipped = attempted
            .into_iter()
            .map(|k| k.to_string())
            .filter(|label| !self.batches.iter().any(|b| &b.month == label))
            .collect();
        self.finished_at = Some(Utc::now());
    }

    pub fn rows_appended(&self) -> usize {
        self.batches.iter().map(|b| b.rows_appended).sum()
    }
}

/// Seconds since the epoch with microsecond precision, e.g. `1735718400.123456`.
fn load_id(at: DateTime<Utc>) -> String {
    at.format("%s%.6f").to_string()
}

impl fmt::Display for LoadInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Pipeline {} load {} into {}.{} at {}",
            self.pipeline_name, self.load_id, self.dataset_name, self.table_name, self.destination
        )?;
        writeln!(
            f,
            "{} batch(es), {} row(s) appended",
            self.batches.len(),
            self.rows_appended()
        )?;
        for b in &self.batches {
            writeln!(
                f,
                "  {}: {} fetched, {} appended",
                b.month, b.raw_rows, b.rows_appended
            )?;
        }
        if !self.skipped.is_empty() {
            write!(f, "skipped: {}", self.skipped.join(", "))?;
        }
        Ok(())
    }
}

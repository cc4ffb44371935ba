// src/fetch/months.rs

use arrow::record_batch::RecordBatch;
use futures::stream::{self, Stream};
use tracing::info;

use super::{Fetcher, MonthKey};
use crate::process::{clean, CleanError, CleaningReport};

/// One month's cleaned trips, ready to append.
#[derive(Debug, Clone)]
pub struct MonthBatch {
    pub key: MonthKey,
    pub raw_rows: usize,
    pub table: RecordBatch,
    pub report: CleaningReport,
}

impl Fetcher {
    /// Fetch and clean every month of `year`, in order, one at a time.
    ///
    /// Months that fail to download or parse are logged and skipped, so the stream holds at
    /// most twelve items. A cleaning failure is yielded as an error and should end the run.
    /// The stream is single-use: draining it again means calling `months` again.
    pub fn months(&self, year: i32) -> impl Stream<Item = Result<MonthBatch, CleanError>> + '_ {
        stream::unfold(MonthKey::year(year), move |mut keys| async move {
            while let Some(key) = keys.next() {
                let raw = match self.fetch(key).await {
                    Ok(raw) => raw,
                    Err(e) => {
                        e.log();
                        continue;
                    }
                };

                let item = clean(&raw).map(|(table, report)| {
                    info!(
                        month = %key,
                        "✓ {} cleaned - {} rows after cleaning",
                        key.file_name(),
                        table.num_rows()
                    );
                    MonthBatch {
                        key,
                        raw_rows: raw.num_rows(),
                        table,
                        report,
                    }
                });
                return Some((item, keys));
            }
            None
        })
    }
}

// src/fetch/staging.rs

use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::errors::{ParquetError, Result as ParquetResult};
use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::debug;

use super::FetchError;

/// Write the downloaded payload to a scoped temp file and read it back as one table.
/// The temp file is removed when this returns, whichever way it returns.
pub(crate) fn stage_and_read(file_name: &str, payload: &[u8]) -> Result<RecordBatch, FetchError> {
    stage_and_read_in(&env::temp_dir(), file_name, payload)
}

/// [`stage_and_read`], staging under `dir`.
pub(crate) fn stage_and_read_in(
    dir: &Path,
    file_name: &str,
    payload: &[u8],
) -> Result<RecordBatch, FetchError> {
    let io_err = |source| FetchError::Io {
        file: file_name.to_string(),
        source,
    };

    let stem = file_name.trim_end_matches(".parquet");
    let mut staged = tempfile::Builder::new()
        .prefix(stem)
        .suffix(".parquet")
        .tempfile_in(dir)
        .map_err(io_err)?;
    staged.write_all(payload).map_err(io_err)?;
    staged.flush().map_err(io_err)?;
    debug!(path = %staged.path().display(), bytes = payload.len(), "staged payload");

    let reopened = staged.reopen().map_err(io_err)?;
    read_parquet(reopened).map_err(|source| FetchError::Parse {
        file: file_name.to_string(),
        source,
    })
}

/// Read every row group of a parquet file into a single record batch.
pub fn read_parquet(file: File) -> ParquetResult<RecordBatch> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let batches = builder
        .build()?
        .collect::<Result<Vec<_>, _>>()
        .map_err(ParquetError::from)?;
    Ok(concat_batches(&schema, &batches)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{parquet_bytes, trips, TripRow};
    use anyhow::Result;

    #[test]
    fn reads_back_what_was_written() -> Result<()> {
        let batch = trips(&vec![TripRow::valid(); 3]);
        let table = stage_and_read("yellow_tripdata_2025-01.parquet", &parquet_bytes(&batch)?)?;
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.schema().fields(), batch.schema().fields());
        Ok(())
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = stage_and_read("yellow_tripdata_2025-01.parquet", b"<html>oops</html>")
            .expect_err("not parquet");
        assert!(matches!(err, FetchError::Parse { .. }), "{err}");
    }

    #[test]
    fn staging_dir_is_empty_after_a_good_payload() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let payload = parquet_bytes(&trips(&vec![TripRow::valid(); 2]))?;

        let table = stage_and_read_in(dir.path(), "yellow_tripdata_2025-02.parquet", &payload)?;
        assert_eq!(table.num_rows(), 2);
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn staging_dir_is_empty_after_a_parse_error() -> Result<()> {
        let dir = tempfile::tempdir()?;

        let err = stage_and_read_in(
            dir.path(),
            "yellow_tripdata_2025-02.parquet",
            b"<html>oops</html>",
        )
        .expect_err("not parquet");
        assert!(matches!(err, FetchError::Parse { .. }), "{err}");
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }
}

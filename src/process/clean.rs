// src/process/clean.rs

use arrow::array::{Array, ArrayRef, AsArray, BooleanArray, Float64Array};
use arrow::compute::kernels::cmp::lt;
use arrow::compute::{and, cast, filter_record_batch, is_not_null};
use arrow::datatypes::{DataType, Float64Type};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use thiserror::Error;
use tracing::{info, instrument};

use super::columns::{
    CRITICAL, DROPOFF_DATETIME, FARE_AMOUNT, MAX_PASSENGERS, NON_NEGATIVE, PASSENGER_COUNT,
    PICKUP_DATETIME, TRIP_DISTANCE,
};
use super::report::{CleaningReport, Stage};

#[derive(Debug, Error)]
pub enum CleanError {
    /// A column compared against numeric bounds holds something else.
    #[error("column {column} has non-numeric type {data_type}")]
    NotNumeric { column: String, data_type: DataType },

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),
}

/// Drop invalid trips from `table`, returning the surviving rows and what each stage removed.
///
/// Stages run in a fixed order and each only sees rows kept by the previous one:
/// 1. completeness of the critical columns (null or NaN counts as missing),
/// 2. non-negativity of the monetary / count columns, one column at a time,
/// 3. zero distance with a positive fare,
/// 4. passenger count outside `(0, 8]`,
/// 5. pickup not strictly before dropoff.
///
/// A stage whose columns are absent from the schema is skipped. Columns are never coerced:
/// a non-numeric column in a numeric check is an error.
#[instrument(level = "info", skip(table), fields(rows = table.num_rows()))]
pub fn clean(table: &RecordBatch) -> Result<(RecordBatch, CleaningReport), CleanError> {
    let mut report = CleaningReport::new(table.num_rows());
    info!("cleaning - initial rows: {}", report.initial_rows);

    // 1) completeness
    let keep = completeness_mask(table)?;
    let mut table = apply(table, &keep, &mut report, Stage::Completeness, None)?;
    info!(
        "after dropping missing values: {} rows ({} removed)",
        report.final_rows,
        report.removed_by(Stage::Completeness)
    );

    // 2) non-negativity
    for name in NON_NEGATIVE {
        if let Some(values) = numeric_column(&table, name)? {
            let keep = keep_where(&values, |v| v >= 0.0);
            table = apply(&table, &keep, &mut report, Stage::NonNegative, Some(name))?;
        }
    }

    // 3) zero distance but charged
    if let (Some(distance), Some(fare)) = (
        numeric_column(&table, TRIP_DISTANCE)?,
        numeric_column(&table, FARE_AMOUNT)?,
    ) {
        let keep: BooleanArray = distance
            .iter()
            .zip(fare.iter())
            .map(|pair| match pair {
                (Some(d), Some(f)) => Some(!(d == 0.0 && f > 0.0)),
                _ => Some(true),
            })
            .collect();
        table = apply(&table, &keep, &mut report, Stage::Fraud, None)?;
    }

    // 4) passenger count
    if let Some(passengers) = numeric_column(&table, PASSENGER_COUNT)? {
        let keep = keep_where(&passengers, |p| p > 0.0 && p <= MAX_PASSENGERS);
        table = apply(&table, &keep, &mut report, Stage::PassengerCount, None)?;
    }

    // 5) pickup strictly before dropoff
    if let (Some(pickup), Some(dropoff)) = (
        table.column_by_name(PICKUP_DATETIME),
        table.column_by_name(DROPOFF_DATETIME),
    ) {
        let keep = lt(pickup, dropoff)?;
        table = apply(&table, &keep, &mut report, Stage::Temporal, None)?;
    }

    info!(
        "cleaning done - final rows: {} ({} removed in total)",
        report.final_rows,
        report.total_removed()
    );
    Ok((table, report))
}

fn apply(
    table: &RecordBatch,
    keep: &BooleanArray,
    report: &mut CleaningReport,
    stage: Stage,
    column: Option<&str>,
) -> Result<RecordBatch, CleanError> {
    let filtered = filter_record_batch(table, keep)?;
    let removed = table.num_rows() - filtered.num_rows();
    report.record(stage, column, removed);

    if removed > 0 {
        match stage {
            Stage::Completeness => {}
            Stage::NonNegative => info!(
                column = column.unwrap_or_default(),
                removed, "negative values removed"
            ),
            Stage::Fraud => info!(removed, "suspect trips removed (distance=0, fare>0)"),
            Stage::PassengerCount => info!(removed, "invalid passenger count removed"),
            Stage::Temporal => info!(removed, "pickup not before dropoff removed"),
        }
    }
    Ok(filtered)
}

fn completeness_mask(table: &RecordBatch) -> Result<BooleanArray, CleanError> {
    let mut keep = BooleanArray::from(vec![true; table.num_rows()]);
    for name in CRITICAL {
        if let Some(array) = table.column_by_name(name) {
            keep = and(&keep, &has_value(array)?)?;
        }
    }
    Ok(keep)
}

fn has_value(array: &ArrayRef) -> Result<BooleanArray, CleanError> {
    match array.data_type() {
        DataType::Float16 | DataType::Float32 | DataType::Float64 => {
            let values = cast(array, &DataType::Float64)?;
            Ok(values
                .as_primitive::<Float64Type>()
                .iter()
                .map(|v| Some(v.is_some_and(|v| !v.is_nan())))
                .collect())
        }
        _ => Ok(is_not_null(array)?),
    }
}

/// `None` when the column is absent, so the caller skips the stage.
fn numeric_column(table: &RecordBatch, name: &str) -> Result<Option<Float64Array>, CleanError> {
    let Some(array) = table.column_by_name(name) else {
        return Ok(None);
    };
    if !array.data_type().is_numeric() {
        return Err(CleanError::NotNumeric {
            column: name.to_string(),
            data_type: array.data_type().clone(),
        });
    }
    let values = cast(array, &DataType::Float64)?;
    Ok(Some(values.as_primitive::<Float64Type>().clone()))
}

/// Null and NaN never satisfy `pred`.
fn keep_where(values: &Float64Array, pred: impl Fn(f64) -> bool) -> BooleanArray {
    values
        .iter()
        .map(|v| Some(v.is_some_and(&pred)))
        .collect()
}

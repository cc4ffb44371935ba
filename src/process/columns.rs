// src/process/columns.rs
//! Column names used by the TLC yellow taxi files.

pub const PICKUP_DATETIME: &str = "tpep_pickup_datetime";
pub const DROPOFF_DATETIME: &str = "tpep_dropoff_datetime";
pub const PASSENGER_COUNT: &str = "passenger_count";
pub const TRIP_DISTANCE: &str = "trip_distance";
pub const FARE_AMOUNT: &str = "fare_amount";
pub const EXTRA: &str = "extra";
pub const MTA_TAX: &str = "mta_tax";
pub const TIP_AMOUNT: &str = "tip_amount";
pub const TOLLS_AMOUNT: &str = "tolls_amount";
pub const TOTAL_AMOUNT: &str = "total_amount";

/// A row missing any of these is unusable.
pub const CRITICAL: [&str; 5] = [
    PICKUP_DATETIME,
    DROPOFF_DATETIME,
    PASSENGER_COUNT,
    TRIP_DISTANCE,
    FARE_AMOUNT,
];

/// Checked for negative values, in this order.
pub const NON_NEGATIVE: [&str; 8] = [
    PASSENGER_COUNT,
    TRIP_DISTANCE,
    FARE_AMOUNT,
    EXTRA,
    MTA_TAX,
    TIP_AMOUNT,
    TOLLS_AMOUNT,
    TOTAL_AMOUNT,
];

/// Largest passenger count treated as plausible.
pub const MAX_PASSENGERS: f64 = 8.0;

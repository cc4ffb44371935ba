// src/fetch/urls.rs

use anyhow::{ensure, Result};
use std::fmt;

/// One published file: a (year, month) pair with the month in `1..=12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        ensure!((1..=12).contains(&month), "month {} outside 1..=12", month);
        Ok(Self { year, month })
    }

    /// Every month of `year`, January first.
    pub fn year(year: i32) -> impl Iterator<Item = MonthKey> {
        (1..=12).map(move |month| MonthKey { year, month })
    }

    pub fn year_number(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// e.g. `yellow_tripdata_2025-01.parquet`
    pub fn file_name(&self) -> String {
        format!("yellow_tripdata_{}-{:02}.parquet", self.year, self.month)
    }

    /// Locator of this month's file under `base_url`.
    pub fn url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.file_name())
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

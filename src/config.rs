// src/config.rs

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Year processed when nothing else is configured.
pub const DEFAULT_YEAR: i32 = 2025;

/// Where the TLC publishes the monthly trip files.
pub const BASE_URL: &str = "https://d37ci6vzurychx.cloudfront.net/trip-data";

pub const PIPELINE_NAME: &str = "nyc_taxi_pipeline";
pub const DATASET_NAME: &str = "nyc_taxi_data";
pub const TABLE_NAME: &str = "yellow_taxi_trips";

/// Upper bound on a single month's download.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Everything the pipeline needs to know about one run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfig {
    pub year: i32,
    pub base_url: String,
    pub pipeline_name: String,
    pub dataset_name: String,
    pub table_name: String,
    pub timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            year: DEFAULT_YEAR,
            base_url: BASE_URL.to_string(),
            pipeline_name: PIPELINE_NAME.to_string(),
            dataset_name: DATASET_NAME.to_string(),
            table_name: TABLE_NAME.to_string(),
            timeout: REQUEST_TIMEOUT,
        }
    }
}

impl PipelineConfig {
    /// The DuckDB file backing the destination, named after the pipeline.
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.duckdb", self.pipeline_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_published_layout() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.year, 2025);
        assert_eq!(cfg.table_name, "yellow_taxi_trips");
        assert_eq!(cfg.dataset_name, "nyc_taxi_data");
        assert_eq!(cfg.timeout, Duration::from_secs(60));
        assert_eq!(cfg.database_path(), PathBuf::from("nyc_taxi_pipeline.duckdb"));
    }
}

// src/pipeline.rs

use anyhow::{Context, Result};
use futures::{pin_mut, StreamExt};
use tracing::{info, instrument};

use crate::config::PipelineConfig;
use crate::duck::{BatchLoad, DuckSink, LoadInfo};
use crate::fetch::{Fetcher, MonthKey};

/// Fetch, clean and append every month of the configured year.
pub struct Pipeline {
    config: PipelineConfig,
    fetcher: Fetcher,
    sink: DuckSink,
}

impl Pipeline {
    /// Build the fetcher and open the database file named after the pipeline.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let fetcher = Fetcher::new(config.base_url.clone(), config.timeout)?;
        let sink = DuckSink::open(config.database_path(), &config.dataset_name)?;
        Ok(Self::from_parts(config, fetcher, sink))
    }

    pub fn from_parts(config: PipelineConfig, fetcher: Fetcher, sink: DuckSink) -> Self {
        Self {
            config,
            fetcher,
            sink,
        }
    }

    pub fn sink(&self) -> &DuckSink {
        &self.sink
    }

    /// Runs all twelve months. Months that cannot be fetched are skipped; a cleaning or
    /// append failure ends the run with an error.
    #[instrument(level = "info", skip(self), fields(pipeline = %self.config.pipeline_name, year = self.config.year))]
    pub async fn run(&self) -> Result<LoadInfo> {
        let cfg = &self.config;
        let mut load = LoadInfo::start(
            &cfg.pipeline_name,
            &cfg.dataset_name,
            &cfg.table_name,
            self.sink.destination(),
        );
        info!(load_id = %load.load_id, "starting pipeline");

        let months = self.fetcher.months(cfg.year);
        pin_mut!(months);
        while let Some(batch) = months.next().await {
            let batch = batch.context("cleaning failed")?;
            let appended = self
                .sink
                .append(&cfg.table_name, &batch.table, &load.load_id)
                .with_context(|| format!("loading {}", batch.key))?;
            load.push(BatchLoad::new(&batch, appended));
        }

        load.finish(MonthKey::year(cfg.year));
        self.sink.record_load(&load, "completed")?;
        info!(rows = load.rows_appended(), "pipeline finished");
        info!("load info:\n{}", load);
        Ok(load)
    }
}

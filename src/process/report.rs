// src/process/report.rs

use serde::Serialize;

/// The cleaning stages, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Completeness,
    NonNegative,
    Fraud,
    PassengerCount,
    Temporal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageRemoval {
    pub stage: Stage,
    /// Set for the per-column non-negativity checks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub removed: usize,
}

/// Row counts before, during and after cleaning one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub initial_rows: usize,
    pub stages: Vec<StageRemoval>,
    pub final_rows: usize,
}

impl CleaningReport {
    pub fn new(initial_rows: usize) -> Self {
        Self {
            initial_rows,
            stages: Vec::new(),
            final_rows: initial_rows,
        }
    }

    pub(crate) fn record(&mut self, stage: Stage, column: Option<&str>, removed: usize) {
        self.final_rows -= removed;
        self.stages.push(StageRemoval {
            stage,
            column: column.map(str::to_string),
            removed,
        });
    }

    /// Rows removed by every run of `stage`.
    pub fn removed_by(&self, stage: Stage) -> usize {
        self.stages
            .iter()
            .filter(|s| s.stage == stage)
            .map(|s| s.removed)
            .sum()
    }

    pub fn total_removed(&self) -> usize {
        self.initial_rows - self.final_rows
    }
}

use chrono::{DateTime, Utc};
use kiadb_common::{Area, MergedRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Coverage counters for one area run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coverage {
    /// Plot numbers listed by the status service.
    pub expected: usize,
    /// Records found through spatial discovery.
    pub discovered: usize,
    /// Missing plots recovered by exploration.
    pub recovered: usize,
    /// Expected plots still missing at the end of the run.
    pub missing: usize,
    /// Records with a phone number or email address.
    pub contactable: usize,
    /// Codes probed by exploration.
    pub probed: usize,
    /// Spatial batches processed.
    pub batches: usize,
}

/// Everything one area run produced.
#[derive(Debug, Clone)]
pub struct AreaResult {
    pub area: Area,
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub records: Vec<MergedRecord>,
    pub coverage: Coverage,
    /// Expected plot numbers never recovered, sorted.
    pub unrecovered: Vec<String>,
}

impl AreaResult {
    pub fn is_converged(&self) -> bool {
        self.unrecovered.is_empty()
    }

    pub fn summary_row(&self) -> SummaryRow {
        SummaryRow {
            district: self.area.district(),
            area: self.area.industrial_area(),
            total_plots: self.coverage.expected,
            missed_plots: self.coverage.missing,
            contactable_plots: self.coverage.contactable,
        }
    }
}

/// One line of `summary.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    #[serde(rename = "District")]
    pub district: String,
    #[serde(rename = "Area")]
    pub area: String,
    #[serde(rename = "Total Plots")]
    pub total_plots: usize,
    #[serde(rename = "Missed Plots")]
    pub missed_plots: usize,
    #[serde(rename = "Plots with Phone or Email")]
    pub contactable_plots: usize,
}

/// Records collected so far in a run, unique by plot code.
#[derive(Debug, Default)]
pub(crate) struct RecordCollection {
    records: Vec<MergedRecord>,
    codes: HashSet<String>,
    plot_numbers: HashSet<String>,
}

impl RecordCollection {
    /// Returns `false` if a record with the same code was already collected.
    pub(crate) fn push(&mut self, record: MergedRecord) -> bool {
        if !self.codes.insert(record.plotcode().to_string()) {
            return false;
        }
        if let Some(plot_number) = record.plot_number() {
            self.plot_numbers.insert(plot_number.to_string());
        }
        self.records.push(record);
        true
    }

    pub(crate) fn plot_numbers(&self) -> &HashSet<String> {
        &self.plot_numbers
    }

    pub(crate) fn into_records(self) -> Vec<MergedRecord> {
        self.records
    }
}

//! CSV output: one file per area plus a run summary

use anyhow::{Context, Result};
use kiadb_common::MergedRecord;
use std::path::{Path, PathBuf};

use crate::module::orchestrator::{AreaResult, SummaryRow};

const SUMMARY_FILE: &str = "summary.csv";

pub struct CsvSink {
    output_dir: PathBuf,
}

impl CsvSink {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn ensure_output_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir)
            .context(format!("Failed to create output directory {:?}", self.output_dir))
    }

    /// Write `<stem>.csv` for an area. Returns `None` when there is nothing to write.
    pub fn write_area(&self, result: &AreaResult) -> Result<Option<PathBuf>> {
        if result.records.is_empty() {
            tracing::warn!("No data extracted for {}", result.area);
            return Ok(None);
        }

        self.ensure_output_dir()?;
        let path = self.output_dir.join(format!("{}.csv", result.area.stem()));
        write_records(&path, &result.records)?;

        tracing::info!("Data saved to {:?} with {} records", path, result.records.len());
        Ok(Some(path))
    }

    pub fn write_summary(&self, rows: &[SummaryRow]) -> Result<Option<PathBuf>> {
        if rows.is_empty() {
            tracing::warn!("No summary data to save");
            return Ok(None);
        }

        self.ensure_output_dir()?;
        let path = self.output_dir.join(SUMMARY_FILE);
        let mut writer = csv::Writer::from_path(&path)
            .context(format!("Failed to create summary file {:?}", path))?;
        for row in rows {
            writer.serialize(row).context("Failed to write summary row")?;
        }
        writer.flush()?;

        tracing::info!("Summary saved to {:?} with {} areas", path, rows.len());
        Ok(Some(path))
    }
}

fn write_records(path: &Path, records: &[MergedRecord]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).context(format!("Failed to create CSV file {:?}", path))?;
    writer.write_record(MergedRecord::csv_header())?;
    for record in records {
        writer
            .write_record(record.csv_row())
            .context(format!("Failed to write record {}", record.plotcode()))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::orchestrator::Coverage;
    use chrono::Utc;
    use kiadb_common::{Area, RawSourceRecord};
    use serde_json::json;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn result(records: Vec<MergedRecord>) -> AreaResult {
        AreaResult {
            area: Area::from_stem("Ramanagara-Harohalli").unwrap(),
            run_id: Uuid::now_v7(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            records,
            coverage: Coverage::default(),
            unrecovered: Vec::new(),
        }
    }

    #[test]
    fn test_write_area_csv() {
        let dir = TempDir::new().unwrap();
        let sink = CsvSink::new(dir.path().join("out"));

        let mut record = MergedRecord::new("Z0657201630001");
        record.apply_primary(
            &RawSourceRecord::from_value(json!({"plno": "P1", "nmalt": "Acme, Ltd"})).unwrap(),
        );

        let path = sink.write_area(&result(vec![record])).unwrap().unwrap();
        assert!(path.ends_with("Ramanagara-Harohalli.csv"));

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "Plotcode");
        assert_eq!(headers.len(), MergedRecord::csv_header().len());

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        let name_col = headers.iter().position(|h| h == "Name of Allottee").unwrap();
        assert_eq!(&rows[0][name_col], "Acme, Ltd");
    }

    #[test]
    fn test_empty_area_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let sink = CsvSink::new(dir.path());
        assert!(sink.write_area(&result(Vec::new())).unwrap().is_none());
    }

    #[test]
    fn test_write_summary() {
        let dir = TempDir::new().unwrap();
        let sink = CsvSink::new(dir.path());
        let rows = vec![result(Vec::new()).summary_row()];

        let path = sink.write_summary(&rows).unwrap().unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.starts_with(
            "District,Area,Total Plots,Missed Plots,Plots with Phone or Email"
        ));
        assert!(content.contains("Ramanagara,Harohalli,0,0,0"));
    }
}

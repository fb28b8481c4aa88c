//! CSV-based report record repository, one `reports.csv` per user
//! directory. Only the records live here; the generated artifacts are
//! plain files next to them (see `CsvConnection::report_artifact_directory`).

use anyhow::Result;
use chrono::{DateTime, Utc};
use csv::{Reader, Writer};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::connection::CsvConnection;
use crate::domain::models::Report;
use crate::storage::traits::ReportStorage;

const REPORTS_HEADER: &str = "id,user_id,file_path,generated_at";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReportRecord {
    id: String,
    user_id: String,
    file_path: String,
    generated_at: DateTime<Utc>,
}

impl From<&Report> for ReportRecord {
    fn from(report: &Report) -> Self {
        ReportRecord {
            id: report.id.clone(),
            user_id: report.user_id.clone(),
            file_path: report.file_path.clone(),
            generated_at: report.generated_at,
        }
    }
}

impl From<ReportRecord> for Report {
    fn from(record: ReportRecord) -> Self {
        Report {
            id: record.id,
            user_id: record.user_id,
            file_path: record.file_path,
            generated_at: record.generated_at,
        }
    }
}

#[derive(Clone)]
pub struct ReportRepository {
    connection: CsvConnection,
}

impl ReportRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn file_path(&self, user_id: &str) -> Result<std::path::PathBuf> {
        Ok(self.connection.user_directory(user_id)?.join("reports.csv"))
    }

    fn read_reports(&self, user_id: &str) -> Result<Vec<Report>> {
        let path = self.file_path(user_id)?;
        self.connection.ensure_file_exists(&path, REPORTS_HEADER)?;

        let mut reader = Reader::from_path(&path)?;
        let mut reports = Vec::new();

        for result in reader.deserialize::<ReportRecord>() {
            match result {
                Ok(record) => reports.push(Report::from(record)),
                Err(e) => warn!("Failed to read report record: {}. Skipping.", e),
            }
        }

        Ok(reports)
    }

    fn write_reports(&self, user_id: &str, reports: &[Report]) -> Result<()> {
        let mut writer = Writer::from_writer(Vec::new());
        for report in reports {
            writer.serialize(ReportRecord::from(report))?;
        }
        let data = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush reports CSV: {}", e))?;

        self.connection.write_atomic(&self.file_path(user_id)?, &data)
    }
}

impl ReportStorage for ReportRepository {
    fn store_report(&self, report: &Report) -> Result<()> {
        let mut reports = self.read_reports(&report.user_id)?;
        reports.push(report.clone());
        self.write_reports(&report.user_id, &reports)
    }

    fn get_report(&self, user_id: &str, report_id: &str) -> Result<Option<Report>> {
        Ok(self
            .read_reports(user_id)?
            .into_iter()
            .find(|r| r.id == report_id))
    }

    fn list_reports(&self, user_id: &str) -> Result<Vec<Report>> {
        let mut reports = self.read_reports(user_id)?;
        reports.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));
        Ok(reports)
    }

    fn delete_report(&self, user_id: &str, report_id: &str) -> Result<bool> {
        let mut reports = self.read_reports(user_id)?;
        let before = reports.len();
        reports.retain(|r| r.id != report_id);
        if reports.len() == before {
            return Ok(false);
        }
        self.write_reports(user_id, &reports)?;
        Ok(true)
    }
}

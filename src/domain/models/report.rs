//! Domain model for a generated financial report.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable record of a generated report artifact. Deleting the record
/// also removes the file at `file_path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub user_id: String,
    pub file_path: String,
    pub generated_at: DateTime<Utc>,
}

impl Report {
    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

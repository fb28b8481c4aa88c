//! CSV storage connection.
//!
//! `CsvConnection` manages file paths under a base data directory and
//! ensures the per-user CSV files exist before they are read.
//!
//! ## File Structure
//!
//! ```text
//! data/
//! ├── users.csv
//! └── {user_id}/
//!     ├── transactions.csv
//!     ├── budgets.csv
//!     ├── goals.csv
//!     ├── reports.csv
//!     └── reports/          ← generated report artifacts
//! ```

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Clone)]
pub struct CsvConnection {
    base_directory: Arc<PathBuf>,
}

impl CsvConnection {
    /// Create a new CSV connection with a base directory
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
        }

        Ok(Self {
            base_directory: Arc::new(base_path),
        })
    }

    /// Path of the store-wide users file
    pub fn users_file_path(&self) -> PathBuf {
        self.base_directory.join("users.csv")
    }

    /// Get the directory path for a user's data, creating it on demand
    pub fn user_directory(&self, user_id: &str) -> Result<PathBuf> {
        let dir = self.base_directory.join(user_id);
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(dir)
    }

    /// Directory holding a user's generated report artifacts
    pub fn report_artifact_directory(&self, user_id: &str) -> Result<PathBuf> {
        let dir = self.user_directory(user_id)?.join("reports");
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(dir)
    }

    /// List the IDs of all users that have a data directory
    pub fn list_user_directories(&self) -> Result<Vec<String>> {
        let mut user_ids = Vec::new();
        for entry in fs::read_dir(self.base_directory.as_ref())? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    user_ids.push(name.to_string());
                }
            }
        }
        user_ids.sort();
        Ok(user_ids)
    }

    /// Ensure a CSV file exists with the given header line
    pub fn ensure_file_exists(&self, path: &Path, header: &str) -> Result<()> {
        if !path.exists() {
            fs::write(path, format!("{}\n", header))?;
        }
        Ok(())
    }

    /// Atomically replace `path` with `contents` via a temp file rename
    pub fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let temp_path = path.with_extension("csv.tmp");
        fs::write(&temp_path, contents)?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_user_directory_created_on_demand() {
        let temp = tempdir().unwrap();
        let conn = CsvConnection::new(temp.path()).unwrap();

        let dir = conn.user_directory("user-1").unwrap();
        assert!(dir.exists());
        assert_eq!(conn.list_user_directories().unwrap(), vec!["user-1"]);
    }

    #[test]
    fn test_users_file_not_listed_as_directory() {
        let temp = tempdir().unwrap();
        let conn = CsvConnection::new(temp.path()).unwrap();

        conn.ensure_file_exists(&conn.users_file_path(), "id,username,email,role")
            .unwrap();
        assert!(conn.list_user_directories().unwrap().is_empty());
    }

    #[test]
    fn test_write_atomic_replaces_contents() {
        let temp = tempdir().unwrap();
        let conn = CsvConnection::new(temp.path()).unwrap();
        let path = temp.path().join("sample.csv");

        conn.write_atomic(&path, b"first").unwrap();
        conn.write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert!(!path.with_extension("csv.tmp").exists());
    }
}

//! CSV-based goal repository, one `goals.csv` per user directory.

use anyhow::Result;
use chrono::{DateTime, Utc};
use csv::{Reader, Writer};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::connection::CsvConnection;
use crate::domain::models::Goal;
use crate::storage::traits::GoalStorage;

const GOALS_HEADER: &str =
    "id,user_id,name,target_amount,current_amount,deadline,allocation_percentage";

/// CSV record structure for goals
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GoalRecord {
    id: String,
    user_id: String,
    name: String,
    target_amount: f64,
    current_amount: f64,
    deadline: DateTime<Utc>,
    allocation_percentage: f64,
}

impl From<&Goal> for GoalRecord {
    fn from(goal: &Goal) -> Self {
        GoalRecord {
            id: goal.id.clone(),
            user_id: goal.user_id.clone(),
            name: goal.name.clone(),
            target_amount: goal.target_amount,
            current_amount: goal.current_amount,
            deadline: goal.deadline,
            allocation_percentage: goal.allocation_percentage,
        }
    }
}

impl From<GoalRecord> for Goal {
    fn from(record: GoalRecord) -> Self {
        Goal {
            id: record.id,
            user_id: record.user_id,
            name: record.name,
            target_amount: record.target_amount,
            current_amount: record.current_amount,
            deadline: record.deadline,
            allocation_percentage: record.allocation_percentage,
        }
    }
}

/// CSV-based goal repository
#[derive(Clone)]
pub struct GoalRepository {
    connection: CsvConnection,
}

impl GoalRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn file_path(&self, user_id: &str) -> Result<std::path::PathBuf> {
        Ok(self.connection.user_directory(user_id)?.join("goals.csv"))
    }

    fn read_goals(&self, user_id: &str) -> Result<Vec<Goal>> {
        let path = self.file_path(user_id)?;
        self.connection.ensure_file_exists(&path, GOALS_HEADER)?;

        let mut reader = Reader::from_path(&path)?;
        let mut goals = Vec::new();

        for result in reader.deserialize::<GoalRecord>() {
            match result {
                Ok(record) => goals.push(Goal::from(record)),
                Err(e) => warn!("Failed to read goal record: {}. Skipping.", e),
            }
        }

        Ok(goals)
    }

    fn write_goals(&self, user_id: &str, goals: &[Goal]) -> Result<()> {
        let mut writer = Writer::from_writer(Vec::new());
        for goal in goals {
            writer.serialize(GoalRecord::from(goal))?;
        }
        let data = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush goals CSV: {}", e))?;

        self.connection.write_atomic(&self.file_path(user_id)?, &data)
    }
}

impl GoalStorage for GoalRepository {
    fn store_goal(&self, goal: &Goal) -> Result<()> {
        let mut goals = self.read_goals(&goal.user_id)?;
        goals.push(goal.clone());
        self.write_goals(&goal.user_id, &goals)
    }

    fn get_goal(&self, user_id: &str, goal_id: &str) -> Result<Option<Goal>> {
        Ok(self.read_goals(user_id)?.into_iter().find(|g| g.id == goal_id))
    }

    fn list_goals(&self, user_id: &str) -> Result<Vec<Goal>> {
        self.read_goals(user_id)
    }

    fn list_all_goals(&self) -> Result<Vec<Goal>> {
        let mut all = Vec::new();
        for user_id in self.connection.list_user_directories()? {
            all.extend(self.read_goals(&user_id)?);
        }
        Ok(all)
    }

    fn update_goal(&self, goal: &Goal) -> Result<()> {
        let mut goals = self.read_goals(&goal.user_id)?;
        let found = goals.iter_mut().find(|g| g.id == goal.id);
        match found {
            Some(existing) => {
                *existing = goal.clone();
                self.write_goals(&goal.user_id, &goals)
            }
            None => Err(anyhow::anyhow!("Goal not found for update: {}", goal.id)),
        }
    }

    fn delete_goal(&self, user_id: &str, goal_id: &str) -> Result<bool> {
        let mut goals = self.read_goals(user_id)?;
        let before = goals.len();
        goals.retain(|g| g.id != goal_id);
        if goals.len() == before {
            return Ok(false);
        }
        self.write_goals(user_id, &goals)?;
        Ok(true)
    }
}

//! CSV-based budget repository, one `budgets.csv` per user directory.

use anyhow::Result;
use csv::{Reader, Writer};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::connection::CsvConnection;
use crate::domain::models::{Budget, BudgetType, Category};
use crate::storage::traits::BudgetStorage;

const BUDGETS_HEADER: &str = "id,user_id,budget_type,category,amount,current_amount,month,year";

/// CSV record structure for budgets
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BudgetRecord {
    id: String,
    user_id: String,
    budget_type: String,
    category: Option<String>,
    amount: f64,
    current_amount: f64,
    month: String,
    year: i32,
}

impl From<&Budget> for BudgetRecord {
    fn from(budget: &Budget) -> Self {
        BudgetRecord {
            id: budget.id.clone(),
            user_id: budget.user_id.clone(),
            budget_type: budget.budget_type.as_str().to_string(),
            category: budget.category.map(|c| c.as_str().to_string()),
            amount: budget.amount,
            current_amount: budget.current_amount,
            month: budget.month.clone(),
            year: budget.year,
        }
    }
}

impl TryFrom<BudgetRecord> for Budget {
    type Error = anyhow::Error;

    fn try_from(record: BudgetRecord) -> Result<Self> {
        let budget_type = BudgetType::from_string(&record.budget_type)
            .map_err(|e| anyhow::anyhow!("Failed to parse budget type: {}", e))?;
        let category = match record.category.as_deref() {
            Some(s) if !s.is_empty() => Some(
                Category::from_string(s)
                    .map_err(|e| anyhow::anyhow!("Failed to parse budget category: {}", e))?,
            ),
            _ => None,
        };

        Ok(Budget {
            id: record.id,
            user_id: record.user_id,
            budget_type,
            category,
            amount: record.amount,
            current_amount: record.current_amount,
            month: record.month,
            year: record.year,
        })
    }
}

/// CSV-based budget repository
#[derive(Clone)]
pub struct BudgetRepository {
    connection: CsvConnection,
}

impl BudgetRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn file_path(&self, user_id: &str) -> Result<std::path::PathBuf> {
        Ok(self.connection.user_directory(user_id)?.join("budgets.csv"))
    }

    fn read_budgets(&self, user_id: &str) -> Result<Vec<Budget>> {
        let path = self.file_path(user_id)?;
        self.connection.ensure_file_exists(&path, BUDGETS_HEADER)?;

        let mut reader = Reader::from_path(&path)?;
        let mut budgets = Vec::new();

        for result in reader.deserialize::<BudgetRecord>() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!("Failed to read budget record: {}. Skipping.", e);
                    continue;
                }
            };
            match Budget::try_from(record) {
                Ok(budget) => budgets.push(budget),
                Err(e) => warn!("Failed to parse budget record: {}. Skipping.", e),
            }
        }

        Ok(budgets)
    }

    fn write_budgets(&self, user_id: &str, budgets: &[Budget]) -> Result<()> {
        let mut writer = Writer::from_writer(Vec::new());
        for budget in budgets {
            writer.serialize(BudgetRecord::from(budget))?;
        }
        let data = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush budgets CSV: {}", e))?;

        self.connection.write_atomic(&self.file_path(user_id)?, &data)
    }
}

impl BudgetStorage for BudgetRepository {
    fn store_budget(&self, budget: &Budget) -> Result<()> {
        let mut budgets = self.read_budgets(&budget.user_id)?;
        budgets.push(budget.clone());
        self.write_budgets(&budget.user_id, &budgets)
    }

    fn get_budget(&self, user_id: &str, budget_id: &str) -> Result<Option<Budget>> {
        Ok(self
            .read_budgets(user_id)?
            .into_iter()
            .find(|b| b.id == budget_id))
    }

    fn list_budgets(&self, user_id: &str) -> Result<Vec<Budget>> {
        self.read_budgets(user_id)
    }

    fn list_all_budgets(&self) -> Result<Vec<Budget>> {
        let mut all = Vec::new();
        for user_id in self.connection.list_user_directories()? {
            all.extend(self.read_budgets(&user_id)?);
        }
        Ok(all)
    }

    fn find_monthly_budget(
        &self,
        user_id: &str,
        month: &str,
        year: i32,
    ) -> Result<Option<Budget>> {
        Ok(self.read_budgets(user_id)?.into_iter().find(|b| {
            b.budget_type == BudgetType::Monthly && b.month == month && b.year == year
        }))
    }

    fn find_category_budget(&self, user_id: &str, category: Category) -> Result<Option<Budget>> {
        Ok(self
            .read_budgets(user_id)?
            .into_iter()
            .find(|b| b.budget_type == BudgetType::Category && b.category == Some(category)))
    }

    fn update_budget(&self, budget: &Budget) -> Result<()> {
        let mut budgets = self.read_budgets(&budget.user_id)?;
        let found = budgets.iter_mut().find(|b| b.id == budget.id);
        match found {
            Some(existing) => {
                *existing = budget.clone();
                self.write_budgets(&budget.user_id, &budgets)
            }
            None => Err(anyhow::anyhow!("Budget not found for update: {}", budget.id)),
        }
    }

    fn delete_budget(&self, user_id: &str, budget_id: &str) -> Result<bool> {
        let mut budgets = self.read_budgets(user_id)?;
        let before = budgets.len();
        budgets.retain(|b| b.id != budget_id);
        if budgets.len() == before {
            return Ok(false);
        }
        self.write_budgets(user_id, &budgets)?;
        Ok(true)
    }
}

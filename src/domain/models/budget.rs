//! Domain model for a budget.
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::category::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetType {
    Monthly,
    Category,
}

impl BudgetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetType::Monthly => "monthly",
            BudgetType::Category => "category",
        }
    }

    pub fn from_string(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "monthly" => Ok(BudgetType::Monthly),
            "category" => Ok(BudgetType::Category),
            _ => Err(format!("Invalid budget type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: String,
    pub user_id: String,
    pub budget_type: BudgetType,
    /// Present iff `budget_type` is `Category`.
    pub category: Option<Category>,
    /// Target amount, at least 1.
    pub amount: f64,
    /// Accumulated spend, only ever increased by the expense allocator.
    pub current_amount: f64,
    /// English month name the budget belongs to, e.g. "January".
    pub month: String,
    pub year: i32,
}

impl Budget {
    pub fn generate_id(user_id: &str, timestamp_ms: u64) -> String {
        format!("budget::{}::{}", user_id, timestamp_ms)
    }

    /// English month name for a date, matching the stored `month` field.
    pub fn month_name(date: DateTime<Utc>) -> String {
        date.format("%B").to_string()
    }

    pub fn year_of(date: DateTime<Utc>) -> i32 {
        date.year()
    }
}

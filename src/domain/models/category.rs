//! Closed category enum shared by transactions and category budgets.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Food,
    Transportation,
    Entertainment,
    Salary,
    FixedIncomeInterest,
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Food,
        Category::Transportation,
        Category::Entertainment,
        Category::Salary,
        Category::FixedIncomeInterest,
        Category::Other,
    ];

    /// Convert to the display string used in storage and notifications.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Transportation => "Transportation",
            Category::Entertainment => "Entertainment",
            Category::Salary => "Salary",
            Category::FixedIncomeInterest => "Fixed income interest",
            Category::Other => "Other",
        }
    }

    /// Parse from string for CSV loading.
    pub fn from_string(s: &str) -> Result<Self, String> {
        match s {
            "Food" => Ok(Category::Food),
            "Transportation" => Ok(Category::Transportation),
            "Entertainment" => Ok(Category::Entertainment),
            "Salary" => Ok(Category::Salary),
            "Fixed income interest" => Ok(Category::FixedIncomeInterest),
            "Other" => Ok(Category::Other),
            _ => Err(format!("Invalid category: {}", s)),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

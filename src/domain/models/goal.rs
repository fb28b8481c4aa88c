//! Domain model for a savings goal.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub target_amount: f64,
    /// Accumulated savings; 0 <= current_amount <= target_amount.
    pub current_amount: f64,
    pub deadline: DateTime<Utc>,
    /// Fraction of each income allocated to this goal, 0-100.
    pub allocation_percentage: f64,
}

impl Goal {
    pub fn generate_id(user_id: &str, timestamp_ms: u64) -> String {
        format!("goal::{}::{}", user_id, timestamp_ms)
    }

    /// A goal is complete once its savings reach the target.
    pub fn is_complete(&self) -> bool {
        self.current_amount >= self.target_amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal(current: f64, target: f64) -> Goal {
        Goal {
            id: "goal::u::1".to_string(),
            user_id: "u".to_string(),
            name: "Vacation".to_string(),
            target_amount: target,
            current_amount: current,
            deadline: Utc::now(),
            allocation_percentage: 10.0,
        }
    }

    #[test]
    fn test_is_complete() {
        assert!(!goal(99.99, 100.0).is_complete());
        assert!(goal(100.0, 100.0).is_complete());
        assert!(goal(0.0, 0.0).is_complete());
    }
}

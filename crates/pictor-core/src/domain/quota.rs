//! Quota model: per-user, per-category consumable budgets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::UserId;
use super::task_type::TaskType;

/// Quota category.
///
/// Open string newtype rather than a closed enum: by convention there is one
/// category per task type (`"matting"`, `"upscale"`, ...), but the ledger
/// does not restrict the namespace, so the outer system can add categories
/// (storage, API calls, ...) without touching this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuotaType(String);

impl QuotaType {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<TaskType> for QuotaType {
    fn from(task_type: TaskType) -> Self {
        Self(task_type.as_str().to_string())
    }
}

impl fmt::Display for QuotaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One ledger row, keyed by (`user_id`, `quota_type`).
///
/// Invariant: `used_quota <= total_quota` after every successful deduction.
/// `consume` rejects atomically before any mutation is visible; `reset_at`
/// is carried as data for the external reset job, never acted on here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaRecord {
    pub user_id: UserId,
    pub quota_type: QuotaType,
    pub total_quota: u32,
    pub used_quota: u32,

    /// When the external scheduler should reset `used_quota` to 0.
    pub reset_at: Option<DateTime<Utc>>,
}

impl QuotaRecord {
    pub fn new(
        user_id: UserId,
        quota_type: QuotaType,
        total_quota: u32,
        reset_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            user_id,
            quota_type,
            total_quota,
            used_quota: 0,
            reset_at,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.total_quota.saturating_sub(self.used_quota)
    }

    /// Deduct `amount`, or leave the row untouched and report the shortfall.
    pub fn consume(&mut self, amount: u32) -> Result<u32, u32> {
        let remaining = self.remaining();
        if remaining < amount {
            return Err(remaining);
        }
        self.used_quota += amount;
        Ok(self.remaining())
    }
}

//! Serializable read models for the transport collaborator.
//!
//! These are snapshots: producing one is side-effect free, and repeated
//! reads with no intervening state change yield identical views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ids::{TaskId, UserId};
use super::quota::{QuotaRecord, QuotaType};
use super::status::TaskStatus;
use super::task::TaskRecord;
use super::task_type::TaskType;

/// Full task snapshot (single-task reads and listings).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskView {
    pub id: TaskId,
    pub user_id: UserId,
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub input_ref: Option<String>,
    pub output_ref: Option<String>,
    pub parameters: Map<String, Value>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&TaskRecord> for TaskView {
    fn from(record: &TaskRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            task_type: record.task_type,
            status: record.status,
            input_ref: record.input_ref.clone(),
            output_ref: record.output_ref.clone(),
            parameters: record.parameters.clone(),
            error_message: record.error_message.clone(),
            created_at: record.created_at,
            completed_at: record.completed_at,
        }
    }
}

/// Polling view: just enough to decide "done yet?" and fetch the result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusView {
    pub status: TaskStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_ref: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    pub parameters: Map<String, Value>,
}

impl From<&TaskRecord> for TaskStatusView {
    fn from(record: &TaskRecord) -> Self {
        Self {
            status: record.status,
            output_ref: record.output_ref.clone(),
            error_message: record.error_message.clone(),
            parameters: record.parameters.clone(),
        }
    }
}

/// One quota category for one user, with the derived remainder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaView {
    pub quota_type: QuotaType,
    pub total_quota: u32,
    pub used_quota: u32,
    pub remaining_quota: u32,
    pub reset_at: Option<DateTime<Utc>>,
}

impl From<&QuotaRecord> for QuotaView {
    fn from(record: &QuotaRecord) -> Self {
        Self {
            quota_type: record.quota_type.clone(),
            total_quota: record.total_quota,
            used_quota: record.used_quota,
            remaining_quota: record.remaining(),
            reset_at: record.reset_at,
        }
    }
}

//! Task record: identity, payload, and lifecycle bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ids::{TaskId, UserId};
use super::status::TaskStatus;
use super::task_type::TaskType;

/// One unit of requested image work.
///
/// Design:
/// - This is the single source of truth for a task's state. The dispatcher
///   only holds a transient clone while executing; every state change is
///   written back through the store's conditional update.
/// - Field invariants: `output_ref` is set iff Completed, `error_message`
///   iff Failed, `completed_at` iff terminal. The `mark_*` methods are the
///   only mutation points, so the invariants cannot drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub user_id: UserId,
    pub task_type: TaskType,
    pub status: TaskStatus,

    /// Reference to the source image (required for all types except designer).
    pub input_ref: Option<String>,

    /// Reference to the result image, set only on completion.
    pub output_ref: Option<String>,

    /// Open, type-dependent payload (scale factor, target language, style, ...).
    /// Result metadata (e.g. extracted/translated text) merges in on completion.
    pub parameters: Map<String, Value>,

    /// Human-readable failure cause, set only on failure.
    pub error_message: Option<String>,

    pub created_at: DateTime<Utc>,

    /// Set exactly once, when the status becomes Completed or Failed.
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// Create a fresh Pending record.
    pub fn new(
        id: TaskId,
        user_id: UserId,
        task_type: TaskType,
        input_ref: Option<String>,
        parameters: Map<String, Value>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            task_type,
            status: TaskStatus::Pending,
            input_ref,
            output_ref: None,
            parameters,
            error_message: None,
            created_at,
            completed_at: None,
        }
    }

    /// Claimed by a worker.
    pub fn mark_processing(&mut self) {
        self.status = TaskStatus::Processing;
    }

    /// Terminal success: record the output and merge result metadata into
    /// the parameters (result keys win on collision).
    pub fn mark_completed(
        &mut self,
        output_ref: String,
        result: Map<String, Value>,
        now: DateTime<Utc>,
    ) {
        self.status = TaskStatus::Completed;
        self.output_ref = Some(output_ref);
        for (key, value) in result {
            self.parameters.insert(key, value);
        }
        self.completed_at = Some(now);
    }

    /// Terminal failure (processor error, invalid input, or cancellation).
    pub fn mark_failed(&mut self, error_message: String, now: DateTime<Utc>) {
        self.status = TaskStatus::Failed;
        self.error_message = Some(error_message);
        self.completed_at = Some(now);
    }

    /// `prompt` parameter, if present and non-empty.
    pub fn prompt(&self) -> Option<&str> {
        self.parameters
            .get("prompt")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

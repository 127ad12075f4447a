//! TaskStore port - タスクの正本（source of truth）
//!
//! TaskStore はタスクの状態・ペイロード・結果を管理します。
//!
//! # 設計原則
//! - 状態遷移は全て `update_status` の**条件付き更新**を通す：現在の
//!   status が `expected` と一致する場合にのみ適用し、一致しなければ
//!   `Conflict` を返す（楽観的並行制御）。
//! - この一点がキャンセルとディスパッチの競合安全性の土台。勝者が一人
//!   決まり、敗者の更新は no-op になる。グローバルロックは存在しない。
//! - terminal（Completed/Failed）になったレコードは二度と変化しない。

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::{TaskId, TaskRecord, TaskStatus, TaskType, UserId};

/// The terminal-or-claim mutation applied by a conditional update.
///
/// Carrying the fields with the target status (instead of a bag of
/// optional columns) makes illegal writes unrepresentable: a Completed
/// update always has an output, a Failed update always has an error.
#[derive(Debug, Clone)]
pub enum StatusUpdate {
    /// pending -> processing (worker claim).
    Processing,

    /// processing -> completed, with the output reference and result
    /// metadata to merge into the task's parameters.
    Completed {
        output_ref: String,
        result: Map<String, Value>,
    },

    /// {pending, processing} -> failed (processor error, invalid input,
    /// or user cancellation).
    Failed { error_message: String },
}

impl StatusUpdate {
    /// The status this update moves the task to.
    pub fn target(&self) -> TaskStatus {
        match self {
            StatusUpdate::Processing => TaskStatus::Processing,
            StatusUpdate::Completed { .. } => TaskStatus::Completed,
            StatusUpdate::Failed { .. } => TaskStatus::Failed,
        }
    }
}

/// Store-level failures. `Conflict` is internal plumbing: the losing side
/// of a race swallows it; it must never surface to the end caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("task not found: {0}")]
    NotFound(TaskId),

    #[error("status conflict on {task_id}: expected {expected}, actual {actual}")]
    Conflict {
        task_id: TaskId,
        expected: TaskStatus,
        actual: TaskStatus,
    },

    /// Caller bug: the requested (expected -> target) pair is not a legal
    /// transition of the state machine. Never triggered by the engine's
    /// own call sites.
    #[error("illegal transition on {task_id}: {from} -> {to}")]
    IllegalTransition {
        task_id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },
}

/// Listing filter (`list_by_user`): both fields optional, combined with AND.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskFilter {
    pub task_type: Option<TaskType>,
    pub status: Option<TaskStatus>,
}

/// Bounded pagination for listings.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    pub const DEFAULT_LIMIT: usize = 20;
    pub const MAX_LIMIT: usize = 100;

    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// Effective limit: 1..=MAX_LIMIT (a zero limit falls back to the default).
    pub fn clamped_limit(&self) -> usize {
        if self.limit == 0 {
            Self::DEFAULT_LIMIT
        } else {
            self.limit.min(Self::MAX_LIMIT)
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// Task store port. In-memory for development/tests; a database-backed
/// implementation lives behind the same seam.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Store a new record (status Pending, fresh id assigned by the caller).
    async fn insert(&self, record: TaskRecord);

    /// Fetch one record.
    async fn get(&self, task_id: TaskId) -> Option<TaskRecord>;

    /// Conditional update: applies `update` iff the task's current status
    /// equals `expected`, returning the updated record. The store stamps
    /// `completed_at` with its own clock when the update is terminal.
    async fn update_status(
        &self,
        task_id: TaskId,
        expected: TaskStatus,
        update: StatusUpdate,
    ) -> Result<TaskRecord, StoreError>;

    /// Tasks owned by `user_id`, newest-first by `created_at`.
    async fn list_by_user(&self, user_id: UserId, filter: TaskFilter, page: Page)
    -> Vec<TaskRecord>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_clamps_limit() {
        assert_eq!(Page::new(500, 0).clamped_limit(), 100);
        assert_eq!(Page::new(0, 0).clamped_limit(), 20);
        assert_eq!(Page::new(7, 0).clamped_limit(), 7);
        assert_eq!(Page::default().clamped_limit(), 20);
    }

    #[test]
    fn update_targets() {
        assert_eq!(StatusUpdate::Processing.target(), TaskStatus::Processing);
        assert_eq!(
            StatusUpdate::Failed {
                error_message: "x".to_string()
            }
            .target(),
            TaskStatus::Failed
        );
    }
}

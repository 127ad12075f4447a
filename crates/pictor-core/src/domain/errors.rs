//! Error model for the engine surface.
//!
//! 同期的に呼び出し側へ返すのはここにある種類だけ。処理系の失敗
//! （processor のエラーやタイムアウト）はタスクの `failed` 状態として
//! 記録され、ポーリングでのみ観測できる。店舗側の Conflict（条件付き
//! 更新の競合負け）は内部事情であり、負けた側が握りつぶす。

use thiserror::Error;

use super::ids::TaskId;
use super::quota::QuotaType;

/// Errors surfaced synchronously to the transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Missing/malformed required input. Caller's fault; the task is never
    /// created (or never dispatched).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Unknown task id (or a task the requester does not own).
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// No ledger row exists for this (user, category) pair.
    #[error("quota not found for category '{0}'")]
    QuotaNotFound(QuotaType),

    /// The deduction would overdraw the budget. Nothing was deducted.
    #[error("insufficient quota: requested {requested}, remaining {remaining}")]
    InsufficientQuota { requested: u32, remaining: u32 },

    /// The task already reached a terminal state; its result stands.
    #[error("cannot cancel task {0}: already completed or failed")]
    CannotCancel(TaskId),

    /// Unexpected internal fault. The message is generic on purpose; the
    /// diagnostic detail goes to the log, not the caller.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    #[test]
    fn messages_are_stable() {
        let task_id = TaskId::from_ulid(Ulid::new());
        let err = CoreError::CannotCancel(task_id);
        assert!(err.to_string().contains("cannot cancel"));

        let err = CoreError::InsufficientQuota {
            requested: 2,
            remaining: 1,
        };
        assert_eq!(
            err.to_string(),
            "insufficient quota: requested 2, remaining 1"
        );
    }
}

//! TaskService - トランスポート層へ公開する操作面
//!
//! 生成・照会・一覧・キャンセル・配額の各操作をここに集約する。
//! 依存は全てコンストラクタで受け取る（隠れたグローバルなし）。
//! タスク作成は同期的で速い（insert + enqueue のみ）。実行はワーカーが
//! 非同期に進めるので、作成者が processor を待つことはない。
//!
//! 配額の確認・消費はタスク作成の**前に**呼び出し側が行う。配額と
//! タスク状態は独立した状態であり、クロスする transaction は無い。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::app::queue::WorkQueue;
use crate::domain::{
    CoreError, QuotaType, QuotaView, TaskId, TaskRecord, TaskStatusView, TaskType, TaskView, UserId,
};
use crate::ports::{
    Clock, IdGenerator, LedgerError, Page, QuotaLedger, StatusUpdate, StoreError, TaskFilter,
    TaskStore,
};

/// Message recorded when a user cancels their task.
pub const CANCELLED_BY_USER: &str = "Task cancelled by user";

/// The engine's caller-facing facade.
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    ledger: Arc<dyn QuotaLedger>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    queue: Arc<WorkQueue>,
}

impl TaskService {
    pub fn new(
        store: Arc<dyn TaskStore>,
        ledger: Arc<dyn QuotaLedger>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
        queue: Arc<WorkQueue>,
    ) -> Self {
        Self {
            store,
            ledger,
            ids,
            clock,
            queue,
        }
    }

    /// Create a task and hand it to the dispatcher.
    ///
    /// `input_ref` is a typed argument, so its absence is a caller fault
    /// rejected here; `prompt` lives inside the open parameter payload and
    /// is checked at dispatch (the task then settles as `failed`).
    pub async fn create_task(
        &self,
        user_id: UserId,
        task_type: TaskType,
        input_ref: Option<String>,
        parameters: Option<Map<String, Value>>,
    ) -> Result<TaskId, CoreError> {
        let input_ref = input_ref.filter(|s| !s.is_empty());
        if task_type.requires_input_ref() && input_ref.is_none() {
            return Err(CoreError::Validation(format!(
                "input image reference is required for {task_type} tasks"
            )));
        }

        let task_id = self.ids.generate_task_id();
        let record = TaskRecord::new(
            task_id,
            user_id,
            task_type,
            input_ref,
            parameters.unwrap_or_default(),
            self.clock.now(),
        );

        self.store.insert(record).await;
        self.queue.push(task_id).await;

        tracing::info!(%task_id, %user_id, %task_type, "task created");
        Ok(task_id)
    }

    /// Polling read: status + result fields. Side-effect free and
    /// idempotent; safe to call arbitrarily often.
    pub async fn get_task_status(&self, task_id: TaskId) -> Result<TaskStatusView, CoreError> {
        let record = self
            .store
            .get(task_id)
            .await
            .ok_or(CoreError::TaskNotFound(task_id))?;
        Ok(TaskStatusView::from(&record))
    }

    /// Ownership-checked single-task read. A foreign task reads as
    /// NotFound: the caller learns nothing about other users' tasks.
    pub async fn get_task(&self, task_id: TaskId, user_id: UserId) -> Result<TaskView, CoreError> {
        let record = self
            .store
            .get(task_id)
            .await
            .filter(|record| record.user_id == user_id)
            .ok_or(CoreError::TaskNotFound(task_id))?;
        Ok(TaskView::from(&record))
    }

    /// The user's tasks, newest-first, with optional type/status filter and
    /// bounded pagination (limit capped at 100).
    pub async fn list_tasks(
        &self,
        user_id: UserId,
        filter: TaskFilter,
        page: Page,
    ) -> Vec<TaskView> {
        self.store
            .list_by_user(user_id, filter, page)
            .await
            .iter()
            .map(TaskView::from)
            .collect()
    }

    /// Best-effort cancellation.
    ///
    /// Applies `observed -> failed` through the store's conditional update.
    /// Losing the race against the dispatcher means the task went terminal:
    /// report CannotCancel instead of silently overwriting the result. A
    /// conflict against a *non*-terminal move (pending -> processing slipped
    /// in between) retries with the freshly observed status; statuses only
    /// move forward, so the loop terminates.
    ///
    /// The external processing call is not interrupted; once cancellation
    /// wins, the dispatcher discards its late outcome.
    pub async fn cancel_task(&self, task_id: TaskId, user_id: UserId) -> Result<(), CoreError> {
        let record = self
            .store
            .get(task_id)
            .await
            .filter(|record| record.user_id == user_id)
            .ok_or(CoreError::TaskNotFound(task_id))?;

        let mut observed = record.status;
        loop {
            if observed.is_terminal() {
                return Err(CoreError::CannotCancel(task_id));
            }

            match self
                .store
                .update_status(
                    task_id,
                    observed,
                    StatusUpdate::Failed {
                        error_message: CANCELLED_BY_USER.to_string(),
                    },
                )
                .await
            {
                Ok(_) => {
                    tracing::info!(%task_id, %user_id, "task cancelled");
                    return Ok(());
                }
                Err(StoreError::Conflict { actual, .. }) => {
                    observed = actual;
                }
                Err(StoreError::NotFound(_)) => {
                    return Err(CoreError::TaskNotFound(task_id));
                }
                Err(err) => {
                    tracing::error!(%task_id, %err, "cancel hit an unexpected store failure");
                    return Err(CoreError::Internal("task store failure".to_string()));
                }
            }
        }
    }

    /// Current totals for one or all of the user's quota categories.
    pub async fn get_remaining_quota(
        &self,
        user_id: UserId,
        quota_type: Option<&QuotaType>,
    ) -> Vec<QuotaView> {
        self.ledger.get_remaining(user_id, quota_type).await
    }

    /// Deduct from the user's budget, returning the new remainder.
    pub async fn consume_quota(
        &self,
        user_id: UserId,
        quota_type: &QuotaType,
        amount: u32,
    ) -> Result<u32, CoreError> {
        if amount == 0 {
            return Err(CoreError::Validation(
                "quota amount must be at least 1".to_string(),
            ));
        }
        self.ledger
            .try_consume(user_id, quota_type, amount)
            .await
            .map_err(|err| match err {
                LedgerError::QuotaNotFound(ty) => CoreError::QuotaNotFound(ty),
                LedgerError::Insufficient {
                    requested,
                    remaining,
                } => CoreError::InsufficientQuota {
                    requested,
                    remaining,
                },
            })
    }

    /// Seeding path / interface for the external periodic reset job.
    pub async fn grant_quota(
        &self,
        user_id: UserId,
        quota_type: QuotaType,
        total_quota: u32,
        reset_at: Option<DateTime<Utc>>,
    ) {
        self.ledger
            .grant(user_id, quota_type, total_quota, reset_at)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::domain::TaskStatus;
    use crate::impls::{InMemoryQuotaLedger, InMemoryTaskStore};
    use crate::ports::{SystemClock, UlidGenerator};

    fn service() -> (TaskService, Arc<InMemoryTaskStore>, Arc<WorkQueue>) {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = Arc::new(InMemoryTaskStore::new(Arc::clone(&clock)));
        let queue = Arc::new(WorkQueue::new());
        let service = TaskService::new(
            Arc::clone(&store) as Arc<dyn TaskStore>,
            Arc::new(InMemoryQuotaLedger::new()),
            Arc::new(UlidGenerator::new(SystemClock)),
            clock,
            Arc::clone(&queue),
        );
        (service, store, queue)
    }

    fn user() -> UserId {
        UserId::from_ulid(ulid::Ulid::new())
    }

    fn params(value: serde_json::Value) -> Option<Map<String, Value>> {
        match value {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    #[tokio::test]
    async fn create_inserts_pending_and_enqueues() {
        let (service, store, queue) = service();
        let user = user();

        let task_id = service
            .create_task(
                user,
                TaskType::Matting,
                Some("img://a.png".to_string()),
                None,
            )
            .await
            .unwrap();

        let record = store.get(task_id).await.unwrap();
        assert_eq!(record.status, TaskStatus::Pending);
        assert_eq!(record.user_id, user);
        assert_eq!(queue.pop().await, task_id);
    }

    #[tokio::test]
    async fn create_rejects_missing_input_ref_synchronously() {
        let (service, store, queue) = service();

        for task_type in [
            TaskType::Matting,
            TaskType::Retouch,
            TaskType::Background,
            TaskType::Upscale,
            TaskType::Translate,
        ] {
            let err = service
                .create_task(user(), task_type, None, None)
                .await
                .unwrap_err();
            assert!(matches!(err, CoreError::Validation(_)));
        }

        // 空文字列も欠落扱い
        let err = service
            .create_task(user(), TaskType::Matting, Some(String::new()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        // タスクは一つも作られていない
        assert!(queue.is_empty().await);
        let _ = store;
    }

    #[tokio::test]
    async fn designer_creates_without_input_ref() {
        let (service, store, _queue) = service();

        // prompt の有無は作成時には見ない（dispatch で検証される）
        let task_id = service
            .create_task(user(), TaskType::Designer, None, None)
            .await
            .unwrap();
        assert_eq!(store.get(task_id).await.unwrap().status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn status_reads_are_idempotent() {
        let (service, _store, _queue) = service();
        let task_id = service
            .create_task(
                user(),
                TaskType::Upscale,
                Some("img://a.png".to_string()),
                params(json!({"scale": 3})),
            )
            .await
            .unwrap();

        let first = service.get_task_status(task_id).await.unwrap();
        let second = service.get_task_status(task_id).await.unwrap();
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn unknown_task_reads_as_not_found() {
        let (service, _store, _queue) = service();
        let missing = TaskId::from_ulid(ulid::Ulid::new());
        assert!(matches!(
            service.get_task_status(missing).await,
            Err(CoreError::TaskNotFound(_))
        ));
    }

    #[tokio::test]
    async fn foreign_tasks_are_hidden_from_get_and_cancel() {
        let (service, _store, _queue) = service();
        let owner = user();
        let stranger = user();

        let task_id = service
            .create_task(
                owner,
                TaskType::Matting,
                Some("img://a.png".to_string()),
                None,
            )
            .await
            .unwrap();

        assert!(matches!(
            service.get_task(task_id, stranger).await,
            Err(CoreError::TaskNotFound(_))
        ));
        assert!(matches!(
            service.cancel_task(task_id, stranger).await,
            Err(CoreError::TaskNotFound(_))
        ));

        // 本人からは見える
        assert!(service.get_task(task_id, owner).await.is_ok());
    }

    #[tokio::test]
    async fn cancel_pending_task_settles_as_failed() {
        let (service, store, _queue) = service();
        let owner = user();
        let task_id = service
            .create_task(
                owner,
                TaskType::Matting,
                Some("img://a.png".to_string()),
                None,
            )
            .await
            .unwrap();

        service.cancel_task(task_id, owner).await.unwrap();

        let record = store.get(task_id).await.unwrap();
        assert_eq!(record.status, TaskStatus::Failed);
        assert_eq!(record.error_message.as_deref(), Some(CANCELLED_BY_USER));
        assert!(record.completed_at.is_some());
    }

    #[tokio::test]
    async fn cancel_terminal_task_reports_cannot_cancel() {
        let (service, store, _queue) = service();
        let owner = user();
        let task_id = service
            .create_task(
                owner,
                TaskType::Matting,
                Some("img://a.png".to_string()),
                None,
            )
            .await
            .unwrap();

        // dispatcher が完走したのと同じ状態を作る
        store
            .update_status(task_id, TaskStatus::Pending, StatusUpdate::Processing)
            .await
            .unwrap();
        store
            .update_status(
                task_id,
                TaskStatus::Processing,
                StatusUpdate::Completed {
                    output_ref: "img://out.png".to_string(),
                    result: Map::new(),
                },
            )
            .await
            .unwrap();

        let err = service.cancel_task(task_id, owner).await.unwrap_err();
        assert!(matches!(err, CoreError::CannotCancel(_)));

        // 結果は上書きされていない
        let record = store.get(task_id).await.unwrap();
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.output_ref.as_deref(), Some("img://out.png"));
    }

    #[tokio::test]
    async fn cancel_retries_after_losing_to_a_claim() {
        let (service, store, _queue) = service();
        let owner = user();
        let task_id = service
            .create_task(
                owner,
                TaskType::Matting,
                Some("img://a.png".to_string()),
                None,
            )
            .await
            .unwrap();

        // cancel が pending を観測した後にワーカーが claim した、という
        // 競合は store 側の Conflict -> 再試行で吸収される。ここでは
        // claim 後の cancel がそのまま processing -> failed を通ることを確認。
        store
            .update_status(task_id, TaskStatus::Pending, StatusUpdate::Processing)
            .await
            .unwrap();

        service.cancel_task(task_id, owner).await.unwrap();
        let record = store.get(task_id).await.unwrap();
        assert_eq!(record.status, TaskStatus::Failed);
        assert_eq!(record.error_message.as_deref(), Some(CANCELLED_BY_USER));
    }

    #[tokio::test]
    async fn quota_operations_round_trip() {
        let (service, _store, _queue) = service();
        let owner = user();
        let ty = QuotaType::from(TaskType::Matting);

        service.grant_quota(owner, ty.clone(), 2, None).await;

        assert_eq!(service.consume_quota(owner, &ty, 1).await.unwrap(), 1);
        assert_eq!(service.consume_quota(owner, &ty, 1).await.unwrap(), 0);
        assert!(matches!(
            service.consume_quota(owner, &ty, 1).await,
            Err(CoreError::InsufficientQuota {
                requested: 1,
                remaining: 0
            })
        ));

        let views = service.get_remaining_quota(owner, Some(&ty)).await;
        assert_eq!(views[0].used_quota, 2);
    }

    #[tokio::test]
    async fn quota_amount_zero_is_a_validation_error() {
        let (service, _store, _queue) = service();
        let err = service
            .consume_quota(user(), &QuotaType::new("matting"), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_quota_category_reports_quota_not_found() {
        let (service, _store, _queue) = service();
        let err = service
            .consume_quota(user(), &QuotaType::new("nonexistent"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::QuotaNotFound(_)));
    }
}

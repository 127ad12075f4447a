//! InMemoryTaskStore - 開発・テスト用のタスク正本

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{TaskId, TaskRecord, TaskStatus, UserId};
use crate::ports::{Clock, Page, StatusUpdate, StoreError, TaskFilter, TaskStore};

/// In-memory task store.
///
/// # 実装詳細
/// - `HashMap<TaskId, TaskRecord>` が唯一の正本。条件判定と適用は同一
///   ロック区間で行うので、条件付き更新は自然に原子的になる。
/// - `completed_at` はこの store の Clock がスタンプする（terminal 更新の
///   適用瞬間 = タイムスタンプの瞬間）。
/// - ロックを跨いで await しない。
pub struct InMemoryTaskStore {
    tasks: Mutex<HashMap<TaskId, TaskRecord>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryTaskStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            clock,
        }
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert(&self, record: TaskRecord) {
        let mut tasks = self.tasks.lock().await;
        tasks.insert(record.id, record);
    }

    async fn get(&self, task_id: TaskId) -> Option<TaskRecord> {
        let tasks = self.tasks.lock().await;
        tasks.get(&task_id).cloned()
    }

    async fn update_status(
        &self,
        task_id: TaskId,
        expected: TaskStatus,
        update: StatusUpdate,
    ) -> Result<TaskRecord, StoreError> {
        let target = update.target();
        if !expected.can_transition_to(target) {
            return Err(StoreError::IllegalTransition {
                task_id,
                from: expected,
                to: target,
            });
        }

        let mut tasks = self.tasks.lock().await;
        let record = tasks.get_mut(&task_id).ok_or(StoreError::NotFound(task_id))?;

        // 条件付き更新の本体。expected が非 terminal の遷移しか通らないので、
        // terminal に達したレコードはここで必ず Conflict になり、二度と変化しない。
        if record.status != expected {
            return Err(StoreError::Conflict {
                task_id,
                expected,
                actual: record.status,
            });
        }

        match update {
            StatusUpdate::Processing => record.mark_processing(),
            StatusUpdate::Completed { output_ref, result } => {
                record.mark_completed(output_ref, result, self.clock.now())
            }
            StatusUpdate::Failed { error_message } => {
                record.mark_failed(error_message, self.clock.now())
            }
        }

        Ok(record.clone())
    }

    async fn list_by_user(
        &self,
        user_id: UserId,
        filter: TaskFilter,
        page: Page,
    ) -> Vec<TaskRecord> {
        let tasks = self.tasks.lock().await;

        let mut matched: Vec<&TaskRecord> = tasks
            .values()
            .filter(|t| t.user_id == user_id)
            .filter(|t| filter.task_type.is_none_or(|ty| t.task_type == ty))
            .filter(|t| filter.status.is_none_or(|st| t.status == st))
            .collect();

        // 新しい順。created_at が同時刻なら ULID の並びで安定させる。
        matched.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        matched
            .into_iter()
            .skip(page.offset)
            .take(page.clamped_limit())
            .cloned()
            .collect()
    }
}

//! WorkQueue - 作成済みタスクをワーカーへ届けるキュー
//!
//! # 設計原則
//! - キューには TaskId のみを流す（状態・payload は TaskStore に保存）。
//!   ワーカーは claim（条件付き更新）を通じて正本から作業を取るので、
//!   キューの重複配送や遅延配送は正しさに影響しない。
//! - push 側は Notify で待機中のワーカーを起こす。ロックの外で notify
//!   する（デッドロック回避）。

use std::collections::VecDeque;

use tokio::sync::{Mutex, Notify};

use crate::domain::TaskId;

/// FIFO delivery of task ids from creation to the worker pool.
pub struct WorkQueue {
    ready: Mutex<VecDeque<TaskId>>,
    notify: Notify,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self {
            ready: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    /// Enqueue a task id and wake one waiting worker.
    pub async fn push(&self, task_id: TaskId) {
        {
            let mut ready = self.ready.lock().await;
            ready.push_back(task_id);
        }
        self.notify.notify_one();
    }

    /// Take the next task id, parking until one is available.
    ///
    /// Workers re-check the deque before every park, so a push that races
    /// with the park is never lost (Notify stores the permit).
    pub async fn pop(&self) -> TaskId {
        loop {
            {
                let mut ready = self.ready.lock().await;
                if let Some(task_id) = ready.pop_front() {
                    return task_id;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Queue depth (observability).
    pub async fn len(&self) -> usize {
        self.ready.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

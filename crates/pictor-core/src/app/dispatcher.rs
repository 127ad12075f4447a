//! Dispatcher - タスク実行ループ（worker pool）
//!
//! # フロー（1 タスクあたり）
//! 1. WorkQueue::pop() で task_id 取得
//! 2. TaskStore の条件付き更新で claim（pending -> processing）。
//!    負けたら（すでにキャンセル済みなど）processor は呼ばずに捨てる
//! 3. タイプ別の入力検証。欠けていれば processing -> failed（crash ではなく
//!    記述的な error_message を持つ終了）
//! 4. ImageProcessor 呼び出し（`tokio::time::timeout` 付き）
//! 5. 結果を条件付き更新で書き戻す（processing -> completed / failed）。
//!    ここで Conflict になったらキャンセルが競合に勝っている。結果は捨てる
//!
//! ワーカー数が同時 processor 呼び出しの上限になる（backpressure）。

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::app::config::EngineConfig;
use crate::app::queue::WorkQueue;
use crate::domain::{TaskRecord, TaskStatus, TaskType};
use crate::ports::{ImageProcessor, ProcessRequest, StatusUpdate, StoreError, TaskStore};

/// Worker group handle.
/// - `request_shutdown()` で新規の取り込みを止める
/// - `shutdown_and_join()` で全ワーカーの終了を待てる
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Spawn `config.workers` workers against the queue/store/processor.
    pub fn spawn(
        config: &EngineConfig,
        queue: Arc<WorkQueue>,
        store: Arc<dyn TaskStore>,
        processor: Arc<dyn ImageProcessor>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(config.workers);
        for worker_id in 0..config.workers {
            let queue = Arc::clone(&queue);
            let store = Arc::clone(&store);
            let processor = Arc::clone(&processor);
            let timeout = config.process_timeout;
            let mut rx = shutdown_rx.clone();

            let join = tokio::spawn(async move {
                worker_loop(worker_id, queue, store, processor, timeout, &mut rx).await;
            });
            joins.push(join);
        }

        Self { shutdown_tx, joins }
    }

    /// Request shutdown for all workers.
    /// In-flight processor calls are not cancelled; each worker settles its
    /// current task and then stops taking new ones.
    pub fn request_shutdown(&self) {
        // ignore send error: receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for all workers.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for join in self.joins {
            let _ = join.await;
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<WorkQueue>,
    store: Arc<dyn TaskStore>,
    processor: Arc<dyn ImageProcessor>,
    process_timeout: Duration,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // pop は待つ可能性があるので select で shutdown と競合させる
        let task_id = tokio::select! {
            _ = shutdown_rx.changed() => continue,
            task_id = queue.pop() => task_id,
        };

        // Claim: pending -> processing。負けたら processor は呼ばない。
        let record = match store
            .update_status(task_id, TaskStatus::Pending, StatusUpdate::Processing)
            .await
        {
            Ok(record) => record,
            Err(StoreError::Conflict { actual, .. }) => {
                tracing::debug!(worker_id, %task_id, %actual, "claim lost, skipping task");
                continue;
            }
            Err(err) => {
                tracing::warn!(worker_id, %task_id, %err, "claim failed");
                continue;
            }
        };

        tracing::info!(worker_id, %task_id, task_type = %record.task_type, "task claimed");

        let settle = match prepare_request(&record) {
            Ok(request) => {
                match tokio::time::timeout(process_timeout, processor.process(request)).await {
                    Ok(Ok(output)) => StatusUpdate::Completed {
                        output_ref: output.output_ref,
                        result: output.result,
                    },
                    Ok(Err(err)) => StatusUpdate::Failed {
                        error_message: err.to_string(),
                    },
                    Err(_elapsed) => StatusUpdate::Failed {
                        error_message: format!(
                            "processing timed out after {}s",
                            process_timeout.as_secs()
                        ),
                    },
                }
            }
            // 入力不備は processor を呼ばずに終了させる
            Err(message) => StatusUpdate::Failed {
                error_message: message,
            },
        };

        match store
            .update_status(task_id, TaskStatus::Processing, settle)
            .await
        {
            Ok(record) => {
                tracing::info!(worker_id, %task_id, status = %record.status, "task settled");
            }
            Err(StoreError::Conflict { actual, .. }) => {
                // キャンセルが競合に勝った。結果は捨てる。
                tracing::debug!(worker_id, %task_id, %actual, "outcome discarded, task moved while processing");
            }
            Err(err) => {
                tracing::warn!(worker_id, %task_id, %err, "settle failed");
            }
        }
    }
}

/// Per-type input validation + parameter defaults.
///
/// Returns the processor request, or the failure message for a task whose
/// required input is missing (the processor is never invoked for those).
fn prepare_request(record: &TaskRecord) -> Result<ProcessRequest, String> {
    let input_ref = record.input_ref.as_deref().filter(|s| !s.is_empty());

    if record.task_type.requires_input_ref() && input_ref.is_none() {
        return Err(format!(
            "input image reference is required for {} tasks",
            record.task_type
        ));
    }
    if record.task_type.requires_prompt() && record.prompt().is_none() {
        return Err(format!(
            "prompt parameter is required for {} tasks",
            record.task_type
        ));
    }

    let mut parameters = record.parameters.clone();
    apply_defaults(record.task_type, &mut parameters);

    Ok(ProcessRequest {
        task_type: record.task_type,
        input_ref: input_ref.map(str::to_string),
        parameters,
    })
}

/// Fill in the per-type defaults the processor contract expects.
fn apply_defaults(task_type: TaskType, parameters: &mut Map<String, Value>) {
    match task_type {
        TaskType::Upscale => {
            parameters
                .entry("scale".to_string())
                .or_insert_with(|| Value::from(2));
        }
        TaskType::Translate => {
            parameters
                .entry("target_lang".to_string())
                .or_insert_with(|| Value::from("en"));
        }
        _ => {}
    }
}

//! EngineBuilder - エンジンの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - processor は必須。無ければ build() が BuildError を返す
//! - worker 数 0 も起動時に弾く（黙って何も処理しないエンジンを作らない）
//! - store / ledger / clock / id 生成器は in-memory / system のデフォルトを
//!   持ち、本番実装は同じ seam から差し替える

use std::sync::Arc;

use crate::app::config::EngineConfig;
use crate::app::dispatcher::WorkerGroup;
use crate::app::queue::WorkQueue;
use crate::app::service::TaskService;
use crate::impls::{InMemoryQuotaLedger, InMemoryTaskStore};
use crate::ports::{
    Clock, IdGenerator, ImageProcessor, QuotaLedger, SystemClock, TaskStore, UlidGenerator,
};

/// Builds an [`Engine`]: the service facade plus its running worker group.
///
/// # 使用例
/// ```ignore
/// let engine = EngineBuilder::new()
///     .processor(Arc::new(MyProcessor))
///     .config(EngineConfig { workers: 8, ..Default::default() })
///     .build()?;
/// let service = engine.service();
/// ```
pub struct EngineBuilder {
    config: EngineConfig,
    store: Option<Arc<dyn TaskStore>>,
    ledger: Option<Arc<dyn QuotaLedger>>,
    processor: Option<Arc<dyn ImageProcessor>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
}

/// BuildError はエンジン構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("an image processor must be provided before build()")]
    MissingProcessor,

    #[error("worker count must be at least 1")]
    NoWorkers,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            store: None,
            ledger: None,
            processor: None,
            clock: None,
            ids: None,
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn ledger(mut self, ledger: Arc<dyn QuotaLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// The external processor. Required.
    pub fn processor(mut self, processor: Arc<dyn ImageProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Validate the wiring, spawn the worker group, and hand back the engine.
    pub fn build(self) -> Result<Engine, BuildError> {
        let processor = self.processor.ok_or(BuildError::MissingProcessor)?;
        if self.config.workers == 0 {
            return Err(BuildError::NoWorkers);
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(SystemClock)));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryTaskStore::new(Arc::clone(&clock))));
        let ledger = self
            .ledger
            .unwrap_or_else(|| Arc::new(InMemoryQuotaLedger::new()));

        let queue = Arc::new(WorkQueue::new());
        let workers = WorkerGroup::spawn(
            &self.config,
            Arc::clone(&queue),
            Arc::clone(&store),
            processor,
        );
        let service = Arc::new(TaskService::new(store, ledger, ids, clock, queue));

        Ok(Engine { service, workers })
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The assembled engine: one service facade, one running worker group.
pub struct Engine {
    service: Arc<TaskService>,
    workers: WorkerGroup,
}

impl Engine {
    pub fn service(&self) -> Arc<TaskService> {
        Arc::clone(&self.service)
    }

    /// Stop taking new work, let in-flight tasks settle, and wait for the
    /// workers to exit.
    pub async fn shutdown(self) {
        self.workers.shutdown_and_join().await;
    }
}

//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（データベース、外部 AI 処理系、時計）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - TaskStore / QuotaLedger が正本（source of truth）
//! - ImageProcessor は信用しない外部協力者
//! - Clock / IdGenerator はテスト容易性のための差し替え点

pub mod clock;
pub mod id_generator;
pub mod processor;
pub mod quota_ledger;
pub mod task_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::processor::{ImageProcessor, ProcessError, ProcessOutput, ProcessRequest};
pub use self::quota_ledger::{LedgerError, QuotaLedger};
pub use self::task_store::{Page, StatusUpdate, StoreError, TaskFilter, TaskStore};

//! App - アプリケーション層
//!
//! ports を組み合わせてエンジンの振る舞いを実装します。
//!
//! # 主要コンポーネント
//! - **EngineBuilder / Engine**: 構築とワイヤリング（Fail-fast 検証付き）
//! - **TaskService**: 呼び出し側へ公開する操作面
//! - **WorkQueue**: 作成からワーカーへの task_id 配送
//! - **WorkerGroup**: 実行ループ（pop -> claim -> validate -> process -> settle）
//! - **EngineConfig**: ワーカー数と processor タイムアウト

pub mod builder;
pub mod config;
pub mod dispatcher;
pub mod queue;
pub mod service;

pub use self::builder::{BuildError, Engine, EngineBuilder};
pub use self::config::EngineConfig;
pub use self::dispatcher::WorkerGroup;
pub use self::queue::WorkQueue;
pub use self::service::{CANCELLED_BY_USER, TaskService};

//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports の in-memory 実装を含めます。
//!
//! # 本番用実装
//! 本番用の実装は別クレートに配置します：
//! - `pictor-pg`: PostgresTaskStore / PostgresQuotaLedger
//! - `pictor-openai`: OpenAiImageProcessor

pub mod memory_ledger;
pub mod memory_store;

pub use self::memory_ledger::InMemoryQuotaLedger;
pub use self::memory_store::InMemoryTaskStore;

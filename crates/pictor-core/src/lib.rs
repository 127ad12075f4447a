//! pictor-core
//!
//! Core building blocks for the Pictor image-task engine: task lifecycle
//! orchestration and per-user quota enforcement.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task_type, status, task, quota, views, errors）
//! - **ports**: 抽象化レイヤー（TaskStore, QuotaLedger, ImageProcessor, Clock, IdGenerator）
//! - **app**: アプリケーションロジック（builder, service, queue, dispatcher, config）
//! - **impls**: 実装（InMemoryTaskStore など開発用）
//!
//! # 正しさの土台
//! タスクの状態遷移は全て TaskStore の**条件付き更新**を通る。キャンセルと
//! ディスパッチ完了が自由に競合しても、勝者が一人決まり、敗者の書き込みは
//! no-op になる。配額の check-and-deduct は (user, category) キーごとに
//! 原子的で、部分控除は起きない。

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;

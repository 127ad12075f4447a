//! QuotaLedger port - 消費量の台帳
//!
//! # 設計原則
//! - `try_consume` は同一 (user, category) キーに対して**原子的**：
//!   同時呼び出しの合計が残量を超える場合、到着順に満たせる分だけが
//!   成功し、残りは部分控除なしで失敗する。
//! - 読み取りは一貫したスナップショット（remaining = total - used が
//!   途中状態を観測しない）。
//! - `reset_at` 以降のリセットは外部のスケジューラの仕事。台帳側の
//!   インターフェースは `grant`（total の再設定 + used のゼロ化）のみ。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{QuotaType, QuotaView, UserId};

/// Ledger-level failures, mapped 1:1 onto the caller-facing error kinds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("quota not found for category '{0}'")]
    QuotaNotFound(QuotaType),

    #[error("insufficient quota: requested {requested}, remaining {remaining}")]
    Insufficient { requested: u32, remaining: u32 },
}

/// Quota ledger port: atomic check-and-deduct counters per (user, category).
#[async_trait]
pub trait QuotaLedger: Send + Sync {
    /// Deduct `amount` from the pair's budget, returning the new remainder.
    /// Fails cleanly (no partial deduction) when the row is missing or the
    /// remainder is too small.
    async fn try_consume(
        &self,
        user_id: UserId,
        quota_type: &QuotaType,
        amount: u32,
    ) -> Result<u32, LedgerError>;

    /// Current totals for one category, or all categories of the user when
    /// `quota_type` is None. Each row is a consistent snapshot.
    async fn get_remaining(&self, user_id: UserId, quota_type: Option<&QuotaType>)
    -> Vec<QuotaView>;

    /// Upsert a row: set a new total, zero `used_quota`, record `reset_at`.
    /// This is the seeding path and the interface for the external
    /// periodic reset job.
    async fn grant(
        &self,
        user_id: UserId,
        quota_type: QuotaType,
        total_quota: u32,
        reset_at: Option<DateTime<Utc>>,
    );
}

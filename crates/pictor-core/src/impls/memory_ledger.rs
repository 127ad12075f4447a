//! InMemoryQuotaLedger - 開発・テスト用の台帳

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{QuotaRecord, QuotaType, QuotaView, UserId};
use crate::ports::{LedgerError, QuotaLedger};

/// In-memory quota ledger.
///
/// # 実装詳細
/// - 単一の Mutex が全行を覆うので、同一キーへの check-and-deduct は
///   到着順に直列化される（行ロック相当の粒度は本番実装の仕事）。
/// - 読み取りも同じロックを通すため、torn read は起きない。
pub struct InMemoryQuotaLedger {
    rows: Mutex<HashMap<(UserId, QuotaType), QuotaRecord>>,
}

impl InMemoryQuotaLedger {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryQuotaLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuotaLedger for InMemoryQuotaLedger {
    async fn try_consume(
        &self,
        user_id: UserId,
        quota_type: &QuotaType,
        amount: u32,
    ) -> Result<u32, LedgerError> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .get_mut(&(user_id, quota_type.clone()))
            .ok_or_else(|| LedgerError::QuotaNotFound(quota_type.clone()))?;

        row.consume(amount).map_err(|remaining| LedgerError::Insufficient {
            requested: amount,
            remaining,
        })
    }

    async fn get_remaining(
        &self,
        user_id: UserId,
        quota_type: Option<&QuotaType>,
    ) -> Vec<QuotaView> {
        let rows = self.rows.lock().await;
        let mut views: Vec<QuotaView> = rows
            .values()
            .filter(|row| row.user_id == user_id)
            .filter(|row| quota_type.is_none_or(|ty| &row.quota_type == ty))
            .map(QuotaView::from)
            .collect();

        // 出力順を安定させる
        views.sort_by(|a, b| a.quota_type.as_str().cmp(b.quota_type.as_str()));
        views
    }

    async fn grant(
        &self,
        user_id: UserId,
        quota_type: QuotaType,
        total_quota: u32,
        reset_at: Option<DateTime<Utc>>,
    ) {
        let mut rows = self.rows.lock().await;
        rows.insert(
            (user_id, quota_type.clone()),
            QuotaRecord::new(user_id, quota_type, total_quota, reset_at),
        );
    }
}

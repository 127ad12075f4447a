//! Domain identifiers (strongly-typed IDs).
//!
//! # ULID ベースの ID + ジェネリック実装
//! ID には ULID (Universally Unique Lexicographically Sortable Identifier)
//! を使用します。
//!
//! - **時刻でソート可能**: timestamp が先頭にあるため、生成順序でソートできる
//!   （タスク一覧の「新しい順」はこの性質に依存する）
//! - **分散生成可能**: 調整なしで複数ノードで生成できる
//! - **UUID互換**: 128-bit で UUID と同じサイズ
//!
//! `Id<T>` はジェネリック型で共通実装を提供しつつ、`T` は実行時には使わない
//! （PhantomData）マーカー型としてコンパイル時の型安全性を提供します。
//! `TaskId` と `UserId` は混同できません。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"task-", "user-"）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    /// Display で使うプレフィックス（例: "task-"）
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// `T` は PhantomData で、実行時にはメモリを消費しませんが、
/// コンパイル時に型安全性を提供します。
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    /// ULID から Id を作成
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    /// 内部の ULID を取得
    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Task のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {}

impl IdMarker for Task {
    fn prefix() -> &'static str {
        "task-"
    }
}

/// User のマーカー型
///
/// ユーザーのライフサイクルは外部の認証システムが管理する。
/// このコアは外部キーとして ID だけを持つ。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum User {}

impl IdMarker for User {
    fn prefix() -> &'static str {
        "user-"
    }
}

/// Identifier of a Task (create/status/cancel unit).
pub type TaskId = Id<Task>;

/// Identifier of a User (owner of tasks and quotas).
pub type UserId = Id<User>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let ulid1 = Ulid::new();
        let ulid2 = Ulid::new();

        let task = TaskId::from_ulid(ulid1);
        let user = UserId::from_ulid(ulid2);

        assert_eq!(task.as_ulid(), ulid1);
        assert_eq!(user.as_ulid(), ulid2);

        // Display のプレフィックスが正しいことを確認
        assert!(task.to_string().starts_with("task-"));
        assert!(user.to_string().starts_with("user-"));

        // The whole point: you can't accidentally mix these types.
        // (This is a compile-time property, so we just keep it as a comment.)
        // let _: TaskId = user; // <- does not compile
    }

    #[test]
    fn ulid_ids_are_sortable() {
        // ULID は時刻ベースなので、生成順序でソート可能
        let id1 = TaskId::from_ulid(Ulid::new());
        std::thread::sleep(std::time::Duration::from_millis(2)); // 時刻が進むのを待つ
        let id2 = TaskId::from_ulid(Ulid::new());

        assert!(id1 < id2);
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let task_id = TaskId::from_ulid(Ulid::new());

        // #[serde(transparent)] なので JSON 上は ULID 文字列そのもの
        let serialized = serde_json::to_string(&task_id).unwrap();
        assert!(serialized.starts_with('"'));

        let deserialized: TaskId = serde_json::from_str(&serialized).unwrap();
        assert_eq!(task_id, deserialized);
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        use std::mem::size_of;

        // Id<T> のサイズは Ulid と同じ（16 bytes）
        assert_eq!(size_of::<TaskId>(), size_of::<Ulid>());
        assert_eq!(size_of::<UserId>(), size_of::<Ulid>());
    }
}

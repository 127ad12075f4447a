//! ImageProcessor port - 外部の画像処理系
//!
//! このコアから見た外部 AI 処理（摳圖、精修、背景合成、生成、高解像度化、
//! 翻訳）はすべてこの一枚の trait の向こう側にある。呼び出しは信用しない：
//! 任意に時間がかかり、任意のエラーで失敗しうる。タイムアウトは
//! dispatcher 側で `tokio::time::timeout` により課す。

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::TaskType;

/// What the dispatcher hands to the external processor.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub task_type: TaskType,

    /// Source image reference. Present for every type except designer;
    /// the dispatcher validates this before calling.
    pub input_ref: Option<String>,

    /// The task's open parameter payload (prompt, scale, target_lang, ...).
    pub parameters: Map<String, Value>,
}

/// What a successful processing call produces.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Reference to the result image.
    pub output_ref: String,

    /// Extra result metadata to merge into the task's parameters
    /// (e.g. extracted/translated text). Often empty.
    pub result: Map<String, Value>,
}

impl ProcessOutput {
    pub fn new(output_ref: impl Into<String>) -> Self {
        Self {
            output_ref: output_ref.into(),
            result: Map::new(),
        }
    }

    pub fn with_result(mut self, key: impl Into<String>, value: Value) -> Self {
        self.result.insert(key.into(), value);
        self
    }
}

/// Opaque processing failure. The message lands in the task's
/// `error_message`; it is never surfaced as a request-level error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ProcessError(String);

impl ProcessError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The external processor, one implementation per deployment (HTTP client
/// to a provider, a local model runner, a mock in tests).
#[async_trait]
pub trait ImageProcessor: Send + Sync {
    async fn process(&self, request: ProcessRequest) -> Result<ProcessOutput, ProcessError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn output_builder_collects_result_metadata() {
        let output = ProcessOutput::new("img://out.png")
            .with_result("original_text", json!("Hello"))
            .with_result("translated_text", json!("Bonjour"));

        assert_eq!(output.output_ref, "img://out.png");
        assert_eq!(output.result.len(), 2);
        assert_eq!(output.result["translated_text"], json!("Bonjour"));
    }
}

//! Task type: the closed set of image operations this engine dispatches.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of image work a task requests.
///
/// This is a closed set: the dispatcher selects the external processing
/// routine by this value, and per-type input rules live here so that
/// creation-time and dispatch-time validation cannot drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// 萬物摳圖 - subject isolation / background removal.
    Matting,

    /// 產品精修 - product photo retouching (brightness/contrast/saturation knobs).
    Retouch,

    /// 背景合成 - background synthesis from a prompt.
    Background,

    /// 設計師 - free-form image generation from a prompt (no source image).
    Designer,

    /// 通用變清晰 - upscaling (`scale` parameter, default 2).
    Upscale,

    /// 圖片翻譯 - in-image text translation (`target_lang` parameter, default "en").
    Translate,
}

impl TaskType {
    /// All task types, in a stable order (seeding, demos, tests).
    pub const ALL: [TaskType; 6] = [
        TaskType::Matting,
        TaskType::Retouch,
        TaskType::Background,
        TaskType::Designer,
        TaskType::Upscale,
        TaskType::Translate,
    ];

    /// Wire name (matches the serde representation).
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Matting => "matting",
            TaskType::Retouch => "retouch",
            TaskType::Background => "background",
            TaskType::Designer => "designer",
            TaskType::Upscale => "upscale",
            TaskType::Translate => "translate",
        }
    }

    /// Does this type need a source image reference?
    ///
    /// Designer generates from a prompt alone; every other type edits an
    /// existing image.
    pub fn requires_input_ref(self) -> bool {
        !matches!(self, TaskType::Designer)
    }

    /// Does this type need a `prompt` key in its parameters?
    pub fn requires_prompt(self) -> bool {
        matches!(self, TaskType::Background | TaskType::Designer)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::matting(TaskType::Matting, true, false)]
    #[case::retouch(TaskType::Retouch, true, false)]
    #[case::background(TaskType::Background, true, true)]
    #[case::designer(TaskType::Designer, false, true)]
    #[case::upscale(TaskType::Upscale, true, false)]
    #[case::translate(TaskType::Translate, true, false)]
    fn input_rules(#[case] ty: TaskType, #[case] needs_image: bool, #[case] needs_prompt: bool) {
        assert_eq!(ty.requires_input_ref(), needs_image);
        assert_eq!(ty.requires_prompt(), needs_prompt);
    }

    #[test]
    fn serializes_as_snake_case() {
        let s = serde_json::to_string(&TaskType::Upscale).unwrap();
        assert_eq!(s, "\"upscale\"");

        let back: TaskType = serde_json::from_str("\"matting\"").unwrap();
        assert_eq!(back, TaskType::Matting);
    }

    #[test]
    fn display_matches_wire_name() {
        for ty in TaskType::ALL {
            assert_eq!(ty.to_string(), serde_json::to_value(ty).unwrap());
        }
    }
}

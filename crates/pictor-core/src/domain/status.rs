//! Task status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a task.
///
/// State transitions:
/// - Pending -> Processing -> Completed
/// - Pending -> Processing -> Failed
/// - Pending -> Failed (cancelled before a worker claimed it)
///
/// Completed and Failed are terminal: no further transitions, ever.
/// The store enforces this with its conditional update, not the dispatcher,
/// so a late completion cannot clobber a cancellation (and vice versa).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, waiting for a worker to claim it.
    Pending,

    /// Claimed by a worker; the external processor may be running.
    Processing,

    /// Finished with an output reference.
    Completed,

    /// Finished with an error message (processor failure, invalid input,
    /// or user cancellation).
    Failed,
}

impl TaskStatus {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Is `next` a legal successor of `self`?
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Processing)
                | (TaskStatus::Pending, TaskStatus::Failed)
                | (TaskStatus::Processing, TaskStatus::Completed)
                | (TaskStatus::Processing, TaskStatus::Failed)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::pending(TaskStatus::Pending, false)]
    #[case::processing(TaskStatus::Processing, false)]
    #[case::completed(TaskStatus::Completed, true)]
    #[case::failed(TaskStatus::Failed, true)]
    fn terminal_states(#[case] status: TaskStatus, #[case] terminal: bool) {
        assert_eq!(status.is_terminal(), terminal);
    }

    #[rstest]
    #[case::claim(TaskStatus::Pending, TaskStatus::Processing, true)]
    #[case::cancel_pending(TaskStatus::Pending, TaskStatus::Failed, true)]
    #[case::complete(TaskStatus::Processing, TaskStatus::Completed, true)]
    #[case::fail(TaskStatus::Processing, TaskStatus::Failed, true)]
    #[case::skip_processing(TaskStatus::Pending, TaskStatus::Completed, false)]
    #[case::resurrect_completed(TaskStatus::Completed, TaskStatus::Processing, false)]
    #[case::resurrect_failed(TaskStatus::Failed, TaskStatus::Processing, false)]
    #[case::rewrite_terminal(TaskStatus::Completed, TaskStatus::Failed, false)]
    fn legal_transitions(#[case] from: TaskStatus, #[case] to: TaskStatus, #[case] ok: bool) {
        assert_eq!(from.can_transition_to(to), ok);
    }

    #[test]
    fn terminal_states_have_no_successors() {
        for from in [TaskStatus::Completed, TaskStatus::Failed] {
            for to in [
                TaskStatus::Pending,
                TaskStatus::Processing,
                TaskStatus::Completed,
                TaskStatus::Failed,
            ] {
                assert!(!from.can_transition_to(to));
            }
        }
    }

    #[test]
    fn serializes_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::Processing).unwrap(),
            "\"processing\""
        );
    }
}

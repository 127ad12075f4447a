//! Domain model (IDs, task records, quota ledger rows, views, errors).

pub mod errors;
pub mod ids;
pub mod quota;
pub mod status;
pub mod task;
pub mod task_type;
pub mod views;

pub use self::errors::CoreError;
pub use self::ids::{Id, IdMarker, TaskId, UserId};
pub use self::quota::{QuotaRecord, QuotaType};
pub use self::status::TaskStatus;
pub use self::task::TaskRecord;
pub use self::task_type::TaskType;
pub use self::views::{QuotaView, TaskStatusView, TaskView};

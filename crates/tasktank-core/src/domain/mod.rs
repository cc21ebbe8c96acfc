//! Domain model (ids, task entity, wire input, errors, events).

pub mod errors;
pub mod events;
pub mod ids;
pub mod input;
pub mod task;

pub use self::errors::{PersistenceError, TaskStoreError, ValidationError, ValidationRule};
pub use self::events::TaskEvent;
pub use self::ids::TaskId;
pub use self::input::{NewTaskInput, TaskPatchInput};
pub use self::task::{NewTask, Task, TaskPatch, TaskPriority, TaskStatus};

// Follow-up run scheduling via a Cloud Tasks queue.

#[path = "cloud_tasks.rs"]
pub mod cloud_tasks;

pub use cloud_tasks::{CloudTasksScheduler, TasksConfig};

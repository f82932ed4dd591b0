//! Application services for the task hierarchy and its lifecycle.

mod error;
mod gateway;
mod hierarchy;
mod lifecycle;
mod progress;

pub use error::{TaskServiceError, TaskServiceResult};
pub(crate) use gateway::{TaskGateway, WorkingSet};
pub use hierarchy::{
    CreateTaskRequest, RemovalOutcome, TaskDetails, TaskHierarchyService, UpdateTaskRequest,
};
pub use lifecycle::TaskLifecycleService;
pub use progress::ProgressAggregator;

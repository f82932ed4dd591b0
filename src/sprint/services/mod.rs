//! Application services for sprint planning and board views.

mod board_cache;
mod coordinator;
mod error;

pub use board_cache::BoardViewCache;
pub use coordinator::{
    CreateSprintRequest, SprintAssignmentCoordinator, SprintReassignment, SprintRemoval,
    UpdateSprintRequest,
};
pub use error::{SprintServiceError, SprintServiceResult};

//! Domain model for sprints and their Kanban boards.

mod board;
mod error;
mod filter;
mod ids;
mod sprint;

pub use board::{BOARD_COLUMNS, BoardColumn, SprintBoard, SprintSummary};
pub use error::{ParseSprintStatusError, SprintDomainError};
pub use filter::SprintFilter;
pub use ids::SprintId;
pub use sprint::{Sprint, SprintDraft, SprintStatus};

//! In-memory adapters for sprints.

mod sprint;

pub use sprint::InMemorySprintRepository;

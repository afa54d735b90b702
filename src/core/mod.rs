pub mod verdict;

pub use verdict::{resolve_status, ExecutionStatus, PhaseReport};

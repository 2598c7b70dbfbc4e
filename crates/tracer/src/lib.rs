//! The state-diff tracer: accumulates per-account deltas from the ordered event
//! stream of one traced execution and turns them into a minimal before/after report.

mod core;
mod interface;
mod utils;

pub use self::core::*;
pub use interface::*;
pub use utils::*;

//! Shared state access for the statediff workspace: the committed-state reader,
//! the value transfer primitive and account overrides used to seed in-memory state.

mod interface;
mod utils;

pub use interface::*;
pub use utils::*;

//! The `replay` subcommand: traces recorded transactions and prints their state diffs.

mod core;
mod interface;
mod utils;

pub use self::core::*;
pub use interface::*;

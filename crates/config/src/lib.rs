//! The `config` subcommand and the persisted CLI configuration.

mod core;
mod interface;
mod utils;

pub use self::core::*;
pub use interface::*;
pub(crate) use utils::*;

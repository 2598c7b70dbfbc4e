mod config;
mod hooks;
mod report;

pub use config::*;
pub use hooks::*;
pub use report::*;

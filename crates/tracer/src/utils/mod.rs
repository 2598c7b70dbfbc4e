/// Per-account delta store
pub mod diff;
/// Call-frame tracer
pub mod frame;

pub use diff::*;
pub use frame::*;

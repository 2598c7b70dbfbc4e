mod args;
mod transcript;

pub use args::*;
pub use transcript::*;

/// In-memory host state
pub mod db;
/// Committed-state reader
pub mod state;

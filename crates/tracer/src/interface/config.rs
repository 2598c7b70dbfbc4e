use eyre::{Result, WrapErr};
use revm::primitives::U256;
use serde::{Deserialize, Serialize};

/// Configuration of a [`StateDiffTracer`](crate::StateDiffTracer).
///
/// Parsed from the same raw JSON a host passes to its tracers, e.g.
/// `{"onlyTopCall": false, "withLog": false}`. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TracerConfig {
    /// Only keep the top-level frame in the call tree. Nested frames are still used to
    /// attribute balance, code and nonce changes.
    pub only_top_call: bool,
    /// Gas price used to charge the sender at transaction end when the host does not set
    /// one for the transaction. Defaults to one, i.e. the sender is charged the gas units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
}

impl TracerConfig {
    /// Parses a raw JSON tracer configuration. Empty input yields the default configuration.
    pub fn from_json(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw).wrap_err("invalid tracer configuration")
    }
}

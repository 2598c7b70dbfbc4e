use std::collections::BTreeMap;

use revm::primitives::{Address, Bytes, B256, U256};
use serde::{ser::SerializeMap, Serialize, Serializer};

/// Values that render as hex in the report.
pub trait HexValue {
    /// The rendered value.
    fn to_hex(&self) -> String;
}

impl HexValue for U256 {
    fn to_hex(&self) -> String {
        format!("{:#x}", self)
    }
}

impl HexValue for u64 {
    fn to_hex(&self) -> String {
        format!("{:#x}", self)
    }
}

impl HexValue for Bytes {
    fn to_hex(&self) -> String {
        hex::encode(self)
    }
}

impl HexValue for B256 {
    fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self))
    }
}

/// A value that differs before and after execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change<T> {
    /// The value before execution
    pub from: T,
    /// The value after execution
    pub to: T,
}

impl<T> Change<T> {
    /// Creates a new [`Change`].
    pub fn new(from: T, to: T) -> Self {
        Self { from, to }
    }
}

impl<T: HexValue> Serialize for Change<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("from", &self.from.to_hex())?;
        map.serialize_entry("to", &self.to.to_hex())?;
        map.end()
    }
}

/// Either an unchanged marker (rendered as `"="`) or the change itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Delta<T> {
    /// The value is the same before and after execution.
    #[default]
    Unchanged,
    /// The value changed.
    Changed(Change<T>),
}

impl<T> Delta<T> {
    /// Returns `true` if the value is unchanged.
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Delta::Unchanged)
    }
}

impl<T: HexValue> Serialize for Delta<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Delta::Unchanged => serializer.serialize_str("="),
            Delta::Changed(change) => change.serialize(serializer),
        }
    }
}

/// The before/after view of a single account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccountReport {
    /// Balance change, in wei
    pub balance: Delta<U256>,
    /// Nonce change
    pub nonce: Delta<u64>,
    /// Runtime bytecode change
    pub code: Delta<Bytes>,
    /// Changed storage slots only
    #[serde(serialize_with = "serialize_storage")]
    pub storage: BTreeMap<B256, Change<B256>>,
}

impl AccountReport {
    /// Returns `true` if nothing about the account changed.
    pub fn is_unchanged(&self) -> bool {
        self.balance.is_unchanged() &&
            self.nonce.is_unchanged() &&
            self.code.is_unchanged() &&
            self.storage.is_empty()
    }
}

fn serialize_storage<S: Serializer>(
    storage: &BTreeMap<B256, Change<B256>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(storage.len()))?;
    for (key, change) in storage {
        map.serialize_entry(&key.to_hex(), change)?;
    }
    map.end()
}

/// The state diff of one traced execution, keyed by account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateDiffReport(pub BTreeMap<Address, AccountReport>);

impl StateDiffReport {
    /// Returns the report of `address`, if the account was touched.
    pub fn get(&self, address: &Address) -> Option<&AccountReport> {
        self.0.get(address)
    }

    /// Iterates over the reported accounts in address order.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &AccountReport)> {
        self.0.iter()
    }

    /// The number of reported accounts.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no account was touched.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for StateDiffReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (address, account) in &self.0 {
            map.serialize_entry(&address.to_checksum(None), account)?;
        }
        map.end()
    }
}

/// The result handed back to the host once a trace completes. Only the state diff is
/// produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceResult {
    /// Per-account state diff
    pub state_diff: StateDiffReport,
}

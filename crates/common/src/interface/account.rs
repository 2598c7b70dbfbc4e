use std::collections::BTreeMap;

use revm::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// A partial account description. Fields left as `None` keep whatever value the
/// state already holds; storage slots are merged into the existing storage.
///
/// Used both to describe the prestate of a replay and to describe the writes the
/// execution engine applied to its state while a transaction ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountOverride {
    /// The account balance, in wei.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<U256>,
    /// The account nonce.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    /// The runtime bytecode. An empty sequence removes the code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Bytes>,
    /// Storage slots to write.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub storage: BTreeMap<B256, B256>,
}

impl AccountOverride {
    /// Returns `true` if applying this override would not change anything.
    pub fn is_empty(&self) -> bool {
        self.balance.is_none() &&
            self.nonce.is_none() &&
            self.code.is_none() &&
            self.storage.is_empty()
    }
}

/// The accounts a traced execution starts from.
pub type Prestate = BTreeMap<Address, AccountOverride>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_partial_accounts() {
        let prestate: Prestate = serde_json::from_str(
            r#"{
                "0x00000000000000000000000000000000000000aa": { "balance": "0x64", "nonce": 3 },
                "0x00000000000000000000000000000000000000bb": {
                    "code": "0xabcd",
                    "storage": {
                        "0x0000000000000000000000000000000000000000000000000000000000000001":
                        "0x0000000000000000000000000000000000000000000000000000000000000002"
                    }
                }
            }"#,
        )
        .unwrap();

        let sender = &prestate[&Address::with_last_byte(0xaa)];
        assert_eq!(sender.balance, Some(U256::from(100)));
        assert_eq!(sender.nonce, Some(3));
        assert!(sender.code.is_none());

        let contract = &prestate[&Address::with_last_byte(0xbb)];
        assert_eq!(contract.code.as_deref().map(|b| &b[..]), Some(&[0xab, 0xcd][..]));
        assert_eq!(
            contract.storage.get(&B256::with_last_byte(1)),
            Some(&B256::with_last_byte(2))
        );
    }

    #[test]
    fn empty_override() {
        assert!(AccountOverride::default().is_empty());
        assert!(!AccountOverride { nonce: Some(0), ..Default::default() }.is_empty());
    }
}

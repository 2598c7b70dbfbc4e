use std::collections::{btree_map, BTreeMap};

use alloy::primitives::I256;
use eyre::{eyre, Result};
use revm::primitives::{Address, Bytes, B256};
use statediff_common::state::StateReader;
use tracing::trace;

/// A before/after snapshot pair for a value whose absolute state must be remembered.
///
/// `before` is read from state exactly once, the first time the value is touched.
/// `after` is overwritten by every subsequent write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diff<T> {
    /// The value has not been touched during this execution.
    Untouched,
    /// The `before` value has been captured, but nothing has been written yet.
    Captured {
        /// The value at first touch.
        before: T,
    },
    /// The value has been written at least once.
    Changed {
        /// The value at first touch.
        before: T,
        /// The most recently written value.
        after: T,
    },
}

impl<T> Default for Diff<T> {
    fn default() -> Self {
        Self::Untouched
    }
}

impl<T> Diff<T> {
    /// Captures the `before` value with `read` unless it has been captured already.
    /// Returns whether this call captured it.
    pub fn capture(&mut self, read: impl FnOnce() -> Result<T>) -> Result<bool> {
        if !matches!(self, Diff::Untouched) {
            return Ok(false);
        }
        *self = Diff::Captured { before: read()? };
        Ok(true)
    }

    /// Sets the `after` value, capturing `before` with `read` first if needed.
    pub fn set(&mut self, after: T, read: impl FnOnce() -> Result<T>) -> Result<()> {
        let before = match std::mem::take(self) {
            // `self` is left untouched if the read fails
            Diff::Untouched => read()?,
            Diff::Captured { before } | Diff::Changed { before, .. } => before,
        };
        *self = Diff::Changed { before, after };
        Ok(())
    }

    /// The value captured at first touch.
    pub fn before(&self) -> Option<&T> {
        match self {
            Diff::Untouched => None,
            Diff::Captured { before } | Diff::Changed { before, .. } => Some(before),
        }
    }

    /// The most recently written value.
    pub fn after(&self) -> Option<&T> {
        match self {
            Diff::Changed { after, .. } => Some(after),
            _ => None,
        }
    }
}

impl<T: PartialEq> Diff<T> {
    /// Returns the `(before, after)` pair if the value was written and actually differs.
    pub fn changed(&self) -> Option<(&T, &T)> {
        match self {
            Diff::Changed { before, after } if before != after => Some((before, after)),
            _ => None,
        }
    }
}

/// Everything recorded for a single account over one traced execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountDiff {
    /// Signed sum of every balance change attributed to the account.
    pub balance_delta: I256,
    /// Number of nonce increments attributed to the account.
    pub nonce_delta: u64,
    /// Runtime bytecode snapshot pair.
    pub code: Diff<Bytes>,
    /// Snapshot pair per storage slot touched.
    pub storage: BTreeMap<B256, Diff<B256>>,
}

/// The diff store: one [`AccountDiff`] per touched account, created lazily on first touch
/// and never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountsDiff {
    accounts: BTreeMap<Address, AccountDiff>,
}

impl AccountsDiff {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures an entry exists for `address`. Returns whether this call created it.
    pub fn touch(&mut self, address: Address) -> bool {
        match self.accounts.entry(address) {
            btree_map::Entry::Occupied(_) => false,
            btree_map::Entry::Vacant(entry) => {
                trace!(address = ?address, "first touch");
                entry.insert(AccountDiff::default());
                true
            }
        }
    }

    fn account_mut(&mut self, address: Address) -> &mut AccountDiff {
        self.touch(address);
        self.accounts.entry(address).or_default()
    }

    /// Adds the signed `delta` to the balance delta of `address`.
    pub fn add_balance(&mut self, address: Address, delta: I256) -> Result<()> {
        let account = self.account_mut(address);
        account.balance_delta = account
            .balance_delta
            .checked_add(delta)
            .ok_or_else(|| eyre!("balance delta of {} overflows", address))?;
        trace!(address = ?address, delta = %delta, "recorded balance change");
        Ok(())
    }

    /// Attributes one nonce increment to `address`.
    pub fn increment_nonce(&mut self, address: Address) {
        self.account_mut(address).nonce_delta += 1;
        trace!(address = ?address, "recorded nonce increment");
    }

    /// Captures the code `before` snapshot of `address` without writing an `after` value.
    pub fn capture_code<S: StateReader + ?Sized>(
        &mut self,
        address: Address,
        state: &S,
    ) -> Result<()> {
        self.account_mut(address).code.capture(|| state.code(address))?;
        Ok(())
    }

    /// Records `code` as the latest code of `address`.
    pub fn set_code<S: StateReader + ?Sized>(
        &mut self,
        address: Address,
        code: Bytes,
        state: &S,
    ) -> Result<()> {
        self.account_mut(address).code.set(code, || state.code(address))?;
        trace!(address = ?address, "recorded code change");
        Ok(())
    }

    /// Records `value` as the latest value of slot `key` of `address`. The `before` value is
    /// captured the first time each key is seen, independently of when the account was
    /// first touched.
    pub fn set_storage<S: StateReader + ?Sized>(
        &mut self,
        address: Address,
        key: B256,
        value: B256,
        state: &S,
    ) -> Result<()> {
        self.account_mut(address)
            .storage
            .entry(key)
            .or_default()
            .set(value, || state.storage(address, key))?;
        trace!(address = ?address, key = ?key, value = ?value, "recorded storage write");
        Ok(())
    }

    /// Returns the entry for `address`, if it was touched.
    pub fn get(&self, address: &Address) -> Option<&AccountDiff> {
        self.accounts.get(address)
    }

    /// Iterates over the touched accounts in address order.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &AccountDiff)> {
        self.accounts.iter()
    }

    /// The number of touched accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns `true` if no account has been touched.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use revm::{
        db::{CacheDB, EmptyDB},
        primitives::{AccountInfo, Bytecode, U256},
    };

    use super::*;

    fn db_with_code(address: Address, code: &'static [u8]) -> CacheDB<EmptyDB> {
        let mut db = CacheDB::new(EmptyDB::default());
        let code = Bytecode::new_raw(Bytes::from_static(code));
        db.insert_account_info(
            address,
            AccountInfo { code_hash: code.hash_slow(), code: Some(code), ..Default::default() },
        );
        db
    }

    #[test]
    fn touch_is_idempotent() {
        let mut diff = AccountsDiff::new();
        let address = Address::with_last_byte(1);

        assert!(diff.touch(address));
        diff.increment_nonce(address);
        assert!(!diff.touch(address));
        assert_eq!(diff.get(&address).unwrap().nonce_delta, 1);
        assert_eq!(diff.len(), 1);
    }

    #[test]
    fn balance_deltas_accumulate() {
        let mut diff = AccountsDiff::new();
        let address = Address::with_last_byte(1);

        diff.add_balance(address, I256::try_from(30).unwrap()).unwrap();
        diff.add_balance(address, I256::try_from(-45).unwrap()).unwrap();

        assert_eq!(diff.get(&address).unwrap().balance_delta, I256::try_from(-15).unwrap());
    }

    #[test]
    fn code_before_is_captured_once() {
        let address = Address::with_last_byte(1);
        let mut db = db_with_code(address, &[0x01]);
        let mut diff = AccountsDiff::new();

        diff.set_code(address, Bytes::from_static(&[0x02]), &db).unwrap();

        // the host state moves on, the snapshot must not
        db = db_with_code(address, &[0x02]);
        diff.set_code(address, Bytes::new(), &db).unwrap();

        let code = &diff.get(&address).unwrap().code;
        assert_eq!(code.before(), Some(&Bytes::from_static(&[0x01])));
        assert_eq!(code.after(), Some(&Bytes::new()));
    }

    #[test]
    fn capture_then_set_keeps_captured_value() {
        let address = Address::with_last_byte(1);
        let empty = CacheDB::new(EmptyDB::default());
        let deployed = db_with_code(address, &[0xab, 0xcd]);
        let mut diff = AccountsDiff::new();

        diff.capture_code(address, &empty).unwrap();
        diff.capture_code(address, &deployed).unwrap();
        diff.set_code(address, Bytes::from_static(&[0xab, 0xcd]), &deployed).unwrap();

        let code = &diff.get(&address).unwrap().code;
        assert_eq!(code.changed(), Some((&Bytes::new(), &Bytes::from_static(&[0xab, 0xcd]))));
    }

    #[test]
    fn storage_before_is_captured_per_key() {
        let address = Address::with_last_byte(1);
        let mut db = CacheDB::new(EmptyDB::default());
        db.insert_account_storage(address, U256::from(1), U256::from(10)).unwrap();
        db.insert_account_storage(address, U256::from(2), U256::from(20)).unwrap();
        let mut diff = AccountsDiff::new();

        // the account is already touched when key 2 is first seen
        diff.set_storage(address, B256::with_last_byte(1), B256::with_last_byte(11), &db).unwrap();
        diff.set_storage(address, B256::with_last_byte(2), B256::with_last_byte(21), &db).unwrap();
        diff.set_storage(address, B256::with_last_byte(1), B256::with_last_byte(12), &db).unwrap();

        let storage = &diff.get(&address).unwrap().storage;
        assert_eq!(
            storage[&B256::with_last_byte(1)],
            Diff::Changed { before: B256::with_last_byte(10), after: B256::with_last_byte(12) }
        );
        assert_eq!(
            storage[&B256::with_last_byte(2)],
            Diff::Changed { before: B256::with_last_byte(20), after: B256::with_last_byte(21) }
        );
    }

    #[test]
    fn unchanged_values_are_not_reported_as_changed() {
        let mut value = Diff::Untouched;
        value.set(B256::with_last_byte(1), || Ok(B256::with_last_byte(1))).unwrap();
        assert!(value.changed().is_none());

        let captured = Diff::Captured { before: 1u8 };
        assert!(captured.changed().is_none());
        assert_eq!(captured.before(), Some(&1));
    }
}

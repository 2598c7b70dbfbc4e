use std::collections::BTreeMap;

use eyre::{eyre, Result};
use revm::primitives::Address;
use statediff_common::state::StateReader;

use crate::{AccountDiff, AccountReport, AccountsDiff, Change, Delta, StateDiffReport};

/// Materializes the before/after report from the accumulated diff.
///
/// Must run after execution completed. Balance and nonce are read from `state` once per
/// account, and only when the account's delta is non-zero; code and storage come entirely
/// from the snapshots captured at first touch.
pub fn generate_report<S: StateReader + ?Sized>(
    accounts: &AccountsDiff,
    state: &S,
) -> Result<StateDiffReport> {
    accounts
        .iter()
        .map(|(address, diff)| Ok((*address, account_report(*address, diff, state)?)))
        .collect::<Result<BTreeMap<_, _>>>()
        .map(StateDiffReport)
}

fn account_report<S: StateReader + ?Sized>(
    address: Address,
    diff: &AccountDiff,
    state: &S,
) -> Result<AccountReport> {
    let balance = if diff.balance_delta.is_zero() {
        Delta::Unchanged
    } else {
        let current = state.balance(address)?;
        let magnitude = diff.balance_delta.unsigned_abs();
        let before = if diff.balance_delta.is_negative() {
            current.checked_add(magnitude)
        } else {
            current.checked_sub(magnitude)
        }
        .ok_or_else(|| {
            eyre!(
                "balance delta {} of {} does not fit its current balance {}",
                diff.balance_delta,
                address,
                current
            )
        })?;
        Delta::Changed(Change::new(before, current))
    };

    let nonce = if diff.nonce_delta == 0 {
        Delta::Unchanged
    } else {
        let current = state.nonce(address)?;
        let before = current.checked_sub(diff.nonce_delta).ok_or_else(|| {
            eyre!(
                "nonce delta {} of {} exceeds its current nonce {}",
                diff.nonce_delta,
                address,
                current
            )
        })?;
        Delta::Changed(Change::new(before, current))
    };

    let code = diff
        .code
        .changed()
        .map(|(before, after)| Delta::Changed(Change::new(before.clone(), after.clone())))
        .unwrap_or_default();

    let storage = diff
        .storage
        .iter()
        .filter_map(|(key, value)| {
            value.changed().map(|(before, after)| (*key, Change::new(*before, *after)))
        })
        .collect();

    Ok(AccountReport { balance, nonce, code, storage })
}

#[cfg(test)]
mod tests {
    use alloy::primitives::I256;
    use revm::{
        db::{CacheDB, EmptyDB},
        primitives::{AccountInfo, Bytes, B256, U256},
    };

    use super::*;

    #[test]
    fn reconstructs_before_values_from_current_state() {
        let address = Address::with_last_byte(1);
        let mut db = CacheDB::new(EmptyDB::default());
        db.insert_account_info(
            address,
            AccountInfo { balance: U256::from(49), nonce: 6, ..Default::default() },
        );

        let mut accounts = AccountsDiff::new();
        accounts.add_balance(address, I256::try_from(-51).unwrap()).unwrap();
        accounts.increment_nonce(address);

        let report = generate_report(&accounts, &db).unwrap();
        let account = report.get(&address).unwrap();
        assert_eq!(account.balance, Delta::Changed(Change::new(U256::from(100), U256::from(49))));
        assert_eq!(account.nonce, Delta::Changed(Change::new(5, 6)));
        assert!(account.code.is_unchanged());
        assert!(account.storage.is_empty());
    }

    #[test]
    fn omits_storage_written_back_to_its_original_value() {
        let address = Address::with_last_byte(1);
        let mut db = CacheDB::new(EmptyDB::default());
        db.insert_account_storage(address, U256::from(1), U256::from(1)).unwrap();

        let mut accounts = AccountsDiff::new();
        accounts.set_storage(address, B256::with_last_byte(1), B256::with_last_byte(9), &db).unwrap();
        accounts.set_storage(address, B256::with_last_byte(1), B256::with_last_byte(1), &db).unwrap();
        accounts.set_storage(address, B256::with_last_byte(2), B256::with_last_byte(3), &db).unwrap();

        let report = generate_report(&accounts, &db).unwrap();
        let storage = &report.get(&address).unwrap().storage;
        assert_eq!(storage.len(), 1);
        assert_eq!(
            storage[&B256::with_last_byte(2)],
            Change::new(B256::ZERO, B256::with_last_byte(3))
        );
    }

    #[test]
    fn touched_but_unchanged_account_is_reported_unchanged() {
        let address = Address::with_last_byte(1);
        let db = CacheDB::new(EmptyDB::default());

        let mut accounts = AccountsDiff::new();
        accounts.add_balance(address, I256::ZERO).unwrap();
        accounts.capture_code(address, &db).unwrap();
        accounts.set_code(Address::with_last_byte(2), Bytes::new(), &db).unwrap();

        let report = generate_report(&accounts, &db).unwrap();
        assert_eq!(report.len(), 2);
        assert!(report.iter().all(|(_, account)| account.is_unchanged()));
    }

    #[test]
    fn inconsistent_delta_is_an_error() {
        let address = Address::with_last_byte(1);
        let db = CacheDB::new(EmptyDB::default());

        let mut accounts = AccountsDiff::new();
        accounts.add_balance(address, I256::try_from(10).unwrap()).unwrap();

        assert!(generate_report(&accounts, &db).is_err());
    }
}

use eyre::{eyre, OptionExt, Result};
use revm::{
    db::{CacheDB, EmptyDB, InMemoryDB},
    primitives::{Address, Bytecode, U256},
    DatabaseRef,
};
use tracing::trace;

use crate::{state::StateReader, AccountOverride, Prestate};

/// A state handle which can move value between two accounts.
pub trait TransferState: StateReader {
    /// Moves `amount` from `from` to `to`. Fails without writing anything if the
    /// sender cannot cover the amount.
    fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<()>;
}

impl<ExtDB> TransferState for CacheDB<ExtDB>
where
    ExtDB: DatabaseRef,
    ExtDB::Error: std::error::Error + Send + Sync + 'static,
{
    fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<()> {
        let sender_balance = self.load_account(from)?.info.balance;
        let remaining = sender_balance.checked_sub(amount).ok_or_else(|| {
            eyre!("insufficient balance for transfer: {} has {}, needs {}", from, sender_balance, amount)
        })?;

        if from == to {
            return Ok(());
        }

        let recipient_balance = self.load_account(to)?.info.balance;
        let credited =
            recipient_balance.checked_add(amount).ok_or_eyre("recipient balance overflow")?;

        self.load_account(from)?.info.balance = remaining;
        self.load_account(to)?.info.balance = credited;

        trace!(from = ?from, to = ?to, amount = %amount, "transferred value");

        Ok(())
    }
}

/// Applies `account` on top of whatever `db` currently holds for `address`.
pub fn apply_override<ExtDB>(
    db: &mut CacheDB<ExtDB>,
    address: Address,
    account: &AccountOverride,
) -> Result<()>
where
    ExtDB: DatabaseRef,
    ExtDB::Error: std::error::Error + Send + Sync + 'static,
{
    if account.is_empty() {
        trace!(address = ?address, "empty account override, nothing to apply");
        return Ok(());
    }

    if account.balance.is_some() || account.nonce.is_some() || account.code.is_some() {
        let mut info = db.basic_ref(address)?.unwrap_or_default();
        if let Some(balance) = account.balance {
            info.balance = balance;
        }
        if let Some(nonce) = account.nonce {
            info.nonce = nonce;
        }
        if let Some(code) = &account.code {
            let bytecode = Bytecode::new_raw(code.clone());
            info.code_hash = bytecode.hash_slow();
            info.code = Some(bytecode);
        }
        db.insert_account_info(address, info);
    }

    for (key, value) in &account.storage {
        db.insert_account_storage(
            address,
            U256::from_be_slice(key.as_slice()),
            U256::from_be_slice(value.as_slice()),
        )?;
    }

    trace!(address = ?address, slots = account.storage.len(), "applied account override");

    Ok(())
}

/// Builds an in-memory database holding exactly the accounts of `prestate`.
pub fn prestate_db(prestate: &Prestate) -> Result<InMemoryDB> {
    let mut db = CacheDB::new(EmptyDB::default());
    for (address, account) in prestate {
        apply_override(&mut db, *address, account)?;
    }
    Ok(db)
}

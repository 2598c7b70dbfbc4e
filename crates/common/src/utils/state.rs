use eyre::Result;
use revm::{
    primitives::{Address, Bytes, B256, KECCAK_EMPTY, U256},
    DatabaseRef,
};

/// Read access to committed state, as of the current point in execution.
///
/// Used both to capture the `before` side of a value the first time it is touched
/// and to read the `current` balances and nonces once execution has finished.
/// Missing accounts read as zero balance, zero nonce and empty code.
pub trait StateReader {
    /// Returns the balance of `address`.
    fn balance(&self, address: Address) -> Result<U256>;

    /// Returns the nonce of `address`.
    fn nonce(&self, address: Address) -> Result<u64>;

    /// Returns the runtime bytecode of `address`. No code is an empty sequence.
    fn code(&self, address: Address) -> Result<Bytes>;

    /// Returns the value of storage slot `key` of `address`.
    fn storage(&self, address: Address, key: B256) -> Result<B256>;
}

impl<DB> StateReader for DB
where
    DB: DatabaseRef,
    DB::Error: std::error::Error + Send + Sync + 'static,
{
    fn balance(&self, address: Address) -> Result<U256> {
        Ok(self.basic_ref(address)?.map(|info| info.balance).unwrap_or_default())
    }

    fn nonce(&self, address: Address) -> Result<u64> {
        Ok(self.basic_ref(address)?.map(|info| info.nonce).unwrap_or_default())
    }

    fn code(&self, address: Address) -> Result<Bytes> {
        let Some(info) = self.basic_ref(address)? else {
            return Ok(Bytes::new());
        };

        if let Some(code) = info.code {
            return Ok(code.original_bytes());
        }

        // the account only carries a hash, resolve it unless it is the empty hash
        if info.code_hash == KECCAK_EMPTY || info.code_hash == B256::ZERO {
            return Ok(Bytes::new());
        }

        Ok(self.code_by_hash_ref(info.code_hash)?.original_bytes())
    }

    fn storage(&self, address: Address, key: B256) -> Result<B256> {
        let value = self.storage_ref(address, U256::from_be_slice(key.as_slice()))?;
        Ok(B256::from(value.to_be_bytes::<32>()))
    }
}

#[cfg(test)]
mod tests {
    use revm::{
        db::{CacheDB, EmptyDB},
        primitives::{AccountInfo, Bytecode},
    };

    use super::*;

    #[test]
    fn missing_accounts_read_as_empty() {
        let db = CacheDB::new(EmptyDB::default());
        let address = Address::with_last_byte(1);

        assert_eq!(db.balance(address).unwrap(), U256::ZERO);
        assert_eq!(db.nonce(address).unwrap(), 0);
        assert!(db.code(address).unwrap().is_empty());
        assert_eq!(db.storage(address, B256::with_last_byte(7)).unwrap(), B256::ZERO);
    }

    #[test]
    fn reads_account_fields() {
        let mut db = CacheDB::new(EmptyDB::default());
        let address = Address::with_last_byte(1);
        let code = Bytecode::new_raw(Bytes::from_static(&[0x60, 0x00]));

        db.insert_account_info(
            address,
            AccountInfo { balance: U256::from(5), nonce: 2, code_hash: code.hash_slow(), code: Some(code) },
        );
        db.insert_account_storage(address, U256::from(1), U256::from(0xff)).unwrap();

        assert_eq!(db.balance(address).unwrap(), U256::from(5));
        assert_eq!(db.nonce(address).unwrap(), 2);
        assert_eq!(db.code(address).unwrap(), Bytes::from_static(&[0x60, 0x00]));
        assert_eq!(
            db.storage(address, B256::with_last_byte(1)).unwrap(),
            B256::with_last_byte(0xff)
        );
    }
}

use accrue_store::ledger::{LedgerBatch, LedgerStore};
use accrue_store::StoreError;
use accrue_types::AccountId;
use heed::{types::Bytes, Database, Env};
use std::sync::Arc;

use crate::LmdbError;

pub struct LmdbLedgerStore {
    env: Arc<Env>,
    accounts_db: Database<Bytes, Bytes>,
    meta_db: Database<Bytes, Bytes>,
}

impl LmdbLedgerStore {
    pub fn new(
        env: Arc<Env>,
        accounts_db: Database<Bytes, Bytes>,
        meta_db: Database<Bytes, Bytes>,
    ) -> Self {
        Self {
            env,
            accounts_db,
            meta_db,
        }
    }
}

impl LedgerStore for LmdbLedgerStore {
    fn iter_accounts(&self) -> Result<Vec<(AccountId, Vec<u8>)>, StoreError> {
        let txn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for item in self.accounts_db.iter(&txn).map_err(LmdbError::from)? {
            let (key, val) = item.map_err(LmdbError::from)?;
            let raw = std::str::from_utf8(key)
                .map_err(|e| LmdbError::Corruption(format!("account key: {}", e)))?;
            let id = AccountId::new(raw)
                .map_err(|e| LmdbError::Corruption(format!("account key: {}", e)))?;
            results.push((id, val.to_vec()));
        }
        Ok(results)
    }

    fn get_meta(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let txn = self.env.read_txn().map_err(LmdbError::from)?;
        let value = self.meta_db.get(&txn, key).map_err(LmdbError::from)?;
        Ok(value.map(<[u8]>::to_vec))
    }

    fn apply_batch(&self, batch: LedgerBatch) -> Result<(), StoreError> {
        let mut txn = self.env.write_txn().map_err(LmdbError::from)?;
        if batch.replace_accounts {
            self.accounts_db.clear(&mut txn).map_err(LmdbError::from)?;
        }
        for id in &batch.delete_accounts {
            self.accounts_db
                .delete(&mut txn, id.as_bytes())
                .map_err(LmdbError::from)?;
        }
        for (id, record) in &batch.put_accounts {
            self.accounts_db
                .put(&mut txn, id.as_bytes(), record)
                .map_err(LmdbError::from)?;
        }
        for (key, value) in &batch.put_meta {
            self.meta_db
                .put(&mut txn, key, value)
                .map_err(LmdbError::from)?;
        }
        // Dropping an uncommitted txn aborts it, so an error above writes nothing.
        txn.commit().map_err(LmdbError::from)?;
        tracing::debug!(
            puts = batch.put_accounts.len(),
            deletes = batch.delete_accounts.len(),
            replaced = batch.replace_accounts,
            "applied ledger batch"
        );
        Ok(())
    }
}

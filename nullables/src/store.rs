//! Nullable ledger store: thread-safe in-memory storage for testing.

use accrue_store::ledger::{LedgerBatch, LedgerStore};
use accrue_store::StoreError;
use accrue_types::AccountId;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Tables {
    accounts: HashMap<AccountId, Vec<u8>>,
    meta: HashMap<Vec<u8>, Vec<u8>>,
}

/// An in-memory [`LedgerStore`].
///
/// Both tables sit behind one lock so a batch is applied atomically.
/// [`fail_writes`](Self::fail_writes) makes every later batch fail, for
/// testing how callers handle a storage outage.
#[derive(Default)]
pub struct NullLedgerStore {
    tables: Mutex<Tables>,
    fail_writes: Mutex<bool>,
}

impl NullLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap_or_else(|e| e.into_inner()) = fail;
    }

    pub fn account_count(&self) -> usize {
        self.tables
            .lock()
            .map(|t| t.accounts.len())
            .unwrap_or_default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("null store lock poisoned".into()))
    }
}

impl LedgerStore for NullLedgerStore {
    fn iter_accounts(&self) -> Result<Vec<(AccountId, Vec<u8>)>, StoreError> {
        Ok(self
            .tables()?
            .accounts
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect())
    }

    fn get_meta(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.tables()?.meta.get(key).cloned())
    }

    fn apply_batch(&self, batch: LedgerBatch) -> Result<(), StoreError> {
        if *self.fail_writes.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(StoreError::Backend("writes disabled".into()));
        }
        let mut tables = self.tables()?;
        if batch.replace_accounts {
            tables.accounts.clear();
        }
        for id in batch.delete_accounts {
            tables.accounts.remove(&id);
        }
        for (id, record) in batch.put_accounts {
            tables.accounts.insert(id, record);
        }
        for (key, value) in batch.put_meta {
            tables.meta.insert(key, value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> AccountId {
        AccountId::new(s).unwrap()
    }

    #[test]
    fn batch_puts_and_deletes() {
        let store = NullLedgerStore::new();
        let mut batch = LedgerBatch::new();
        batch.put_account(id("alice"), vec![1]);
        batch.put_account(id("bob"), vec![2]);
        batch.put_meta(b"k", vec![9]);
        store.apply_batch(batch).unwrap();
        assert_eq!(store.account_count(), 2);
        assert_eq!(store.get_meta(b"k").unwrap(), Some(vec![9]));

        let mut batch = LedgerBatch::new();
        batch.delete_account(id("alice"));
        store.apply_batch(batch).unwrap();
        assert_eq!(store.iter_accounts().unwrap(), vec![(id("bob"), vec![2])]);
    }

    #[test]
    fn replacing_batch_drops_unlisted_accounts() {
        let store = NullLedgerStore::new();
        let mut batch = LedgerBatch::new();
        batch.put_account(id("alice"), vec![1]);
        batch.put_account(id("bob"), vec![2]);
        store.apply_batch(batch).unwrap();

        let mut batch = LedgerBatch::replacing_accounts();
        batch.put_account(id("carol"), vec![3]);
        store.apply_batch(batch).unwrap();
        assert_eq!(store.iter_accounts().unwrap(), vec![(id("carol"), vec![3])]);
    }

    #[test]
    fn failed_batch_changes_nothing() {
        let store = NullLedgerStore::new();
        store.fail_writes(true);
        let mut batch = LedgerBatch::new();
        batch.put_account(id("alice"), vec![1]);
        assert!(store.apply_batch(batch).is_err());
        assert_eq!(store.account_count(), 0);
    }
}

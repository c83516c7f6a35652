use accrue_types::AccountId;
use crate::StoreError;

/// A set of writes applied atomically by [`LedgerStore::apply_batch`].
///
/// Account records and meta values are opaque bytes so the store does not
/// depend on the ledger crate; the ledger encodes its own types.
#[derive(Clone, Debug, Default)]
pub struct LedgerBatch {
    /// Empty the accounts table before any other write in the batch.
    pub replace_accounts: bool,
    pub put_accounts: Vec<(AccountId, Vec<u8>)>,
    pub delete_accounts: Vec<AccountId>,
    pub put_meta: Vec<(Vec<u8>, Vec<u8>)>,
}

impl LedgerBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// A batch whose account records become the whole accounts table.
    pub fn replacing_accounts() -> Self {
        Self {
            replace_accounts: true,
            ..Self::default()
        }
    }

    pub fn put_account(&mut self, id: AccountId, record: Vec<u8>) {
        self.put_accounts.push((id, record));
    }

    pub fn delete_account(&mut self, id: AccountId) {
        self.delete_accounts.push(id);
    }

    pub fn put_meta(&mut self, key: &[u8], value: Vec<u8>) {
        self.put_meta.push((key.to_vec(), value));
    }

    pub fn is_empty(&self) -> bool {
        !self.replace_accounts
            && self.put_accounts.is_empty()
            && self.delete_accounts.is_empty()
            && self.put_meta.is_empty()
    }
}

/// Store trait for persisting accrual ledger state to durable storage.
pub trait LedgerStore {
    fn iter_accounts(&self) -> Result<Vec<(AccountId, Vec<u8>)>, StoreError>;

    fn get_meta(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Apply every write in `batch` or none of them.
    fn apply_batch(&self, batch: LedgerBatch) -> Result<(), StoreError>;
}

impl<T: LedgerStore + ?Sized> LedgerStore for std::sync::Arc<T> {
    fn iter_accounts(&self) -> Result<Vec<(AccountId, Vec<u8>)>, StoreError> {
        (**self).iter_accounts()
    }

    fn get_meta(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get_meta(key)
    }

    fn apply_batch(&self, batch: LedgerBatch) -> Result<(), StoreError> {
        (**self).apply_batch(batch)
    }
}

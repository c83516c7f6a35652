//! LMDB environment setup.

use crate::ledger::LmdbLedgerStore;
use crate::LmdbError;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use std::path::Path;
use std::sync::Arc;

const MAX_DBS: u32 = 2;

/// Wraps the LMDB environment and its database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    accounts_db: Database<Bytes, Bytes>,
    meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment in the directory `path`.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path).map_err(|e| LmdbError::Io(e.to_string()))?;

        // SAFETY: each partition opens its data directory exactly once, and
        // nothing else maps the same files.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let accounts_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some("accounts"))?;
        let meta_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");
        Ok(Self {
            env: Arc::new(env),
            accounts_db,
            meta_db,
        })
    }

    pub fn ledger_store(&self) -> LmdbLedgerStore {
        LmdbLedgerStore::new(Arc::clone(&self.env), self.accounts_db, self.meta_db)
    }
}

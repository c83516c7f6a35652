use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("corrupt record: {0}")]
    Corruption(String),
}

impl From<heed::Error> for LmdbError {
    fn from(e: heed::Error) -> Self {
        LmdbError::Heed(e.to_string())
    }
}

impl From<LmdbError> for accrue_store::StoreError {
    fn from(e: LmdbError) -> Self {
        match e {
            LmdbError::Corruption(msg) => accrue_store::StoreError::Corruption(msg),
            other => accrue_store::StoreError::Backend(other.to_string()),
        }
    }
}

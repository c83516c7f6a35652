//! Validation errors for the fundamental types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    #[error("invalid account id {0:?}: {1}")]
    InvalidAccountId(String, &'static str),

    #[error("invalid partition id {0:?}: {1}")]
    InvalidPartitionId(String, &'static str),
}

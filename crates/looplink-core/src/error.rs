use thiserror::Error;

/// Outcomes of ledger store operations.
///
/// Conflicts are explicit variants rather than caught exceptions: the
/// engine branches on them to pick the replay or retry path.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The idempotency key already has a committed record. The caller
    /// must fall back to the replay path.
    #[error("idempotency key '{key}' already has a committed record")]
    DuplicateKey { key: String },

    /// The shopper row changed between read and commit. Safe to retry
    /// the whole read-modify-write.
    #[error("shopper '{shopper_id}' changed between read and commit")]
    VersionConflict { shopper_id: String },

    /// Unrecoverable persistence failure.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Ledger engine errors surfaced to callers.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The reward code is not in the catalog. Terminal for the request.
    #[error("unknown reward code '{code}'")]
    UnknownReward { code: String },

    /// The shopper cannot afford the reward. Terminal for the request;
    /// no state was mutated.
    #[error(
        "insufficient balance: reward '{reward_code}' costs {cost}, shopper '{shopper_id}' has {balance}"
    )]
    InsufficientBalance {
        shopper_id: String,
        reward_code: String,
        cost: u64,
        balance: u64,
    },

    /// No shopper with this id has earned stickers yet.
    #[error("shopper '{id}' not found")]
    ShopperNotFound { id: String },

    /// Concurrent write collision. Idempotency makes a caller retry safe.
    #[error("storage conflict on '{key}', safe to retry")]
    StorageConflict { key: String },

    /// Persistence failure. Idempotency makes a caller retry safe.
    #[error("storage failure: {0}")]
    Storage(String),

    /// Reward catalog configuration could not be loaded.
    #[error("reward catalog configuration invalid: {0}")]
    Catalog(String),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey { key } => Self::StorageConflict { key },
            StoreError::VersionConflict { shopper_id } => {
                Self::StorageConflict { key: shopper_id }
            }
            StoreError::Backend(message) => Self::Storage(message),
        }
    }
}

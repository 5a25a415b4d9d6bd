//! Error types for the object pool

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Pool exhausted - maximum number of objects are in use")]
    Exhausted,

    #[error("Timed out after {0:?} waiting for an idle object")]
    Timeout(std::time::Duration),

    #[error("Factory failed to create an object: {0}")]
    FactoryCreateFailed(String),

    #[error("Pool is closed")]
    PoolClosed,

    #[error("Object was not borrowed from this pool")]
    NotOwnedByThisPool,

    #[error("Newly created object failed activation or validation")]
    ValidationFailed,

    #[error("Invalid pool configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Failed to start the evictor thread: {0}")]
    EvictorStartFailed(String),

    #[error("Operation was cancelled")]
    Cancelled,
}

pub type PoolResult<T> = Result<T, PoolError>;

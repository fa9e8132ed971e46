//! Error types for the station registry and the service layer

use posto_common::DecisionError;
use thiserror::Error;

use crate::store::StoreError;

/// Registry error type
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The backing store could not be read or written
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] StoreError),

    /// A persisted entry does not match the expected schema
    ///
    /// Reads recover from this by treating the entry as empty, so it is only
    /// reported through [`crate::registry::StationListing`] and the logs.
    #[error("malformed persisted data under '{key}': {reason}")]
    MalformedPersistedData { key: String, reason: String },

    /// A station carries a NaN or infinite value; nothing was written
    #[error("station {id} has a non-finite {field}")]
    NonFiniteValue { id: String, field: &'static str },

    #[error("failed to encode station collection: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Decision(#[from] DecisionError),

    #[error("station name must not be blank")]
    InvalidName,

    #[error("invalid {field} price: {value}")]
    InvalidPrice { field: &'static str, value: f64 },

    #[error("location unavailable: a new station needs coordinates")]
    LocationUnavailable,

    #[error("station not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, RegistryError>;

//! Store error types.
//!
//! Missing ids and keys are never errors. Errors only come from the
//! serialization boundary and from diagnostic dump sinks.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to encode value for key '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("value for key '{key}' is not a valid {expected}: {source}")]
    Decode {
        key: String,
        expected: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write dump entry: {0}")]
    Io(#[from] std::io::Error),
}

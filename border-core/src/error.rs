//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug, PartialEq)]
pub enum BorderError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),

    /// The task identifier is not registered.
    #[error("Unknown task: {0}")]
    UnknownTask(String),

    /// An environment index outside of the batch.
    #[error("Environment index {index} out of range (num_envs={num_envs})")]
    InvalidEnvIndex {
        /// The requested index.
        index: usize,
        /// The number of environments in the batch.
        num_envs: usize,
    },

    /// The leading dimension of a batched value does not match the expected one.
    #[error("Batch size mismatch in {name}: expected {expected}, got {actual}")]
    BatchSizeMismatch {
        /// Name of the mismatched value.
        name: String,
        /// Expected batch size.
        expected: usize,
        /// Actual batch size.
        actual: usize,
    },
}

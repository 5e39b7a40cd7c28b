//! Error types for budgetmesh

use thiserror::Error;

/// Main error type for budgetmesh operations
#[derive(Error, Debug)]
pub enum Error {
    /// The input buffers do not describe a valid triangle mesh. Fatal, no
    /// partial result is produced.
    #[error("Malformed mesh: {0}")]
    MalformedMesh(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    /// The background worker could not be started or went away before
    /// reporting a result.
    #[error("Worker error: {0}")]
    Worker(String),
}

impl Error {
    /// Shorthand for a [`Error::MalformedMesh`] with a formatted message
    pub fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedMesh(message.into())
    }
}

/// Result type alias for budgetmesh operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = Error::malformed("triangle 3 references vertex 9");
        assert_eq!(err.to_string(), "Malformed mesh: triangle 3 references vertex 9");

        let err = Error::InvalidConfig("budget must be positive".to_string());
        assert!(err.to_string().contains("budget must be positive"));
    }
}

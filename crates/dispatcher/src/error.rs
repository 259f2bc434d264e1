//! Gateway error types

use thiserror::Error;

/// Gateway-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Listener could not be bound
    #[error("failed to bind '{addr}': {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Server stopped with an error
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    /// Domain error
    #[error("race error: {0}")]
    Race(#[from] contracts::RaceError),
}

impl DispatcherError {
    pub fn bind(addr: impl Into<String>, source: std::io::Error) -> Self {
        Self::Bind {
            addr: addr.into(),
            source,
        }
    }
}

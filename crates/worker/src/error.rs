use thiserror::Error;

/// Result alias for worker bootstrap operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that terminate a worker process. All are fatal; none are retried
/// internally.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid worker or service configuration: malformed JSON, an invalid
    /// lease ttl, a zero-endpoint distributed service, or a declared
    /// endpoint with no bound handler.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The worker ordinal exceeds the shard list length.
    #[error("worker ordinal {ordinal} is out of range, the shard list has {shards} entries")]
    OutOfRange {
        /// The 1-based ordinal this process was launched with.
        ordinal: usize,
        /// The shard list length.
        shards: usize,
    },

    /// Service graph resolution or instantiation failed.
    #[error(transparent)]
    Service(#[from] helix_service::Error),

    /// The coordination backend rejected or could not complete the
    /// registration.
    #[error("registration failed: {0}")]
    Registration(#[source] helix_discovery::Error),

    /// Minting a registered endpoint failed.
    #[error("endpoint binding failed: {0}")]
    Binding(#[source] helix_discovery::Error),

    /// A startup hook failed.
    #[error("startup hook '{hook}' failed: {source}")]
    Hook {
        /// The failing hook's name.
        hook: String,
        /// The hook's error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The serve loop failed.
    #[error("serve failed: {0}")]
    Serve(#[source] helix_discovery::Error),
}

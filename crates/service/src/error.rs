use thiserror::Error;

/// Result alias for service model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while resolving or instantiating services.
#[derive(Debug, Error)]
pub enum Error {
    /// A named service or graph node is absent.
    #[error("service '{name}' not found")]
    NotFound {
        /// The missing service name.
        name: String,
    },

    /// The service definition or registry state is invalid.
    #[error("invalid service definition: {0}")]
    Configuration(String),
}

use thiserror::Error;

/// Result alias for deploy API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by a cluster deploy API.
#[derive(Debug, Error)]
pub enum Error {
    /// The named resource does not exist in the namespace.
    #[error("deploy resource '{namespace}/{name}' not found")]
    NotFound {
        /// Namespace looked up in.
        namespace: String,
        /// Resource name looked up.
        name: String,
    },

    /// Any other API failure.
    #[error("deploy api error: {0}")]
    Api(String),
}

impl Error {
    /// Whether this error is the distinct not-found condition, which
    /// callers treat as an expected absence rather than a failure.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

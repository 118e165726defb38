use thiserror::Error;

/// Result alias for discovery backend operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by a coordination/discovery backend.
#[derive(Debug, Error)]
pub enum Error {
    /// The backend rejected or could not complete a registration.
    #[error("registration failed: {0}")]
    Registration(String),

    /// A backend resource (endpoint, component) was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A handler failed while processing a request.
    #[error("handler error: {0}")]
    Handler(String),

    /// The serve loop failed.
    #[error("endpoint error: {0}")]
    Endpoint(String),
}

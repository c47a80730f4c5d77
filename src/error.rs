use thiserror::Error;

/// Failures surfaced to whoever drives an operation. Messages are shown inline to the user.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email already registered")]
    EmailTaken,

    #[error("You must be logged in")]
    Unauthenticated,

    #[error("Only the uploader can change this resource")]
    NotOwner,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("This resource is private to its college")]
    AccessDenied,

    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

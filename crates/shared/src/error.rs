//! Application-wide error types.
//!
//! Ledger rule violations have their own taxonomy in `boveda-core`; these
//! cover the request envelope around them and startup failures.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// The request carried no usable actor identity.
    #[error("X-Actor-Id header is required")]
    MissingActor,

    /// The `Idempotency-Key` header was present but unusable.
    #[error("Idempotency-Key must be a non-empty visible ASCII string")]
    InvalidIdempotencyKey,

    /// No route matches the request path.
    #[error("No route for {0}")]
    RouteNotFound(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::MissingActor => 401,
            Self::InvalidIdempotencyKey => 400,
            Self::RouteNotFound(_) => 404,
            Self::Config(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MissingActor => "MISSING_ACTOR",
            Self::InvalidIdempotencyKey => "INVALID_IDEMPOTENCY_KEY",
            Self::RouteNotFound(_) => "ROUTE_NOT_FOUND",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

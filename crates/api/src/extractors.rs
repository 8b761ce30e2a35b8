//! Request extractors.

use axum::{extract::FromRequestParts, http::request::Parts, response::Response};

use boveda_shared::{AppError, types::OperationId};

use crate::error::app_error_response;

/// Header carrying the client's operation key.
pub const IDEMPOTENCY_HEADER: &str = "idempotency-key";

/// Optional client operation key from the `Idempotency-Key` header.
#[derive(Debug, Clone, Default)]
pub struct IdempotencyKey(pub Option<OperationId>);

impl<S> FromRequestParts<S> for IdempotencyKey
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(IDEMPOTENCY_HEADER) else {
            return Ok(Self(None));
        };
        value
            .to_str()
            .ok()
            .and_then(|v| OperationId::new(v).ok())
            .map(|key| Self(Some(key)))
            .ok_or_else(|| app_error_response(&AppError::InvalidIdempotencyKey))
    }
}

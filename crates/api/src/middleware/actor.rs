//! Actor identification for ledger commands.
//!
//! Authentication happens upstream; this layer only requires the caller to
//! name the actor every recorded change is attributed to.

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use boveda_shared::{AppError, types::ActorId};

use crate::error::app_error_response;

/// Header carrying the acting user.
pub const ACTOR_HEADER: &str = "x-actor-id";

fn missing_actor() -> Response {
    app_error_response(&AppError::MissingActor)
}

/// Middleware that rejects requests without an actor and stores it in
/// request extensions for handlers.
pub async fn actor_middleware(mut request: Request, next: Next) -> Response {
    let actor = request
        .headers()
        .get(ACTOR_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| ActorId::new(value).ok());

    let Some(actor) = actor else {
        return missing_actor();
    };

    request.extensions_mut().insert(actor);
    next.run(request).await
}

/// Extractor for the acting user.
#[derive(Debug, Clone)]
pub struct Actor(pub ActorId);

impl Actor {
    /// Returns the actor id.
    #[must_use]
    pub fn id(&self) -> ActorId {
        self.0.clone()
    }
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ActorId>()
            .cloned()
            .map(Actor)
            .ok_or_else(missing_actor)
    }
}

//! Actor identity handed over by the upstream authentication layer.
//!
//! Authentication itself happens before requests reach this service; the
//! gateway forwards the authenticated actor in two headers which are parsed
//! here. Every mutating operation records the actor id for attribution.

use crate::errors::ServiceError;
use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLES_HEADER: &str = "x-actor-roles";

/// Authenticated actor extracted from the forwarded identity headers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedActor {
    pub actor_id: Uuid,
    pub roles: Vec<String>,
}

impl AuthenticatedActor {
    pub fn new(actor_id: Uuid) -> Self {
        Self {
            actor_id,
            roles: Vec::new(),
        }
    }

    /// Check if the actor has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    fn from_parts(parts: &Parts) -> Result<Self, AuthError> {
        let raw_id = parts
            .headers
            .get(ACTOR_ID_HEADER)
            .ok_or(AuthError::MissingAuth)?
            .to_str()
            .map_err(|_| AuthError::InvalidActorId)?;
        let actor_id = Uuid::parse_str(raw_id.trim()).map_err(|_| AuthError::InvalidActorId)?;

        let roles = parts
            .headers
            .get(ACTOR_ROLES_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self { actor_id, roles })
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Actor id is not a valid UUID")]
    InvalidActorId,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            Self::MissingAuth => "Authentication required",
            Self::InvalidActorId => "Invalid actor identity",
        };
        ServiceError::Unauthorized(message.to_string()).into_response()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedActor
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_parts(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn extracts_actor_and_roles() {
        let id = Uuid::new_v4();
        let mut parts = parts(&[
            (ACTOR_ID_HEADER, &id.to_string()),
            (ACTOR_ROLES_HEADER, "admin, procurement ,"),
        ]);
        let actor = AuthenticatedActor::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(actor.actor_id, id);
        assert_eq!(actor.roles, vec!["admin", "procurement"]);
        assert!(actor.has_role("ADMIN"));
    }

    #[tokio::test]
    async fn missing_or_malformed_identity_is_unauthorized() {
        let mut missing = parts(&[]);
        let err = AuthenticatedActor::from_request_parts(&mut missing, &())
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);

        let mut malformed = parts(&[(ACTOR_ID_HEADER, "not-a-uuid")]);
        let err = AuthenticatedActor::from_request_parts(&mut malformed, &())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidActorId));
    }
}

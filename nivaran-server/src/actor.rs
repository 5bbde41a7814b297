//! Actor-context extraction. Authentication itself is out of scope: a
//! gateway in front of this service verifies the caller and forwards the
//! identity as headers. Malformed contexts are rejected with 400.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use nivaran_core::actor::{ActorContext, Role};
use nivaran_core::types::ActorType;

pub const HEADER_ROLE: &str = "x-actor-role";
pub const HEADER_ID: &str = "x-actor-id";
pub const HEADER_DEPARTMENT: &str = "x-actor-department";

/// Extractor wrapper around the engine's `ActorContext`.
pub struct Actor(pub ActorContext);

fn bad_request(message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "validation", "message": message })),
    )
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let role: Role = header(HEADER_ROLE)
            .ok_or_else(|| bad_request("missing x-actor-role header"))?
            .parse()
            .map_err(|_| bad_request("unrecognized x-actor-role"))?;

        let user_id = header(HEADER_ID);
        if role != Role::System && user_id.is_none() {
            return Err(bad_request("missing x-actor-id header"));
        }

        Ok(Actor(ActorContext {
            actor_type: if role == Role::System {
                ActorType::System
            } else {
                ActorType::User
            },
            user_id,
            role,
            department_id: header(HEADER_DEPARTMENT),
        }))
    }
}

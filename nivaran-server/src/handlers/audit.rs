//! Read-only audit queries, chronological ascending.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use nivaran_core::error::EngineError;
use nivaran_core::types::{AuditAction, AuditEntity, AuditEvent};

use crate::error::ApiResult;
use crate::state::AppState;

pub async fn for_complaint(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<AuditEvent>>> {
    Ok(Json(
        state
            .engine
            .audit_sink()
            .for_entity(AuditEntity::Complaint, &id.to_string())
            .await?,
    ))
}

#[derive(Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

pub async fn recent(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> ApiResult<Json<Vec<AuditEvent>>> {
    Ok(Json(
        state
            .engine
            .audit_sink()
            .recent(query.limit.unwrap_or(50).min(500))
            .await?,
    ))
}

pub async fn by_action(
    State(state): State<AppState>,
    Path(action): Path<String>,
) -> ApiResult<Json<Vec<AuditEvent>>> {
    let action: AuditAction = action
        .parse()
        .map_err(|e: String| EngineError::validation("action", e))?;
    Ok(Json(state.engine.audit_sink().by_action(action).await?))
}

pub async fn by_actor(
    State(state): State<AppState>,
    Path(actor_id): Path<String>,
) -> ApiResult<Json<Vec<AuditEvent>>> {
    Ok(Json(state.engine.audit_sink().by_actor(&actor_id).await?))
}

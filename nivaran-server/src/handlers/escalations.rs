//! Escalation read surface and the explicit admin sweep trigger.

use axum::extract::State;
use axum::Json;

use nivaran_core::actor::Role;
use nivaran_core::error::EngineError;
use nivaran_core::scheduler::{EscalationStats, SweepReport};
use nivaran_core::types::Complaint;

use crate::actor::Actor;
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn overdue(State(state): State<AppState>) -> ApiResult<Json<Vec<Complaint>>> {
    Ok(Json(state.scheduler.overdue().await?))
}

pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<EscalationStats>> {
    Ok(Json(state.scheduler.stats().await?))
}

pub async fn trigger(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> ApiResult<Json<SweepReport>> {
    if !actor.is_admin() && !actor.is_system() {
        return Err(EngineError::unauthorized(
            actor.role,
            "trigger escalation sweep",
            &[Role::Admin, Role::SuperAdmin],
        )
        .into());
    }
    Ok(Json(state.scheduler.sweep(None).await?))
}

//! In-app inbox endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use nivaran_core::types::Notification;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxQuery {
    pub recipient_id: String,
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<usize>,
}

pub async fn inbox(
    State(state): State<AppState>,
    Query(query): Query<InboxQuery>,
) -> ApiResult<Json<Vec<Notification>>> {
    Ok(Json(
        state
            .engine
            .notifier()
            .inbox(
                &query.recipient_id,
                query.unread_only,
                query.limit.unwrap_or(50).min(500),
            )
            .await?,
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadQuery {
    pub recipient_id: String,
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<MarkReadQuery>,
) -> ApiResult<StatusCode> {
    state
        .engine
        .notifier()
        .mark_read(id, &query.recipient_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

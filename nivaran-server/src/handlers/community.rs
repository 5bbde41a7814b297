//! Community endpoints: upvotes, nearby search, trending.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use nivaran_core::error::EngineError;
use nivaran_core::types::{Complaint, GeoPoint};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpvoteQuery {
    pub citizen_id: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpvoteResponse {
    pub complaint_id: Uuid,
    pub upvote_count: u32,
}

pub async fn upvote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UpvoteQuery>,
) -> ApiResult<Json<UpvoteResponse>> {
    let coords = match (query.latitude, query.longitude) {
        (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
        _ => None,
    };
    let count = state
        .resolver
        .upvote(id, &query.citizen_id, coords)
        .await?;
    Ok(Json(UpvoteResponse {
        complaint_id: id,
        upvote_count: count,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveUpvoteQuery {
    pub citizen_id: String,
}

pub async fn remove_upvote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<RemoveUpvoteQuery>,
) -> ApiResult<Json<UpvoteResponse>> {
    let count = state.resolver.remove_upvote(id, &query.citizen_id).await?;
    Ok(Json(UpvoteResponse {
        complaint_id: id,
        upvote_count: count,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: Option<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyEntry {
    pub complaint: Complaint,
    pub distance_meters: f64,
}

pub async fn nearby(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> ApiResult<Json<Vec<NearbyEntry>>> {
    let at = GeoPoint {
        lat: query.latitude,
        lng: query.longitude,
    };
    if !at.is_valid() {
        return Err(EngineError::validation("coordinates", "out of range").into());
    }
    let entries = state
        .resolver
        .nearby(at, query.radius_meters)
        .await?
        .into_iter()
        .map(|(complaint, distance_meters)| NearbyEntry {
            complaint,
            distance_meters,
        })
        .collect();
    Ok(Json(entries))
}

#[derive(Deserialize)]
pub struct TrendingQuery {
    pub limit: Option<usize>,
}

pub async fn trending(
    State(state): State<AppState>,
    Query(query): Query<TrendingQuery>,
) -> ApiResult<Json<Vec<Complaint>>> {
    Ok(Json(
        state
            .resolver
            .trending(query.limit.unwrap_or(10).min(100))
            .await?,
    ))
}

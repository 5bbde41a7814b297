//! Complaint lifecycle endpoints: intake, transitions, routing, rating,
//! proofs, signoffs, disputes.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use nivaran_core::engine::ComplaintDetails;
use nivaran_core::error::{EngineError, ExternalService};
use nivaran_core::intake::{IntakeOutcome, IntakeRequest};
use nivaran_core::types::*;

use crate::actor::Actor;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComplaintRequest {
    pub title: String,
    pub description: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub upvote_on_duplicate: bool,
}

fn coords_from(latitude: Option<f64>, longitude: Option<f64>) -> Result<Option<GeoPoint>, ApiError> {
    match (latitude, longitude) {
        (None, None) => Ok(None),
        (Some(lat), Some(lng)) => Ok(Some(GeoPoint { lat, lng })),
        _ => Err(EngineError::validation(
            "coordinates",
            "latitude and longitude must be given together",
        )
        .into()),
    }
}

pub async fn create(
    State(state): State<AppState>,
    Path(citizen_id): Path<String>,
    Json(body): Json<NewComplaintRequest>,
) -> ApiResult<(StatusCode, Json<IntakeOutcome>)> {
    let outcome = state
        .intake
        .submit(IntakeRequest {
            citizen_id,
            title: body.title,
            description: body.description,
            location: body.location,
            coords: coords_from(body.latitude, body.longitude)?,
            image: None,
            upvote_on_duplicate: body.upvote_on_duplicate,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn create_with_image(
    State(state): State<AppState>,
    Path(citizen_id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<IntakeOutcome>)> {
    let mut title = None;
    let mut description = None;
    let mut location = None;
    let mut latitude = None;
    let mut longitude = None;
    let mut image = None;
    let mut upvote_on_duplicate = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| EngineError::validation("multipart", e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => title = Some(read_text(field).await?),
            "description" => description = Some(read_text(field).await?),
            "location" => location = Some(read_text(field).await?),
            "latitude" => latitude = Some(read_f64(field, "latitude").await?),
            "longitude" => longitude = Some(read_f64(field, "longitude").await?),
            "upvoteOnDuplicate" => {
                upvote_on_duplicate = read_text(field).await?.trim() == "true";
            }
            "image" => {
                let mime = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| EngineError::validation("image", e.to_string()))?;
                image = Some((bytes.to_vec(), mime));
            }
            _ => {}
        }
    }

    let outcome = state
        .intake
        .submit(IntakeRequest {
            citizen_id,
            title: title.ok_or_else(|| EngineError::validation("title", "missing"))?,
            description: description
                .ok_or_else(|| EngineError::validation("description", "missing"))?,
            location: location.unwrap_or_default(),
            coords: coords_from(latitude, longitude)?,
            image,
            upvote_on_duplicate,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| EngineError::validation("multipart", e.to_string()).into())
}

async fn read_f64(
    field: axum::extract::multipart::Field<'_>,
    name: &'static str,
) -> Result<f64, ApiError> {
    read_text(field)
        .await?
        .trim()
        .parse()
        .map_err(|_| EngineError::validation(name, "not a number").into())
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Complaint>> {
    Ok(Json(state.engine.get(id).await?))
}

pub async fn details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ComplaintDetails>> {
    Ok(Json(state.engine.details(id).await?))
}

pub async fn allowed_transitions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Actor(actor): Actor,
) -> ApiResult<Json<Vec<ComplaintStatus>>> {
    Ok(Json(state.engine.allowed_transitions(id, &actor).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChangeRequest {
    pub target_state: String,
    pub reason: Option<String>,
}

pub async fn change_state(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Actor(actor): Actor,
    Json(body): Json<StateChangeRequest>,
) -> ApiResult<Json<Complaint>> {
    let target: ComplaintStatus = body
        .target_state
        .parse()
        .map_err(|e: String| EngineError::validation("targetState", e))?;
    Ok(Json(
        state.engine.transition(id, target, &actor, body.reason).await?,
    ))
}

pub async fn start(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Actor(actor): Actor,
) -> ApiResult<Json<Complaint>> {
    Ok(Json(state.engine.start(id, &actor).await?))
}

pub async fn resolve(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Actor(actor): Actor,
) -> ApiResult<Json<Complaint>> {
    Ok(Json(state.engine.resolve(id, &actor).await?))
}

pub async fn close(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Actor(actor): Actor,
) -> ApiResult<Json<Complaint>> {
    Ok(Json(
        state
            .engine
            .transition(id, ComplaintStatus::Closed, &actor, None)
            .await?,
    ))
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Actor(actor): Actor,
) -> ApiResult<Json<Complaint>> {
    Ok(Json(
        state
            .engine
            .transition(id, ComplaintStatus::Cancelled, &actor, None)
            .await?,
    ))
}

#[derive(Deserialize)]
pub struct RateRequest {
    pub rating: u8,
    pub feedback: Option<String>,
}

pub async fn rate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Actor(actor): Actor,
    Json(body): Json<RateRequest>,
) -> ApiResult<Json<Complaint>> {
    Ok(Json(
        state
            .engine
            .record_rating(id, body.rating, body.feedback, &actor)
            .await?,
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignDepartmentRequest {
    pub department_id: String,
    pub reason: Option<String>,
}

pub async fn assign_department(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Actor(actor): Actor,
    Json(body): Json<AssignDepartmentRequest>,
) -> ApiResult<Json<Complaint>> {
    Ok(Json(
        state
            .engine
            .manual_route(id, &body.department_id, &actor, body.reason)
            .await?,
    ))
}

pub async fn assign_staff(
    State(state): State<AppState>,
    Path((id, staff_id)): Path<(Uuid, String)>,
    Actor(actor): Actor,
) -> ApiResult<Json<Complaint>> {
    Ok(Json(state.engine.assign_staff(id, &staff_id, &actor).await?))
}

#[derive(Deserialize)]
pub struct SlaOverrideQuery {
    pub days: u32,
    pub reason: Option<String>,
}

pub async fn override_sla(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Actor(actor): Actor,
    Query(query): Query<SlaOverrideQuery>,
) -> ApiResult<Json<Complaint>> {
    Ok(Json(
        state
            .engine
            .override_sla(id, query.days, &actor, query.reason)
            .await?,
    ))
}

#[derive(Deserialize)]
pub struct CommentRequest {
    pub text: String,
}

pub async fn add_comment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Actor(actor): Actor,
    Json(body): Json<CommentRequest>,
) -> ApiResult<(StatusCode, Json<AuditEvent>)> {
    let event = state.engine.add_comment(id, &actor, &body.text).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

// ── Proofs & signoff ──

pub async fn submit_proof(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Actor(actor): Actor,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ResolutionProof>)> {
    let mut remarks = None;
    let mut latitude = None;
    let mut longitude = None;
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| EngineError::validation("multipart", e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "remarks" => remarks = Some(read_text(field).await?),
            "latitude" => latitude = Some(read_f64(field, "latitude").await?),
            "longitude" => longitude = Some(read_f64(field, "longitude").await?),
            "image" => {
                let mime = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| EngineError::validation("image", e.to_string()))?;
                image = Some((bytes.to_vec(), mime));
            }
            _ => {}
        }
    }

    // A resolution proof without its image is worthless: storage failure is
    // fatal to this operation, unlike intake.
    let (bytes, mime) =
        image.ok_or_else(|| EngineError::validation("image", "proof image is required"))?;
    let image_key = state
        .objects
        .put(&bytes, &mime)
        .await
        .map_err(|e| EngineError::external(ExternalService::Storage, e))?;

    let proof = state
        .engine
        .submit_proof(
            id,
            &actor,
            &image_key,
            remarks.as_deref().unwrap_or_default(),
            coords_from(latitude, longitude)?,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(proof)))
}

pub async fn list_proofs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<ResolutionProof>>> {
    Ok(Json(state.engine.resolution_proofs(id).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignoffRequest {
    pub is_accepted: bool,
    pub rating: Option<u8>,
    pub feedback: Option<String>,
    pub dispute_reason: Option<String>,
    pub dispute_image_s3_key: Option<String>,
}

pub async fn signoff(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Actor(actor): Actor,
    Json(body): Json<SignoffRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if body.is_accepted {
        let rating = body
            .rating
            .ok_or_else(|| EngineError::validation("rating", "required for acceptance"))?;
        let complaint = state.engine.accept(id, &actor, rating, body.feedback).await?;
        Ok(Json(serde_json::to_value(complaint).map_err(|e| {
            EngineError::Storage(anyhow::Error::from(e))
        })?))
    } else {
        let reason = body
            .dispute_reason
            .ok_or_else(|| EngineError::validation("disputeReason", "required for dispute"))?;
        let signoff = state
            .engine
            .dispute(id, &actor, &reason, body.dispute_image_s3_key)
            .await?;
        Ok(Json(serde_json::to_value(signoff).map_err(|e| {
            EngineError::Storage(anyhow::Error::from(e))
        })?))
    }
}

pub async fn approve_dispute(
    State(state): State<AppState>,
    Path((id, signoff_id)): Path<(Uuid, Uuid)>,
    Actor(actor): Actor,
) -> ApiResult<Json<Complaint>> {
    Ok(Json(
        state.engine.approve_dispute(id, signoff_id, &actor).await?,
    ))
}

#[derive(Deserialize)]
pub struct RejectQuery {
    pub reason: Option<String>,
}

pub async fn reject_dispute(
    State(state): State<AppState>,
    Path((id, signoff_id)): Path<(Uuid, Uuid)>,
    Actor(actor): Actor,
    Query(query): Query<RejectQuery>,
) -> ApiResult<Json<Complaint>> {
    Ok(Json(
        state
            .engine
            .reject_dispute(
                id,
                signoff_id,
                &actor,
                query.reason.as_deref().unwrap_or("rejected"),
            )
            .await?,
    ))
}

// ── Duplicate check ──

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCheckQuery {
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: Option<f64>,
}

pub async fn check_duplicates(
    State(state): State<AppState>,
    Query(query): Query<DuplicateCheckQuery>,
) -> ApiResult<Json<Vec<nivaran_core::duplicate::DuplicateCandidate>>> {
    let at = GeoPoint {
        lat: query.latitude,
        lng: query.longitude,
    };
    if !at.is_valid() {
        return Err(EngineError::validation("coordinates", "out of range").into());
    }
    Ok(Json(
        state
            .resolver
            .check(&query.description, at, query.radius_meters)
            .await?,
    ))
}

// ── Lists ──

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub citizen_id: Option<String>,
    pub department_id: Option<String>,
    pub status: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Complaint>>> {
    if let Some(citizen_id) = &query.citizen_id {
        return Ok(Json(state.engine.list_by_citizen(citizen_id).await?));
    }
    if let Some(department_id) = &query.department_id {
        return Ok(Json(state.engine.list_by_department(department_id).await?));
    }
    if let Some(status) = &query.status {
        let status: ComplaintStatus = status
            .parse()
            .map_err(|e: String| EngineError::validation("status", e))?;
        return Ok(Json(state.engine.list_by_status(&[status]).await?));
    }
    Err(EngineError::validation(
        "query",
        "one of citizenId, departmentId or status is required",
    )
    .into())
}

pub async fn pending_routing(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> ApiResult<Json<Vec<Complaint>>> {
    if !actor.is_admin() {
        return Err(EngineError::unauthorized(
            actor.role,
            "pending-routing queue",
            &[nivaran_core::actor::Role::Admin, nivaran_core::actor::Role::SuperAdmin],
        )
        .into());
    }
    Ok(Json(state.engine.pending_routing().await?))
}

//! End-to-end intake: validate, upload the image, short-circuit near-certain
//! duplicates into an upvote, classify through the AI oracle, persist.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::duplicate::{DuplicateFlag, DuplicateResolver};
use crate::engine::{ComplaintDraft, ComplaintEngine};
use crate::error::{ConflictKind, EngineError, ExternalService};
use crate::types::*;

/// The opaque classifier/validator. Returns category, priority, SLA days,
/// free-form reasoning and a confidence in [0,1].
#[async_trait]
pub trait AiOracle: Send + Sync {
    async fn analyze(&self, text: &str, image: Option<&[u8]>) -> Result<AiDecision>;
}

/// Opaque key/bytes image storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, bytes: &[u8], mime: &str) -> Result<String>;
    async fn get(&self, key: &str) -> Result<Vec<u8>>;
}

/// Raw submission from a front-end (web form or messaging bot).
#[derive(Clone, Debug)]
pub struct IntakeRequest {
    pub citizen_id: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub coords: Option<GeoPoint>,
    /// (bytes, mime)
    pub image: Option<(Vec<u8>, String)>,
    /// Caller consents to upvoting an existing near-certain duplicate
    /// instead of filing a new complaint.
    pub upvote_on_duplicate: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IntakeOutcome {
    Created { complaint: Complaint },
    Duplicate { existing: Complaint, upvoted: bool },
}

pub struct IntakeOrchestrator {
    engine: Arc<ComplaintEngine>,
    resolver: Arc<DuplicateResolver>,
    ai: Arc<dyn AiOracle>,
    objects: Arc<dyn ObjectStore>,
    config: Arc<EngineConfig>,
}

impl IntakeOrchestrator {
    pub fn new(
        engine: Arc<ComplaintEngine>,
        resolver: Arc<DuplicateResolver>,
        ai: Arc<dyn AiOracle>,
        objects: Arc<dyn ObjectStore>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            engine,
            resolver,
            ai,
            objects,
            config,
        }
    }

    pub async fn submit(&self, request: IntakeRequest) -> Result<IntakeOutcome, EngineError> {
        validate(&request)?;

        // Image upload is not required for filing: a storage outage degrades
        // to a complaint without an image.
        let image = match &request.image {
            None => None,
            Some((bytes, mime)) => match self.objects.put(bytes, mime).await {
                Ok(key) => Some(ImageRef {
                    key,
                    mime: mime.clone(),
                    analysis: None,
                    analyzed_at: None,
                }),
                Err(err) => {
                    tracing::warn!(error = %err, "image upload failed, filing without image");
                    None
                }
            },
        };

        if let Some(at) = request.coords {
            if let Some(outcome) = self.try_duplicate_shortcut(&request, at).await? {
                return Ok(outcome);
            }
        }

        let image_bytes = request.image.as_ref().map(|(b, _)| b.as_slice());
        let ai = match self.ai.analyze(&request.description, image_bytes).await {
            Ok(decision) => decision,
            Err(err) if self.config.ai_required => {
                return Err(EngineError::external(ExternalService::Ai, err));
            }
            Err(err) => {
                tracing::warn!(error = %err, "classifier unavailable, degrading to OTHER/LOW");
                let fallback_days = self.config.sla_days_for(ComplaintCategory::Other, 14);
                AiDecision::degraded(fallback_days)
            }
        };

        let image = image.map(|mut img| {
            if let Some(findings) = &ai.image_findings {
                img.analysis = Some(findings.clone());
                img.analyzed_at = Some(self.engine.clock.now());
            }
            img
        });

        let complaint = self
            .engine
            .create_from_intake(
                ComplaintDraft {
                    citizen_id: request.citizen_id,
                    title: request.title,
                    description: request.description,
                    location: request.location,
                    coords: request.coords,
                    image,
                },
                ai,
            )
            .await?;
        Ok(IntakeOutcome::Created { complaint })
    }

    /// If a near-certain duplicate is still actionable and the caller
    /// consented, upvote it instead of filing. A repeated identical
    /// submission swallows the already-upvoted conflict.
    async fn try_duplicate_shortcut(
        &self,
        request: &IntakeRequest,
        at: GeoPoint,
    ) -> Result<Option<IntakeOutcome>, EngineError> {
        if !request.upvote_on_duplicate {
            return Ok(None);
        }
        let candidates = self.resolver.check(&request.description, at, None).await?;
        let near_certain = candidates.into_iter().find(|c| {
            c.flag == DuplicateFlag::NearCertain
                && matches!(
                    c.complaint.status,
                    ComplaintStatus::Filed | ComplaintStatus::InProgress
                )
        });
        let Some(candidate) = near_certain else {
            return Ok(None);
        };

        let existing_id = candidate.complaint.id;
        let upvoted = match self
            .resolver
            .upvote(existing_id, &request.citizen_id, Some(at))
            .await
        {
            Ok(_) => true,
            Err(EngineError::Conflict(ConflictKind::AlreadyUpvoted))
            | Err(EngineError::Conflict(ConflictKind::SelfUpvote)) => false,
            Err(err) => return Err(err),
        };
        let existing = self.engine.get(existing_id).await?;
        tracing::info!(
            existing = %existing.id,
            similarity = candidate.similarity,
            distance_m = candidate.distance_meters,
            upvoted,
            "near-certain duplicate, intake short-circuited"
        );
        Ok(Some(IntakeOutcome::Duplicate { existing, upvoted }))
    }
}

fn validate(request: &IntakeRequest) -> Result<(), EngineError> {
    let title = request.title.trim();
    if title.len() < 3 || title.len() > 200 {
        return Err(EngineError::validation(
            "title",
            "must be between 3 and 200 characters",
        ));
    }
    let description = request.description.trim();
    if description.len() < 10 || description.len() > 4000 {
        return Err(EngineError::validation(
            "description",
            "must be between 10 and 4000 characters",
        ));
    }
    if request.location.len() > 300 {
        return Err(EngineError::validation("location", "too long (max 300)"));
    }
    if let Some(coords) = request.coords {
        if !coords.is_valid() {
            return Err(EngineError::validation(
                "coordinates",
                "latitude/longitude out of range",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> IntakeRequest {
        IntakeRequest {
            citizen_id: "c-42".to_string(),
            title: "Pothole on MG Road".to_string(),
            description: "large pothole, 1m wide".to_string(),
            location: "MG Road".to_string(),
            coords: Some(GeoPoint {
                lat: 12.97,
                lng: 77.59,
            }),
            image: None,
            upvote_on_duplicate: false,
        }
    }

    #[test]
    fn validation_bounds() {
        assert!(validate(&request()).is_ok());

        let mut r = request();
        r.title = "ab".to_string();
        assert!(matches!(
            validate(&r),
            Err(EngineError::Validation { field: "title", .. })
        ));

        let mut r = request();
        r.description = "too short".to_string();
        assert!(matches!(
            validate(&r),
            Err(EngineError::Validation {
                field: "description",
                ..
            })
        ));

        let mut r = request();
        r.coords = Some(GeoPoint {
            lat: 95.0,
            lng: 77.59,
        });
        assert!(matches!(
            validate(&r),
            Err(EngineError::Validation {
                field: "coordinates",
                ..
            })
        ));
    }
}
